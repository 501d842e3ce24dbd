//! Resolver for vulnerability scan reports on a repository.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::receiver::{resolve_all_users, unique_ids};
use super::{ReceiverResolver, Resolved, TemplateVars};
use crate::Result;
use crate::context::RequestContext;
use crate::gateway::EntityGateway;

/// Notifies the owners of every space with CVE scanning enabled on a
/// codebase for the given repository URL.
pub struct CveResolver {
    gateway: Arc<dyn EntityGateway>,
}

impl CveResolver {
    pub fn new(gateway: Arc<dyn EntityGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ReceiverResolver for CveResolver {
    async fn resolve(&self, ctx: &RequestContext, repository_url: &str) -> Result<Resolved> {
        let codebases = self.gateway.get_codebases(ctx, repository_url).await?;
        let space_ids: Vec<_> = codebases
            .iter()
            .filter(|c| c.is_cve_scanned())
            .filter_map(|c| c.space_id())
            .collect();
        let space_ids = unique_ids(&space_ids);
        if space_ids.is_empty() {
            debug!(repository_url, "no codebase with cve scan enabled");
            return Ok(Resolved::default());
        }

        let mut owners = Vec::with_capacity(space_ids.len());
        for space_id in space_ids {
            let space = self.gateway.get_space(ctx, space_id).await?;
            owners.extend(space.owner_id());
        }
        if owners.is_empty() {
            return Ok(Resolved::default());
        }

        let owners = unique_ids(&owners);
        let receivers =
            resolve_all_users(self.gateway.as_ref(), ctx, &owners, &[], false).await;
        Ok(Resolved::new(receivers, TemplateVars::new()))
    }
}
