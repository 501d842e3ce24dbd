//! Single user resolver.

use std::sync::Arc;

use async_trait::async_trait;

use super::receiver::resolve_all_users;
use super::{ReceiverResolver, Resolved, TemplateVars, parse_id};
use crate::Result;
use crate::context::RequestContext;
use crate::gateway::EntityGateway;

/// Resolves exactly one user. Unverified emails are accepted since these
/// notifications are often what verifies the address in the first place.
pub struct UserResolver {
    gateway: Arc<dyn EntityGateway>,
}

impl UserResolver {
    pub fn new(gateway: Arc<dyn EntityGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ReceiverResolver for UserResolver {
    async fn resolve(&self, ctx: &RequestContext, id: &str) -> Result<Resolved> {
        let user_id = parse_id("user", id)?;
        let receivers = resolve_all_users(self.gateway.as_ref(), ctx, &[user_id], &[], true).await;
        Ok(Resolved::new(receivers, TemplateVars::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Receiver;
    use crate::test_utils::{FakeGateway, user};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_unverified_email_allowed() {
        let gateway = Arc::new(FakeGateway::new());
        let id = Uuid::new_v4();
        gateway.add_user(user(id, "New", Some("new@example.com"), Some(false)));

        let resolved = UserResolver::new(gateway)
            .resolve(&RequestContext::new(), &id.to_string())
            .await
            .unwrap();

        assert_eq!(resolved.receivers, vec![Receiver::new("New", "new@example.com")]);
    }

    #[tokio::test]
    async fn test_missing_email_yields_nobody() {
        let gateway = Arc::new(FakeGateway::new());
        let id = Uuid::new_v4();
        gateway.add_user(user(id, "Ghost", None, Some(true)));

        let resolved = UserResolver::new(gateway)
            .resolve(&RequestContext::new(), &id.to_string())
            .await
            .unwrap();
        assert!(resolved.receivers.is_empty());
    }

    #[tokio::test]
    async fn test_failed_lookup_yields_nobody() {
        let gateway = Arc::new(FakeGateway::new());
        let resolved = UserResolver::new(gateway.clone())
            .resolve(&RequestContext::new(), &Uuid::new_v4().to_string())
            .await
            .unwrap();
        assert!(resolved.receivers.is_empty());
        assert_eq!(gateway.user_calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_id() {
        let gateway = Arc::new(FakeGateway::new());
        let err = UserResolver::new(gateway)
            .resolve(&RequestContext::new(), "not-a-uuid")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "unable to lookup user based on id not-a-uuid");
    }
}
