//! Template variables produced by resolvers.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{ReceiverResolver, Resolved};
use crate::Result;
use crate::context::RequestContext;
use crate::gateway::{Area, Comment, Space, User, WorkItem, WorkItemType};

/// Caller supplied template parameters.
pub type CustomAttributes = Map<String, Value>;

/// Variables handed to the template engine.
///
/// Field names on the wire match what the templates reference.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateVars {
    #[serde(rename = "workitem", skip_serializing_if = "Option::is_none")]
    pub work_item: Option<WorkItem>,
    #[serde(rename = "workitemOwner", skip_serializing_if = "Option::is_none")]
    pub work_item_owner: Option<User>,
    #[serde(rename = "workitemArea", skip_serializing_if = "Option::is_none")]
    pub work_item_area: Option<Area>,
    #[serde(rename = "workitemType", skip_serializing_if = "Option::is_none")]
    pub work_item_type: Option<WorkItemType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<Comment>,
    #[serde(rename = "commentOwner", skip_serializing_if = "Option::is_none")]
    pub comment_owner: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space: Option<Space>,
    #[serde(rename = "spaceOwner", skip_serializing_if = "Option::is_none")]
    pub space_owner: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<User>,
    #[serde(rename = "webURL", skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    pub custom: CustomAttributes,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert into a JSON value for rendering.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Wraps a resolver and adds configuration-derived variables (`webURL`) to
/// every successful resolution.
pub struct ConfiguredVars<R> {
    inner: R,
    web_url: String,
}

impl<R> ConfiguredVars<R> {
    pub fn new(web_url: impl Into<String>, inner: R) -> Self {
        Self {
            inner,
            web_url: web_url.into(),
        }
    }
}

#[async_trait]
impl<R: ReceiverResolver> ReceiverResolver for ConfiguredVars<R> {
    async fn resolve(&self, ctx: &RequestContext, id: &str) -> Result<Resolved> {
        let mut resolved = self.inner.resolve(ctx, id).await?;
        resolved.vars.web_url = Some(self.web_url.clone());
        Ok(resolved)
    }
}
