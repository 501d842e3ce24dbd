//! Read-only access to remote domain entities.
//!
//! Resolvers only see the [`EntityGateway`] trait. [`HttpGateway`] talks to
//! the work item tracker and auth services over HTTP.

mod http;
mod keycloak;
pub mod models;
mod token;

pub use http::{HttpGateway, REQUEST_ID_HEADER};
pub use keycloak::RealmKeyClient;
pub use models::{Area, Codebase, Comment, Space, User, WorkItem, WorkItemType};
pub use token::ServiceAccountTokenClient;

use async_trait::async_trait;
use uuid::Uuid;

use crate::Result;
use crate::context::RequestContext;

/// Fetches remote entities by identifier.
///
/// Every call issues exactly one upstream request.
#[async_trait]
pub trait EntityGateway: Send + Sync {
    async fn get_work_item(&self, ctx: &RequestContext, id: Uuid) -> Result<WorkItem>;

    async fn get_comment(&self, ctx: &RequestContext, id: Uuid) -> Result<Comment>;

    /// Comments attached to a work item (first page).
    async fn get_comments(&self, ctx: &RequestContext, work_item_id: Uuid) -> Result<Vec<Comment>>;

    async fn get_area(&self, ctx: &RequestContext, id: Uuid) -> Result<Area>;

    async fn get_space(&self, ctx: &RequestContext, id: Uuid) -> Result<Space>;

    /// Collaborators of a space, including their email attributes.
    async fn get_space_collaborators(
        &self,
        ctx: &RequestContext,
        space_id: Uuid,
    ) -> Result<Vec<User>>;

    async fn get_work_item_type(&self, ctx: &RequestContext, id: Uuid) -> Result<WorkItemType>;

    async fn get_user(&self, ctx: &RequestContext, id: Uuid) -> Result<User>;

    /// Codebases whose repository URL matches `repository_url`.
    async fn get_codebases(
        &self,
        ctx: &RequestContext,
        repository_url: &str,
    ) -> Result<Vec<Codebase>>;
}
