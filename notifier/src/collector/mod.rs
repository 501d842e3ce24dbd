//! Receiver resolution.
//!
//! A [`ReceiverResolver`] maps the subject id of an event (a work item,
//! comment, user or repository URL) to the list of people that should hear
//! about it, together with the variables the email template needs.
//!
//! Resolution distinguishes two kinds of failure:
//!
//! - fatal: the anchor entity could not be loaded; the resolver returns `Err`
//!   and nothing else.
//! - partial: a secondary entity could not be loaded; the resolver still
//!   returns `Ok` with whatever it gathered and lists the causes in
//!   [`Resolved::errors`].

pub mod cve;
pub mod receiver;
pub mod registry;
pub mod user;
pub mod vars;
pub mod workitem;

pub use cve::CveResolver;
pub use receiver::{Receiver, unique_ids};
pub use registry::{PayloadValidator, Registry, validate_user_email_update};
pub use user::UserResolver;
pub use vars::{ConfiguredVars, CustomAttributes, TemplateVars};
pub use workitem::{CommentResolver, WorkItemResolver};

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::gateway::EntityGateway;
use crate::types::NotificationType;
use crate::{Error, Result};

/// Outcome of a successful resolution.
#[derive(Debug, Default)]
pub struct Resolved {
    pub receivers: Vec<Receiver>,
    pub vars: TemplateVars,
    /// Non-fatal errors hit while walking secondary entities.
    pub errors: Vec<Error>,
}

impl Resolved {
    pub fn new(receivers: Vec<Receiver>, vars: TemplateVars) -> Self {
        Self {
            receivers,
            vars,
            errors: Vec::new(),
        }
    }

    /// Whether some secondary lookups failed.
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }

    /// All non-fatal causes joined into one line for logging.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Resolves receivers and template variables for an event subject.
#[async_trait]
pub trait ReceiverResolver: Send + Sync {
    async fn resolve(&self, ctx: &RequestContext, id: &str) -> Result<Resolved>;
}

/// Shared handle to a resolver.
pub type SharedResolver = Arc<dyn ReceiverResolver>;

/// Resolver backed by an async closure.
pub struct FnResolver<F> {
    f: F,
}

/// Build a resolver from an async closure taking owned arguments.
pub fn resolver_fn<F, Fut>(f: F) -> FnResolver<F>
where
    F: Fn(RequestContext, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Resolved>> + Send,
{
    FnResolver { f }
}

#[async_trait]
impl<F, Fut> ReceiverResolver for FnResolver<F>
where
    F: Fn(RequestContext, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Resolved>> + Send,
{
    async fn resolve(&self, ctx: &RequestContext, id: &str) -> Result<Resolved> {
        (self.f)(ctx.clone(), id.to_string()).await
    }
}

/// Parse a subject id, mapping failures to a lookup error for `entity_type`.
pub(crate) fn parse_id(entity_type: &str, id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| Error::invalid_id(entity_type, id))
}

/// Build the registry with every resolver this service supports.
pub fn default_registry(gateway: Arc<dyn EntityGateway>, web_url: &str) -> Registry {
    let registry = Registry::with_default_notifiers();

    let work_item: SharedResolver = Arc::new(ConfiguredVars::new(
        web_url,
        WorkItemResolver::new(gateway.clone()),
    ));
    let comment: SharedResolver = Arc::new(ConfiguredVars::new(
        web_url,
        CommentResolver::new(gateway.clone()),
    ));
    let user: SharedResolver =
        Arc::new(ConfiguredVars::new(web_url, UserResolver::new(gateway.clone())));
    let cve: SharedResolver = Arc::new(ConfiguredVars::new(web_url, CveResolver::new(gateway)));

    registry.register(NotificationType::WorkItemCreate, work_item.clone(), None);
    registry.register(NotificationType::WorkItemUpdate, work_item, None);
    registry.register(NotificationType::CommentCreate, comment.clone(), None);
    registry.register(NotificationType::CommentUpdate, comment, None);
    registry.register(
        NotificationType::UserEmailUpdate,
        user,
        Some(Arc::new(validate_user_email_update)),
    );
    registry.register(NotificationType::AnalyticsNotifyCve, cve, None);

    registry
}
