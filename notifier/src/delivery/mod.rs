//! Notification delivery.
//!
//! A [`Notification`] bundles everything needed to produce an email: the
//! subject id, the resolver that finds receivers and the template. A
//! [`Notifier`] takes ownership of it; the production notifier is the
//! [`WorkerPool`], which resolves, renders and sends on a bounded set of
//! workers.

mod outcome;
mod sender;
mod worker_pool;

pub use outcome::{
    DeliveryObserver, DeliveryOutcome, DeliveryStats, DeliveryStatsSnapshot, FailureReason,
};
pub use sender::{MandrillSender, SendStatus, Sender};
pub use worker_pool::{WorkerPool, WorkerPoolConfig};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::collector::{CustomAttributes, SharedResolver};
use crate::context::RequestContext;
use crate::template::RenderableTemplate;
use crate::types::NotificationType;

/// A single delivery task.
#[derive(Clone)]
pub struct Notification {
    /// Subject id handed to the resolver.
    pub id: String,
    pub kind: NotificationType,
    /// Caller supplied values exposed to the template as `custom`.
    pub custom_attributes: CustomAttributes,
    pub resolver: SharedResolver,
    pub template: Arc<dyn RenderableTemplate>,
}

impl Notification {
    pub fn new(
        kind: NotificationType,
        id: impl Into<String>,
        resolver: SharedResolver,
        template: Arc<dyn RenderableTemplate>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            custom_attributes: CustomAttributes::new(),
            resolver,
            template,
        }
    }

    pub fn with_custom_attributes(mut self, custom: CustomAttributes) -> Self {
        self.custom_attributes = custom;
        self
    }
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notification")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("custom_attributes", &self.custom_attributes)
            .finish_non_exhaustive()
    }
}

/// Accepts notifications for delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, ctx: RequestContext, notification: Notification) -> Result<()>;
}

type Callback = dyn Fn(RequestContext, Notification) + Send + Sync;

/// Notifier that hands every notification to a closure.
pub struct CallbackNotifier {
    callback: Arc<Callback>,
}

impl CallbackNotifier {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(RequestContext, Notification) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }
}

#[async_trait]
impl Notifier for CallbackNotifier {
    async fn send(&self, ctx: RequestContext, notification: Notification) -> Result<()> {
        (self.callback)(ctx, notification);
        Ok(())
    }
}
