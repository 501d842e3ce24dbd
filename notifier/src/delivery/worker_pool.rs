//! Bounded pool of delivery workers.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::outcome::{DeliveryObserver, DeliveryOutcome, DeliveryStats, FailureReason};
use super::{Notification, Notifier, Sender};
use crate::context::RequestContext;
use crate::{Error, Result};

/// Configuration for the delivery worker pool.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of workers, and so the maximum number of tasks in flight.
    pub workers: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self { workers: 10 }
    }
}

struct Job {
    ctx: RequestContext,
    notification: Notification,
    permit: OwnedSemaphorePermit,
}

struct Shared {
    sender: Arc<dyn Sender>,
    observer: Option<Arc<dyn DeliveryObserver>>,
    stats: Arc<DeliveryStats>,
}

impl Shared {
    async fn run(&self, job: Job) {
        let Job {
            ctx,
            notification,
            permit,
        } = job;
        let kind = notification.kind;
        let id = notification.id.clone();

        // Spawned so a panic stays inside the task and the worker survives.
        let handle = tokio::spawn(deliver(ctx, notification, self.sender.clone()));
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    notification_type = %kind,
                    id = %id,
                    panic = e.is_panic(),
                    "delivery task did not complete"
                );
                DeliveryOutcome::Failed(FailureReason::Panic)
            }
        };

        self.stats.record(&outcome);
        if let Some(observer) = &self.observer {
            observer.on_outcome(kind, &id, &outcome);
        }
        drop(permit);
    }
}

/// Resolve, render and send one notification.
async fn deliver(
    ctx: RequestContext,
    notification: Notification,
    sender: Arc<dyn Sender>,
) -> DeliveryOutcome {
    let Notification {
        id,
        kind,
        custom_attributes,
        resolver,
        template,
    } = notification;

    let mut resolved = match resolver.resolve(&ctx, &id).await {
        Ok(resolved) => resolved,
        Err(e) => {
            error!(notification_type = %kind, id = %id, error = %e, "failed to resolve receivers");
            return DeliveryOutcome::Failed(FailureReason::Resolve(e.to_string()));
        }
    };

    if resolved.receivers.is_empty() {
        info!(notification_type = %kind, id = %id, "no receivers found, skipping");
        return DeliveryOutcome::Skipped;
    }
    if resolved.is_partial() {
        warn!(
            notification_type = %kind,
            id = %id,
            errors = %resolved.error_summary(),
            "resolved receivers with partial errors"
        );
    }

    resolved.vars.custom = custom_attributes;
    let rendered = match template.render(&resolved.vars) {
        Ok(rendered) => rendered,
        Err(e) => {
            error!(notification_type = %kind, id = %id, error = %e, "failed to render template");
            return DeliveryOutcome::Failed(FailureReason::Render(e.to_string()));
        }
    };

    let receivers = resolved.receivers.len();
    sender
        .send(
            &ctx,
            &rendered.subject,
            &rendered.body,
            &rendered.headers,
            &resolved.receivers,
        )
        .await;
    debug!(notification_type = %kind, id = %id, receivers, "notification handed to sender");
    DeliveryOutcome::Sent { receivers }
}

/// Fixed-size pool of workers that deliver notifications.
///
/// `submit` waits until a worker is free, so callers feel backpressure
/// instead of building an unbounded backlog.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    idle: Arc<Semaphore>,
    tx: parking_lot::Mutex<Option<mpsc::Sender<Job>>>,
    tasks: parking_lot::Mutex<Option<JoinSet<()>>>,
    stats: Arc<DeliveryStats>,
}

impl WorkerPool {
    /// Start a pool with the default configuration.
    pub fn new(sender: Arc<dyn Sender>) -> Self {
        Self::with_config(sender, WorkerPoolConfig::default())
    }

    pub fn with_config(sender: Arc<dyn Sender>, config: WorkerPoolConfig) -> Self {
        Self::start(sender, config, None)
    }

    /// Start a pool that reports every outcome to `observer`.
    pub fn with_observer(
        sender: Arc<dyn Sender>,
        config: WorkerPoolConfig,
        observer: Arc<dyn DeliveryObserver>,
    ) -> Self {
        Self::start(sender, config, Some(observer))
    }

    fn start(
        sender: Arc<dyn Sender>,
        mut config: WorkerPoolConfig,
        observer: Option<Arc<dyn DeliveryObserver>>,
    ) -> Self {
        config.workers = config.workers.max(1);
        let workers = config.workers;
        let (tx, rx) = mpsc::channel::<Job>(workers);
        let rx = Arc::new(Mutex::new(rx));
        let stats = Arc::new(DeliveryStats::new());
        let shared = Arc::new(Shared {
            sender,
            observer,
            stats: stats.clone(),
        });

        let mut join_set = JoinSet::new();
        for i in 0..workers {
            let rx = rx.clone();
            let shared = shared.clone();
            join_set.spawn(async move {
                debug!(worker = i, "delivery worker started");
                loop {
                    let job = rx.lock().await.recv().await;
                    let Some(job) = job else {
                        break;
                    };
                    shared.run(job).await;
                }
                debug!(worker = i, "delivery worker stopped");
            });
        }

        info!(workers, "started delivery worker pool");

        Self {
            config,
            idle: Arc::new(Semaphore::new(workers)),
            tx: parking_lot::Mutex::new(Some(tx)),
            tasks: parking_lot::Mutex::new(Some(join_set)),
            stats,
        }
    }

    /// Hand a notification to a worker, waiting until one is free.
    pub async fn submit(&self, ctx: RequestContext, notification: Notification) -> Result<()> {
        let tx = self.tx.lock().clone().ok_or(Error::ShutDown)?;
        let permit = self
            .idle
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::ShutDown)?;

        let kind = notification.kind;
        let id = notification.id.clone();
        self.stats.record_start();
        let job = Job {
            ctx,
            notification,
            permit,
        };
        if tx.send(job).await.is_err() {
            self.stats.record_rejected();
            return Err(Error::ShutDown);
        }
        debug!(notification_type = %kind, id = %id, "notification accepted by worker pool");
        Ok(())
    }

    /// Stop accepting work and wait for in-flight tasks to finish.
    pub async fn shutdown(&self) {
        info!("stopping delivery worker pool");
        self.idle.close();
        self.tx.lock().take();

        let join_set = self.tasks.lock().take();
        if let Some(mut join_set) = join_set {
            while let Some(result) = join_set.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "delivery worker exited abnormally");
                }
            }
        }
        info!("delivery worker pool stopped");
    }

    pub fn workers(&self) -> usize {
        self.config.workers
    }

    pub fn is_running(&self) -> bool {
        !self.idle.is_closed()
    }

    pub fn stats(&self) -> Arc<DeliveryStats> {
        self.stats.clone()
    }
}

#[async_trait]
impl Notifier for WorkerPool {
    async fn send(&self, ctx: RequestContext, notification: Notification) -> Result<()> {
        self.submit(ctx, notification).await
    }
}
