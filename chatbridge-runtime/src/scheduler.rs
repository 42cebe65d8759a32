//! Task scheduler with a shared shutdown signal.
//!
//! Two kinds of task are tracked separately:
//!
//! - *services* run until shutdown (supervisor, periodic tasks, relay)
//! - *deferred* tasks fire once at a deadline (capture flushes)
//!
//! Both are cancelled when shutdown is signalled. A cancelled deferred task
//! never runs its body, so shutdown invalidates pending flushes.

use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error};

/// Resolves once shutdown has been signalled (or the signal source is gone).
pub async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        let stop = *rx.borrow_and_update();
        if stop {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Owner of every background task the bridge starts.
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    services: Mutex<JoinSet<()>>,
    deferred: Mutex<JoinSet<()>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("shutting_down", &self.is_shutting_down())
            .field("services", &self.services.lock().len())
            .field("deferred", &self.deferred.lock().len())
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Scheduler with no tasks and the signal lowered.
    #[must_use]
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            services: Mutex::new(JoinSet::new()),
            deferred: Mutex::new(JoinSet::new()),
        }
    }

    /// A receiver for the shutdown signal.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Whether shutdown has been signalled.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Start a long-running service. It is dropped at shutdown.
    pub fn spawn_service<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut rx = self.subscribe();
        let mut services = self.services.lock();
        reap(&mut services);
        services.spawn(async move {
            tokio::select! {
                () = task => debug!(service = name, "Service finished"),
                () = shutdown_requested(&mut rx) => debug!(service = name, "Service cancelled"),
            }
        });
    }

    /// Run `task` once at `deadline`, unless shutdown comes first.
    pub fn defer_until<F>(&self, deadline: Instant, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut rx = self.subscribe();
        let mut deferred = self.deferred.lock();
        reap(&mut deferred);
        deferred.spawn(async move {
            tokio::select! {
                () = async {
                    tokio::time::sleep_until(deadline).await;
                    task.await;
                } => {}
                () = shutdown_requested(&mut rx) => debug!("Deferred task invalidated"),
            }
        });
    }

    /// Wait until every deferred task scheduled so far has completed.
    pub async fn settle(&self) {
        let mut batch = std::mem::take(&mut *self.deferred.lock());
        drain(&mut batch).await;
    }

    /// Signal shutdown and wait for every task to stop.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let mut deferred = std::mem::take(&mut *self.deferred.lock());
        let mut services = std::mem::take(&mut *self.services.lock());
        drain(&mut deferred).await;
        drain(&mut services).await;
    }
}

fn reap(set: &mut JoinSet<()>) {
    while let Some(result) = set.try_join_next() {
        log_join(result);
    }
}

async fn drain(set: &mut JoinSet<()>) {
    while let Some(result) = set.join_next().await {
        log_join(result);
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!(error = %e, "Background task panicked");
        }
    }
}
