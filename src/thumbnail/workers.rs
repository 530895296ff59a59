//! Background task pool for fire-and-forget thumbnail work
//!
//! Tasks outlive the request that submitted them. On shutdown the pool waits
//! a bounded grace period and aborts whatever is still running.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinSet;

#[derive(Debug, Default)]
pub struct BackgroundPool {
    tasks: Mutex<JoinSet<()>>,
}

impl BackgroundPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` onto the runtime and track it until it finishes
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        reap_finished(&mut tasks);
        tasks.spawn(task);
    }

    /// Tasks spawned and not yet reaped
    pub fn pending(&self) -> usize {
        let mut tasks = self.tasks.lock();
        reap_finished(&mut tasks);
        tasks.len()
    }

    /// Wait up to `grace` for running tasks, then abort the rest
    pub async fn shutdown(&self, grace: Duration) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        if tasks.is_empty() {
            return;
        }

        let total = tasks.len();
        let drained = tokio::time::timeout(grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                remaining = tasks.len(),
                total,
                "Aborting background tasks after shutdown grace period"
            );
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        } else {
            tracing::debug!(total, "Background tasks drained");
        }
    }
}

fn reap_finished(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.try_join_next() {
        if let Err(e) = result {
            if e.is_panic() {
                tracing::error!("Background task panicked: {}", e);
            }
        }
    }
}
