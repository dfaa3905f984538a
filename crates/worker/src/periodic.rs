//! The periodic worker contract and runner.
//!
//! A worker is a task ticked at a fixed interval on its own tokio task.
//! Cancellation is cooperative and only observed between ticks; an
//! in-flight tick always runs to completion. A failed tick is logged and
//! does not stop the worker.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::Result;

#[async_trait]
pub trait PeriodicTask: Send + 'static {
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    async fn tick(&mut self) -> Result<()>;
}

/// Handle to a running worker. Dropping it detaches the worker; `stop`
/// requests shutdown and waits for the current tick to finish.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

pub fn spawn_periodic(mut task: impl PeriodicTask) -> WorkerHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        info!(worker = task.name(), "worker started");
        loop {
            if let Err(error) = task.tick().await {
                error!(worker = task.name(), %error, "worker tick failed");
            }
            tokio::select! {
                _ = tokio::time::sleep(task.interval()) => {}
                _ = shutdown_rx.changed() => {
                    info!(worker = task.name(), "worker stopped");
                    break;
                }
            }
        }
    });
    WorkerHandle { shutdown, handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct CountingTask {
        ticks: Arc<AtomicU32>,
        fail_every_other: bool,
    }

    #[async_trait]
    impl PeriodicTask for CountingTask {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn interval(&self) -> Duration {
            Duration::from_millis(5)
        }

        async fn tick(&mut self) -> Result<()> {
            let count = self.ticks.fetch_add(1, Ordering::SeqCst);
            if self.fail_every_other && count % 2 == 1 {
                return Err(engine::EngineError::Registry(
                    registry::RegistryError::Transport("boom".to_string()),
                )
                .into());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn ticks_repeatedly_until_stopped() {
        let ticks = Arc::new(AtomicU32::new(0));
        let handle = spawn_periodic(CountingTask {
            ticks: ticks.clone(),
            fail_every_other: false,
        });
        tokio::time::sleep(Duration::from_millis(40)).await;
        handle.stop().await;
        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected several ticks, saw {seen}");
    }

    #[tokio::test]
    async fn a_failing_tick_does_not_stop_the_worker() {
        let ticks = Arc::new(AtomicU32::new(0));
        let handle = spawn_periodic(CountingTask {
            ticks: ticks.clone(),
            fail_every_other: true,
        });
        tokio::time::sleep(Duration::from_millis(40)).await;
        handle.stop().await;
        assert!(ticks.load(Ordering::SeqCst) >= 3);
    }
}
