//! Delayed task scheduling

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, error};

/// Work to run once after a delay
pub type DelayedTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs a task once after a delay, independent of the caller's cadence.
///
/// Pending tasks are only cancelled by the process ending.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: DelayedTask);
}

/// Scheduler backed by a tokio runtime timer
#[derive(Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Create a scheduler on an explicit runtime
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Create a scheduler on the runtime of the calling task.
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: DelayedTask) {
        debug!("Scheduling delayed task in {:?}", delay);
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            // The task may shell out, keep it off the async workers
            if let Err(e) = tokio::task::spawn_blocking(task).await {
                error!("Delayed task did not complete: {}", e);
            }
        });
    }
}

/// Scheduler that holds tasks until told to fire them.
///
/// Used for deterministic tests and frame-by-frame replay where wall-clock
/// delays are meaningless.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    pending: Arc<Mutex<Vec<(Duration, DelayedTask)>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to fire
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Delays of the waiting tasks, in submission order
    pub fn pending_delays(&self) -> Vec<Duration> {
        self.lock().iter().map(|(delay, _)| *delay).collect()
    }

    /// Run every waiting task now; returns how many ran
    pub fn fire_all(&self) -> usize {
        let tasks: Vec<_> = self.lock().drain(..).collect();
        let count = tasks.len();
        for (_, task) in tasks {
            task();
        }
        count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Duration, DelayedTask)>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: DelayedTask) {
        self.lock().push((delay, task));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_waits_for_delay() {
        let scheduler = TokioScheduler::current();
        let (tx, mut rx) = oneshot::channel();
        let start = Instant::now();

        scheduler.schedule(
            Duration::from_secs(10),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );

        // Not yet
        assert!(tokio::time::timeout(Duration::from_millis(9_900), &mut rx)
            .await
            .is_err());

        rx.await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[test]
    fn test_manual_scheduler_fires_on_demand() {
        let scheduler = ManualScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));

        for delay_ms in [100, 200] {
            let runs = runs.clone();
            scheduler.schedule(
                Duration::from_millis(delay_ms),
                Box::new(move || {
                    runs.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        assert_eq!(scheduler.pending(), 2);
        assert_eq!(
            scheduler.pending_delays(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        assert_eq!(scheduler.fire_all(), 2);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.fire_all(), 0);
    }
}
