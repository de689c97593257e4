use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;
use uuid::Uuid;
use tracing::debug;

struct Job {
    generation: u64,
    handle: AbortHandle,
}

/// Runs deferred jobs keyed by entity id. Scheduling a key again replaces
/// the pending job; cancelling a key that already fired does nothing.
#[derive(Clone, Default)]
pub struct DelayedTaskScheduler {
    jobs: Arc<Mutex<HashMap<Uuid, Job>>>,
    generations: Arc<AtomicU64>,
}

impl DelayedTaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&self, key: Uuid, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let jobs = self.jobs.clone();
        let deadline = tokio::time::Instant::now() + delay;

        // Hold the lock across spawn so the job cannot fire before it is registered.
        let mut guard = lock(&self.jobs);
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            {
                let mut jobs = lock(&jobs);
                match jobs.get(&key) {
                    Some(job) if job.generation == generation => {
                        jobs.remove(&key);
                    }
                    _ => return,
                }
            }
            task.await;
        })
        .abort_handle();

        if let Some(previous) = guard.insert(key, Job { generation, handle }) {
            previous.handle.abort();
            debug!("Replaced pending job for {}", key);
        }
    }

    /// Returns `true` if a pending job was cancelled.
    pub fn cancel(&self, key: Uuid) -> bool {
        match lock(&self.jobs).remove(&key) {
            Some(job) => {
                job.handle.abort();
                debug!("Cancelled pending job for {}", key);
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, key: Uuid) -> bool {
        lock(&self.jobs).contains_key(&key)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.jobs).len()
    }
}

fn lock(jobs: &Mutex<HashMap<Uuid, Job>>) -> MutexGuard<'_, HashMap<Uuid, Job>> {
    // The map stays consistent even if a holder panicked.
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}
