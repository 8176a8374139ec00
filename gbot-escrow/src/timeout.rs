//! Cancellable one-shot timeout checks, tracked per deal id.

use gbot_core::DealId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

struct ScheduledCheck {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Schedules at most one outstanding delayed check per deal. Scheduling again for
/// the same deal aborts the prior task; [`cancel`](TimeoutScheduler::cancel)
/// aborts and forgets. Each entry carries a generation number, and a task that
/// fires removes its entry only while its own generation is still the one
/// tracked, so a fire racing a reschedule never drops the replacement.
pub struct TimeoutScheduler {
    tasks: Mutex<HashMap<DealId, ScheduledCheck>>,
    generation: AtomicU64,
}

impl TimeoutScheduler {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Spawns a task that sleeps `delay` and then runs `check`. The check itself
    /// re-reads deal state, so a fire that lost the race against cancellation is
    /// a no-op there.
    pub async fn schedule<F>(self: &Arc<Self>, deal_id: DealId, delay: Duration, check: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Hold the map lock across spawn + insert so the task cannot observe the
        // map before its own entry is tracked.
        let mut tasks = self.tasks.lock().await;
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        let scheduler = Arc::clone(self);
        let id = deal_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            check.await;
            let mut tasks = scheduler.tasks.lock().await;
            let still_ours = tasks
                .get(&id)
                .map_or(false, |entry| entry.generation == generation);
            if still_ours {
                tasks.remove(&id);
            }
        });

        if let Some(prior) = tasks.insert(deal_id.clone(), ScheduledCheck { generation, handle }) {
            debug!(deal_id = %deal_id, "replaced outstanding timeout check");
            prior.handle.abort();
        }
    }

    /// Aborts the pending check for `deal_id`, if any.
    pub async fn cancel(&self, deal_id: &DealId) {
        if let Some(entry) = self.tasks.lock().await.remove(deal_id) {
            entry.handle.abort();
            debug!(deal_id = %deal_id, "timeout check cancelled");
        }
    }

    /// Whether a check is still tracked for `deal_id`.
    pub async fn is_pending(&self, deal_id: &DealId) -> bool {
        self.tasks.lock().await.contains_key(deal_id)
    }
}

impl Default for TimeoutScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_check_fires_once_after_delay() {
        let scheduler = Arc::new(TimeoutScheduler::new());
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        scheduler
            .schedule(DealId::new("aaaaaa"), Duration::from_millis(20), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending(&DealId::new("aaaaaa")).await);
    }

    #[tokio::test]
    async fn test_cancel_prevents_fire() {
        let scheduler = Arc::new(TimeoutScheduler::new());
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        let id = DealId::new("bbbbbb");
        scheduler
            .schedule(id.clone(), Duration::from_millis(30), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        scheduler.cancel(&id).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!scheduler.is_pending(&id).await);
    }

    #[tokio::test]
    async fn test_reschedule_replaces_prior_check() {
        let scheduler = Arc::new(TimeoutScheduler::new());
        let fired = Arc::new(AtomicUsize::new(0));
        let id = DealId::new("cccccc");

        let first = fired.clone();
        scheduler
            .schedule(id.clone(), Duration::from_millis(30), async move {
                first.fetch_add(10, Ordering::SeqCst);
            })
            .await;

        let second = fired.clone();
        scheduler
            .schedule(id.clone(), Duration::from_millis(30), async move {
                second.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        // Only the replacement ran.
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reschedule_while_prior_check_is_running() {
        let scheduler = Arc::new(TimeoutScheduler::new());
        let fired = Arc::new(AtomicUsize::new(0));
        let id = DealId::new("dddddd");

        // First check is already past its delay and mid-execution when the
        // replacement arrives.
        let first = fired.clone();
        scheduler
            .schedule(id.clone(), Duration::from_millis(0), async move {
                tokio::time::sleep(Duration::from_millis(60)).await;
                first.fetch_add(10, Ordering::SeqCst);
            })
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = fired.clone();
        scheduler
            .schedule(id.clone(), Duration::from_millis(20), async move {
                second.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        // The replacement stayed tracked, fired, and cleaned up after itself.
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending(&id).await);
    }
}
