use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Notify;

/// Stop flag for the tick loop. Setting it is idempotent and never blocks the
/// caller, so closing an idle controller is a no-op.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Re-arms the signal for a new run.
    pub fn reset(&self) {
        self.stopped.store(false, Ordering::Release);
    }

    pub async fn stopped(&self) {
        loop {
            // Register interest before re-checking so a stop landing between
            // the check and the await is not missed.
            let notified = self.notify.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}

/// Outstanding-work counter backing drain. Every dispatched execution holds a
/// [`WorkGuard`] for its whole lifetime; dropping the guard retires the work.
#[derive(Debug, Default)]
pub struct WorkTracker {
    outstanding: AtomicU64,
    notify: Notify,
}

impl WorkTracker {
    pub fn begin(self: &Arc<Self>) -> WorkGuard {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        WorkGuard {
            tracker: self.clone(),
        }
    }

    pub fn outstanding(&self) -> u64 {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Resolves once every outstanding execution has retired. Returns
    /// immediately when nothing is in flight.
    pub async fn drained(&self) {
        loop {
            let notified = self.notify.notified();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug)]
pub struct WorkGuard {
    tracker: Arc<WorkTracker>,
}

impl Drop for WorkGuard {
    fn drop(&mut self) {
        if self.tracker.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.tracker.notify.notify_waiters();
        }
    }
}
