use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use portable_atomic::{AtomicU32, Ordering};

/// Counting wake primitive between an interrupt handler and a single waiting task.
///
/// Every [`notify()`](DispatchSignal::notify) is matched by exactly one completion of
/// [`wait()`](DispatchSignal::wait), even if several notifications happen before the waiter
/// runs.
pub struct DispatchSignal {
    pending: AtomicU32,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl DispatchSignal {
    #[expect(clippy::new_without_default)]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: AtomicU32::new(0),
            wake: Signal::new(),
        }
    }

    /// Records one occurrence and wakes the waiter.
    ///
    /// Never blocks; can be called from interrupt context.
    pub fn notify(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.wake.signal(());
    }

    /// Consumes one pending occurrence, if any.
    pub fn try_take(&self) -> bool {
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
                pending.checked_sub(1)
            })
            .is_ok()
    }

    /// Waits until an occurrence is pending and consumes it.
    pub async fn wait(&self) {
        // A notification between `try_take()` and `wait()` leaves the signal set, so it cannot
        // be missed.
        while !self.try_take() {
            self.wake.wait().await;
        }
    }

    /// Returns the number of occurrences not consumed yet.
    #[must_use]
    pub fn pending(&self) -> u32 {
        self.pending.load(Ordering::Acquire)
    }
}
