//! Execution contexts running the dispatch routine of trigger devices.
//!
//! Two strategies are provided, both turning an edge notification into exactly one dispatch
//! cycle outside of interrupt context:
//!
//! - [`DedicatedRunner`]: one task per device, woken by a counting [`DispatchSignal`].
//!   Devices are dispatched independently of each other.
//! - [`SharedDispatchQueue`]: a single task serving every device bound to it, in FIFO order of
//!   the edges. A slow handler of one device delays the dispatch of all the others; this only
//!   affects latency, as no edge is coalesced or reordered.
//!
//! The runner task itself must be spawned by the application, calling `run()` from an executor
//! task. A runner is serviced by a single consumer at a time: while `run()` is active, a second
//! `run()` fails and `poll_cycle()` does nothing.

use core::convert::Infallible;

use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, once_lock::OnceLock,
};
use log::{debug, warn};
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::{AttachError, DispatchSignal, RunError};

/// One dispatch cycle of a device: read the interrupt status and invoke the matching handler.
pub trait Dispatch: Sync {
    fn dispatch(&self);
}

/// Strategy deciding where the dispatch cycles of a device are executed.
pub trait DispatchRunner: Sync {
    /// Binds a device to this runner.
    fn attach(&self, target: &'static dyn Dispatch) -> Result<(), AttachError>;

    /// Requests a dispatch cycle of `target`.
    ///
    /// Called from interrupt context: must not block.
    fn notify(&self, target: &'static dyn Dispatch);
}

/// Exclusive claim on the consumer side of a runner, released on drop.
struct ConsumerClaim<'a>(&'a AtomicBool);

impl<'a> ConsumerClaim<'a> {
    fn acquire(consumer: &'a AtomicBool) -> Option<Self> {
        (!consumer.swap(true, Ordering::AcqRel)).then_some(Self(consumer))
    }
}

impl Drop for ConsumerClaim<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs the dispatch cycles of a single device in its own task.
pub struct DedicatedRunner {
    signal: DispatchSignal,
    target: OnceLock<&'static dyn Dispatch>,
    consumer: AtomicBool,
}

impl DedicatedRunner {
    #[expect(clippy::new_without_default)]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            signal: DispatchSignal::new(),
            target: OnceLock::new(),
            consumer: AtomicBool::new(false),
        }
    }

    /// Runs one dispatch cycle per edge, forever.
    ///
    /// Edges notified before the device is attached are dispatched once it is.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::AlreadyRunning`] immediately if another task is running this runner.
    pub async fn run(&self) -> Result<Infallible, RunError> {
        let _claim = ConsumerClaim::acquire(&self.consumer).ok_or(RunError::AlreadyRunning)?;
        let target = *self.target.get().await;

        loop {
            self.signal.wait().await;
            target.dispatch();
        }
    }

    /// Runs a single dispatch cycle if an edge is pending and a device is attached.
    ///
    /// Intended for applications polling from a main loop instead of running an executor.
    /// Returns `false` without dispatching while [`run()`](DedicatedRunner::run) is active.
    pub fn poll_cycle(&self) -> bool {
        let Some(_claim) = ConsumerClaim::acquire(&self.consumer) else {
            return false;
        };
        let Some(target) = self.target.try_get() else {
            return false;
        };

        if self.signal.try_take() {
            target.dispatch();
            true
        } else {
            false
        }
    }

    /// Returns the number of edges waiting for their dispatch cycle.
    #[must_use]
    pub fn pending(&self) -> u32 {
        self.signal.pending()
    }
}

impl DispatchRunner for DedicatedRunner {
    fn attach(&self, target: &'static dyn Dispatch) -> Result<(), AttachError> {
        match self.target.init(target) {
            Ok(()) => Ok(()),
            // Re-attaching the same device is allowed, so that its initialization can be retried.
            Err(_) if self
                .target
                .try_get()
                .is_some_and(|attached| core::ptr::addr_eq(*attached, target)) =>
            {
                Ok(())
            }
            Err(_) => Err(AttachError::AlreadyAttached),
        }
    }

    fn notify(&self, _target: &'static dyn Dispatch) {
        self.signal.notify();
    }
}

/// Runs the dispatch cycles of several devices in one task, in edge order.
///
/// At most `N` edges can be waiting at once; further edges are dropped and reported by the
/// worker.
pub struct SharedDispatchQueue<const N: usize> {
    queue: Channel<CriticalSectionRawMutex, &'static dyn Dispatch, N>,
    dropped: AtomicU32,
    consumer: AtomicBool,
}

impl<const N: usize> SharedDispatchQueue<N> {
    #[expect(clippy::new_without_default)]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
            dropped: AtomicU32::new(0),
            consumer: AtomicBool::new(false),
        }
    }

    /// Services the queue forever.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::AlreadyRunning`] immediately if another task is servicing the queue.
    pub async fn run(&self) -> Result<Infallible, RunError> {
        let _claim = ConsumerClaim::acquire(&self.consumer).ok_or(RunError::AlreadyRunning)?;

        loop {
            let target = self.queue.receive().await;
            self.report_dropped();
            target.dispatch();
        }
    }

    /// Runs the oldest queued dispatch cycle, if any.
    ///
    /// Intended for applications polling from a main loop instead of running an executor.
    /// Returns `false` without dispatching while [`run()`](SharedDispatchQueue::run) is active.
    pub fn poll_cycle(&self) -> bool {
        let Some(_claim) = ConsumerClaim::acquire(&self.consumer) else {
            return false;
        };

        match self.queue.try_receive() {
            Ok(target) => {
                self.report_dropped();
                target.dispatch();
                true
            }
            Err(_) => false,
        }
    }

    /// Returns the number of edges dropped because the queue was full, since the last report.
    #[must_use]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Acquire)
    }

    fn report_dropped(&self) {
        let dropped = self.dropped.swap(0, Ordering::AcqRel);
        if dropped > 0 {
            warn!("dispatch queue full, {} sensor interrupts dropped", dropped);
        }
    }
}

impl<const N: usize> DispatchRunner for SharedDispatchQueue<N> {
    fn attach(&self, _target: &'static dyn Dispatch) -> Result<(), AttachError> {
        debug!("device attached to shared dispatch queue");
        Ok(())
    }

    fn notify(&self, target: &'static dyn Dispatch) {
        if self.queue.try_send(target).is_err() {
            self.dropped.fetch_add(1, Ordering::AcqRel);
        }
    }
}
