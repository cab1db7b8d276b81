//! Interrupt-context half of the trigger dispatch.

use crate::{
    gpio::EdgeListener,
    runner::{Dispatch, DispatchRunner},
};

/// Edge listener handing each interrupt edge over to a [`DispatchRunner`].
///
/// This is the only code of a trigger device that runs in interrupt context. It does not touch
/// the bus nor the handler slots.
pub struct EdgeNotifier {
    runner: &'static dyn DispatchRunner,
    target: &'static dyn Dispatch,
}

impl EdgeNotifier {
    #[must_use]
    pub const fn new(runner: &'static dyn DispatchRunner, target: &'static dyn Dispatch) -> Self {
        Self { runner, target }
    }

    /// Returns whether edges are handed over to `runner`.
    #[must_use]
    pub fn is_bound_to(&self, runner: &dyn DispatchRunner) -> bool {
        core::ptr::addr_eq(self.runner, runner)
    }
}

impl EdgeListener for EdgeNotifier {
    fn on_edge(&self) {
        self.runner.notify(self.target);
    }
}
