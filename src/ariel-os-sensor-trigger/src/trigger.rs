//! Triggers a caller can subscribe to, and the slots holding their handlers.

use core::cell::Cell;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};
use enum_iterator::Sequence;

/// Logical sensor event a handler can be registered for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Sequence, serde::Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerKind {
    /// A new sample is available.
    DataReady,
    /// The rate of change of the measured quantity exceeded the configured slope threshold
    /// (any-motion).
    Delta,
}

impl TriggerKind {
    const COUNT: usize = 2;

    const fn index(self) -> usize {
        match self {
            Self::DataReady => 0,
            Self::Delta => 1,
        }
    }
}

impl core::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DataReady => write!(f, "data ready"),
            Self::Delta => write!(f, "delta"),
        }
    }
}

/// Measurement channel a trigger relates to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum SensorChannel {
    /// Any axis of an accelerometer.
    AccelAny,
    /// Any axis of a gyroscope.
    GyroAny,
    /// Every channel of the sensor.
    All,
}

/// Descriptor passed to a [`TriggerHandler`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Trigger {
    pub kind: TriggerKind,
    pub channel: SensorChannel,
}

/// Receives the triggers a handler has been registered for.
///
/// Handlers are owned by the caller registering them; the device only keeps a reference.
/// [`handle()`](TriggerHandler::handle) runs in the dispatch context, where blocking and bus
/// access are allowed, but it delays every other dispatch served by the same runner.
pub trait TriggerHandler: Sync {
    fn handle(&self, trigger: Trigger);
}

type HandlerRef = Option<&'static dyn TriggerHandler>;

pub(crate) struct HandlerTable<M: RawMutex> {
    slots: [Mutex<M, Cell<HandlerRef>>; TriggerKind::COUNT],
}

impl<M: RawMutex> HandlerTable<M> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: [Mutex::new(Cell::new(None)), Mutex::new(Cell::new(None))],
        }
    }

    fn slot(&self, kind: TriggerKind) -> &Mutex<M, Cell<HandlerRef>> {
        // NOTE(no-panic): there is one slot per kind
        &self.slots[kind.index()]
    }

    pub(crate) fn get(&self, kind: TriggerKind) -> HandlerRef {
        self.slot(kind).lock(Cell::get)
    }

    pub(crate) fn set(&self, kind: TriggerKind, handler: HandlerRef) {
        self.slot(kind).lock(|slot| slot.set(handler));
    }
}
