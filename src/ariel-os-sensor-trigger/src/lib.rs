//! Interrupt-driven trigger dispatch for sensor drivers.
//!
//! A sensor signals a condition (new sample ready, motion threshold crossed) on an interrupt
//! line. The [`EdgeNotifier`](notifier::EdgeNotifier) registered on that line only wakes a
//! [`DispatchRunner`](runner::DispatchRunner); the runner then executes the dispatch routine of
//! the [`TriggerDevice`](device::TriggerDevice) outside of interrupt context, where bus
//! transactions are allowed and user [`TriggerHandler`]s are invoked.
//!
//! Chip-specific knowledge (register addresses, status classification, attribute conversion) is
//! provided by implementing [`TriggerChip`](chip::TriggerChip).
#![no_std]
#![deny(unused_must_use)]
#![deny(clippy::pedantic)]

pub mod attribute;
pub mod bus;
pub mod chip;
pub mod device;
#[cfg(any(test, feature = "dummy"))]
pub mod dummy;
mod error;
pub mod gpio;
pub mod notifier;
pub mod runner;
mod signal;
pub mod trigger;

pub use attribute::{AttributeKind, SensorValue};
pub use device::{Config, State, TriggerDevice};
pub use error::{AttachError, ConfigError, InitError, RunError};
pub use signal::DispatchSignal;
pub use trigger::{SensorChannel, Trigger, TriggerHandler, TriggerKind};
