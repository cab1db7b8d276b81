//! Description of the interrupt registers of a sensor chip.

use crate::{
    bus::RegisterWrite, AttributeKind, ConfigError, SensorChannel, SensorValue, TriggerKind,
};

/// Maximum length of the interrupt status block read on each dispatch cycle.
pub const MAX_STATUS_LEN: usize = 8;

/// Location of the interrupt status registers, read in a single burst.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StatusBlock {
    pub register: u8,
    /// Must not exceed [`MAX_STATUS_LEN`].
    pub len: usize,
}

/// Register bits enabling the hardware source of a trigger.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EnableField {
    pub register: u8,
    pub mask: u8,
}

impl EnableField {
    /// Sets every bit of the field when `enabled`, clears them otherwise.
    #[must_use]
    pub const fn write(&self, enabled: bool) -> RegisterWrite {
        RegisterWrite::field(self.register, self.mask, if enabled { self.mask } else { 0 })
    }
}

/// One register write of the interrupt setup sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SetupStep {
    pub write: RegisterWrite,
    /// What the step configures, for diagnostics.
    pub description: &'static str,
}

/// Result of converting an attribute value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttributeUpdate<S> {
    pub write: RegisterWrite,
    /// Scale in effect once the write succeeded.
    pub scale: S,
}

/// Chip-specific part of a [`TriggerDevice`](crate::TriggerDevice).
pub trait TriggerChip: Sync {
    /// Full-scale range setting, used to convert physical thresholds to register values.
    type Scale: Copy + Send + core::fmt::Debug;

    /// Returns the hardware sensor part number.
    fn part_number(&self) -> &'static str;

    /// Channel reported in the trigger descriptors.
    fn channel(&self) -> SensorChannel;

    fn status_block(&self) -> StatusBlock;

    /// Determines which trigger an interrupt status corresponds to.
    fn classify(&self, status: &[u8]) -> TriggerKind;

    /// Returns the enable bits of the hardware source of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unsupported`] if the chip does not provide this trigger.
    fn enable_field(&self, kind: TriggerKind) -> Result<EnableField, ConfigError>;

    /// Converts an attribute value to its register write, given the current `scale`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidArgument`] if the value is of the wrong kind.
    /// - [`ConfigError::Unsupported`] if the attribute or value is not supported.
    fn configure_attribute(
        &self,
        kind: AttributeKind,
        value: SensorValue,
        scale: Self::Scale,
    ) -> Result<AttributeUpdate<Self::Scale>, ConfigError>;

    /// Register writes configuring the interrupt pin and routing interrupt sources to it, in
    /// order.
    fn interrupt_setup(&self) -> &'static [SetupStep];
}
