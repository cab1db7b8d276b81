//! Platform GPIO interface used to receive sensor interrupts.

/// Signal edge on which the pin interrupt fires.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Rising,
    Falling,
}

/// Electrical and interrupt configuration of an interrupt input pin.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    pub edge: Edge,
    /// Whether the line is asserted when low.
    pub active_low: bool,
    pub debounce: bool,
}

impl PinConfig {
    /// Edge-triggered on assertion of an active-low line, debounced.
    #[must_use]
    pub const fn active_low_edge() -> Self {
        Self {
            edge: Edge::Falling,
            active_low: true,
            debounce: true,
        }
    }
}

/// Callback invoked by the platform when an interrupt edge is detected.
pub trait EdgeListener: Sync {
    /// Called from interrupt context.
    ///
    /// Implementations must not block, allocate, or access a bus.
    fn on_edge(&self);
}

/// A GPIO configured as an interrupt input.
pub trait InterruptPin {
    type Error: core::fmt::Debug;

    fn configure(&mut self, config: PinConfig) -> Result<(), Self::Error>;

    /// Registers the listener to call on each configured edge, replacing any previous one.
    fn set_listener(&mut self, listener: &'static dyn EdgeListener) -> Result<(), Self::Error>;

    fn enable_interrupt(&mut self) -> Result<(), Self::Error>;

    fn disable_interrupt(&mut self) -> Result<(), Self::Error>;
}

/// Resolves GPIO pins by controller name.
pub trait GpioController {
    type Pin: InterruptPin;

    /// Returns pin `pin` of the GPIO port named `port`, or `None` if either does not exist or
    /// the pin is already in use.
    fn pin(&self, port: &str, pin: u8) -> Option<Self::Pin>;
}
