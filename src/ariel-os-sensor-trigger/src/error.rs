/// Errors returned by trigger registration and attribute configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A bus transaction failed.
    Io,
    /// The value is not of the unit kind the attribute expects.
    InvalidArgument,
    /// The kind or value is outside of what the hardware supports.
    Unsupported,
    /// The device has not been initialized yet.
    Uninitialized,
    /// The bus is in use by the dispatch routine of the device; the call can be retried.
    Busy,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io => write!(f, "bus transaction failed"),
            Self::InvalidArgument => write!(f, "value has the wrong unit kind"),
            Self::Unsupported => write!(f, "not supported by the sensor"),
            Self::Uninitialized => write!(f, "sensor is not initialized"),
            Self::Busy => write!(f, "bus is in use"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Errors returned by [`TriggerDevice::init()`](crate::TriggerDevice::init).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// A register write of the interrupt setup failed.
    Io,
    /// The GPIO controller or pin could not be resolved.
    DeviceNotFound,
    /// The interrupt pin could not be configured.
    Pin,
    /// The device could not be attached to its dispatch runner.
    RunnerAttach(AttachError),
    /// A failed previous attempt already bound the device to another dispatch runner.
    RunnerMismatch,
    /// [`init()`](crate::TriggerDevice::init) has already been called successfully.
    AlreadyInitialized,
}

impl core::fmt::Display for InitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io => write!(f, "interrupt setup bus transaction failed"),
            Self::DeviceNotFound => write!(f, "interrupt GPIO not found"),
            Self::Pin => write!(f, "interrupt GPIO could not be configured"),
            Self::RunnerAttach(err) => write!(f, "cannot attach dispatch runner: {err}"),
            Self::RunnerMismatch => write!(f, "sensor bound to another dispatch runner"),
            Self::AlreadyInitialized => write!(f, "sensor already initialized"),
        }
    }
}

impl core::error::Error for InitError {}

impl From<AttachError> for InitError {
    fn from(err: AttachError) -> Self {
        Self::RunnerAttach(err)
    }
}

/// Errors returned by [`DispatchRunner::attach()`](crate::runner::DispatchRunner::attach).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttachError {
    /// The runner serves a single device and is already bound to one.
    AlreadyAttached,
}

impl core::fmt::Display for AttachError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AlreadyAttached => write!(f, "runner already attached to a device"),
        }
    }
}

impl core::error::Error for AttachError {}

/// Error returned by the `run()` method of a dispatch runner.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunError {
    /// Another task already services this runner.
    AlreadyRunning,
}

impl core::fmt::Display for RunError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "runner already serviced by another task"),
        }
    }
}

impl core::error::Error for RunError {}
