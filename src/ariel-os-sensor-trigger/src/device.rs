//! Provides [`TriggerDevice`], the interrupt trigger support shared by sensor drivers.

use core::cell::{Cell, RefCell};

use embassy_sync::{
    blocking_mutex::{
        raw::{CriticalSectionRawMutex, RawMutex},
        Mutex,
    },
    mutex,
    once_lock::OnceLock,
};
use log::{debug, info};
use portable_atomic::{AtomicU8, Ordering};

use crate::{
    bus::{RegisterBus, RegisterWrite},
    chip::{TriggerChip, MAX_STATUS_LEN},
    gpio::{EdgeListener, GpioController, InterruptPin, PinConfig},
    notifier::EdgeNotifier,
    runner::{Dispatch, DispatchRunner},
    trigger::HandlerTable,
    AttributeKind, ConfigError, InitError, SensorValue, Trigger, TriggerHandler, TriggerKind,
};

/// Interrupt wiring of a trigger device.
#[derive(Debug)]
#[non_exhaustive]
pub struct Config {
    /// Name of the GPIO port the interrupt line of the sensor is connected to.
    pub gpio_port: &'static str,
    /// Pin number on that port.
    pub int_pin: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gpio_port: "GPIO_0",
            int_pin: 0,
        }
    }
}

/// State of a trigger device.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum State {
    /// [`TriggerDevice::init()`] has not completed successfully yet.
    Uninitialized = 0,
    /// Interrupts are wired; dispatch cycles run on each edge.
    Idle = 1,
}

// Not externally observable: reported as `Uninitialized`.
const INITIALIZING: u8 = 0xff;

/// A sensor device able to notify handlers of interrupt-driven triggers.
///
/// Handlers are registered with [`set_trigger()`](TriggerDevice::set_trigger); the hardware
/// interrupt source of a trigger is enabled exactly when a handler is registered for it.
/// On each interrupt edge, the injected [`DispatchRunner`] runs the dispatch routine, which reads
/// the interrupt status of the sensor and invokes the handler of the corresponding trigger.
///
/// Registration and configuration calls on one device must not run concurrently with each other.
pub struct TriggerDevice<C: TriggerChip, B, P, M: RawMutex = CriticalSectionRawMutex> {
    chip: C,
    label: Option<&'static str>,
    state: AtomicU8,
    // Not a critical section: bus transactions may wait on interrupts.
    bus: mutex::Mutex<M, Option<B>>,
    pin: Mutex<M, RefCell<Option<P>>>,
    scale: Mutex<M, Cell<C::Scale>>,
    handlers: HandlerTable<M>,
    notifier: OnceLock<EdgeNotifier>,
}

impl<C: TriggerChip, B: RegisterBus, P, M: RawMutex> TriggerDevice<C, B, P, M> {
    /// Creates an uninitialized device.
    ///
    /// `scale` must match the range the sensor is configured with at initialization.
    #[must_use]
    pub const fn new(chip: C, scale: C::Scale, label: Option<&'static str>) -> Self {
        Self {
            chip,
            label,
            state: AtomicU8::new(State::Uninitialized as u8),
            bus: mutex::Mutex::new(None),
            pin: Mutex::new(RefCell::new(None)),
            scale: Mutex::new(Cell::new(scale)),
            handlers: HandlerTable::new(),
            notifier: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> State {
        if self.state.load(Ordering::Acquire) == State::Idle as u8 {
            State::Idle
        } else {
            State::Uninitialized
        }
    }

    #[must_use]
    pub fn label(&self) -> Option<&'static str> {
        self.label
    }

    #[must_use]
    pub fn chip(&self) -> &C {
        &self.chip
    }

    /// Returns the currently configured full-scale range.
    #[must_use]
    pub fn scale(&self) -> C::Scale {
        self.scale.lock(Cell::get)
    }

    /// Returns the triggers this sensor supports.
    pub fn supported_triggers(&self) -> impl Iterator<Item = TriggerKind> + '_ {
        enum_iterator::all::<TriggerKind>().filter(|kind| self.chip.enable_field(*kind).is_ok())
    }

    /// Registers `handler` for `kind`, or removes the registered handler if `None`.
    ///
    /// Enables the hardware interrupt source of the trigger when a handler is provided and
    /// disables it otherwise. The handler is only stored once the sensor has accepted the
    /// change: on error, the previously registered handler stays in place.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Unsupported`] if the sensor does not provide this trigger.
    /// - [`ConfigError::Io`] if the enable bits could not be written.
    /// - [`ConfigError::Busy`] if the dispatch routine is using the bus.
    /// - [`ConfigError::Uninitialized`] if called before [`init()`](TriggerDevice::init).
    pub fn set_trigger(
        &self,
        kind: TriggerKind,
        handler: Option<&'static dyn TriggerHandler>,
    ) -> Result<(), ConfigError> {
        self.ensure_initialized()?;

        let field = self.chip.enable_field(kind)?;
        self.write_register(field.write(handler.is_some()))?;

        self.handlers.set(kind, handler);
        debug!(
            "{}: {} trigger {}",
            self.chip.part_number(),
            kind,
            if handler.is_some() { "enabled" } else { "disabled" }
        );

        Ok(())
    }

    /// Sets a trigger-related attribute of the sensor.
    ///
    /// Physical values are converted using the current [scale](TriggerDevice::scale).
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidArgument`] if the value has the wrong unit kind.
    /// - [`ConfigError::Unsupported`] if the attribute or value is not supported by the sensor.
    /// - [`ConfigError::Io`] if the register write failed; the device state is left unchanged.
    /// - [`ConfigError::Busy`] if the dispatch routine is using the bus.
    /// - [`ConfigError::Uninitialized`] if called before [`init()`](TriggerDevice::init).
    pub fn set_attribute(
        &self,
        kind: AttributeKind,
        value: SensorValue,
    ) -> Result<(), ConfigError> {
        self.ensure_initialized()?;

        let update = self.chip.configure_attribute(kind, value, self.scale())?;
        self.write_register(update.write)?;

        self.scale.lock(|scale| scale.set(update.scale));

        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), ConfigError> {
        match self.state() {
            State::Idle => Ok(()),
            State::Uninitialized => Err(ConfigError::Uninitialized),
        }
    }

    /// Runs `f` with exclusive access to the bus.
    ///
    /// Returns `None` if the bus has not been handed over yet or is in use by another context.
    fn with_bus<R>(&self, f: impl FnOnce(&mut B) -> R) -> Option<R> {
        let mut bus = self.bus.try_lock().ok()?;
        bus.as_mut().map(f)
    }

    fn write_register(&self, write: RegisterWrite) -> Result<(), ConfigError> {
        match self.with_bus(|bus| write.apply(bus)) {
            Some(Ok(())) => Ok(()),
            Some(Err(err)) => {
                debug!(
                    "{}: write to register {:#04x} failed: {:?}",
                    self.chip.part_number(),
                    write.register,
                    err
                );
                Err(ConfigError::Io)
            }
            None => Err(ConfigError::Busy),
        }
    }
}

impl<C, B, P, M> TriggerDevice<C, B, P, M>
where
    C: TriggerChip + 'static,
    B: RegisterBus + Send + 'static,
    P: InterruptPin + Send + 'static,
    M: RawMutex + Sync + 'static,
{
    /// Sets up the interrupt of the sensor and wires it to `runner`.
    ///
    /// Configures the interrupt output of the sensor, resolves the interrupt GPIO, binds the
    /// device to `runner` and finally enables the edge interrupt of the GPIO. Must be called
    /// once, before registering any trigger.
    ///
    /// With a [`DedicatedRunner`](crate::runner::DedicatedRunner), the application must also
    /// run [`DedicatedRunner::run()`](crate::runner::DedicatedRunner::run) in a task of its own.
    ///
    /// # Errors
    ///
    /// - [`InitError::Io`] if a register write of the interrupt setup failed; later steps are not
    ///   attempted.
    /// - [`InitError::DeviceNotFound`] if the interrupt GPIO cannot be resolved.
    /// - [`InitError::RunnerAttach`] if `runner` already serves another device.
    /// - [`InitError::RunnerMismatch`] if a failed previous attempt bound the device to another
    ///   runner; retries must pass the same runner.
    /// - [`InitError::Pin`] if the GPIO could not be configured.
    /// - [`InitError::AlreadyInitialized`] if the device was already initialized.
    pub fn init<G: GpioController<Pin = P>>(
        &'static self,
        bus: B,
        gpio: &G,
        runner: &'static dyn DispatchRunner,
        config: &Config,
    ) -> Result<(), InitError> {
        if self
            .state
            .compare_exchange(
                State::Uninitialized as u8,
                INITIALIZING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(InitError::AlreadyInitialized);
        }

        let res = self.wire_interrupt(bus, gpio, runner, config);

        if res.is_ok() {
            self.state.store(State::Idle as u8, Ordering::Release);
            info!(
                "{} trigger support initialized on {} pin {}",
                self.chip.part_number(),
                config.gpio_port,
                config.int_pin
            );
        } else {
            self.state.store(State::Uninitialized as u8, Ordering::Release);
        }

        res
    }

    fn wire_interrupt<G: GpioController<Pin = P>>(
        &'static self,
        bus: B,
        gpio: &G,
        runner: &'static dyn DispatchRunner,
        config: &Config,
    ) -> Result<(), InitError> {
        match self.bus.try_lock() {
            Ok(mut slot) => *slot = Some(bus),
            Err(_) => {
                debug!("{}: bus in use", self.chip.part_number());
                return Err(InitError::Io);
            }
        }

        for step in self.chip.interrupt_setup() {
            self.write_register(step.write).map_err(|_| {
                debug!("{}: failed to {}", self.chip.part_number(), step.description);
                InitError::Io
            })?;
        }

        let Some(mut pin) = gpio.pin(config.gpio_port, config.int_pin) else {
            debug!(
                "{}: GPIO {} pin {} not found",
                self.chip.part_number(),
                config.gpio_port,
                config.int_pin
            );
            return Err(InitError::DeviceNotFound);
        };

        // The GPIO listener of an earlier attempt keeps notifying the runner it was created with.
        if self
            .notifier
            .try_get()
            .is_some_and(|notifier| !notifier.is_bound_to(runner))
        {
            debug!("{}: already bound to another runner", self.chip.part_number());
            return Err(InitError::RunnerMismatch);
        }

        // The runner is bound before the GPIO interrupt is enabled, so that the first edge
        // already has a dispatch context.
        runner.attach(self)?;

        let notifier = self.notifier.get_or_init(|| EdgeNotifier::new(runner, self));
        enable_edge_interrupt(&mut pin, notifier).map_err(|err| {
            debug!("{}: failed to configure GPIO: {:?}", self.chip.part_number(), err);
            InitError::Pin
        })?;

        self.pin.lock(|cell| *cell.borrow_mut() = Some(pin));

        Ok(())
    }
}

fn enable_edge_interrupt<P: InterruptPin>(
    pin: &mut P,
    listener: &'static dyn EdgeListener,
) -> Result<(), P::Error> {
    pin.disable_interrupt()?;
    pin.configure(PinConfig::active_low_edge())?;
    pin.set_listener(listener)?;
    pin.enable_interrupt()
}

impl<C, B, P, M> Dispatch for TriggerDevice<C, B, P, M>
where
    C: TriggerChip,
    B: RegisterBus + Send,
    P: Send,
    M: RawMutex + Sync,
{
    fn dispatch(&self) {
        let block = self.chip.status_block();
        debug_assert!(
            block.len <= MAX_STATUS_LEN,
            "status block longer than MAX_STATUS_LEN"
        );
        let len = block.len.min(MAX_STATUS_LEN);
        let mut status = [0; MAX_STATUS_LEN];

        match self.with_bus(|bus| bus.read_bytes(block.register, &mut status[..len])) {
            Some(Ok(())) => {}
            Some(Err(err)) => {
                // The next edge starts a new cycle.
                debug!(
                    "{}: failed to read interrupt status: {:?}",
                    self.chip.part_number(),
                    err
                );
                return;
            }
            None => {
                debug!(
                    "{}: bus in use, interrupt status not read",
                    self.chip.part_number()
                );
                return;
            }
        }

        let kind = self.chip.classify(&status[..len]);

        // The handler is called without any lock held, so it may (de)register triggers.
        match self.handlers.get(kind) {
            Some(handler) => handler.handle(Trigger {
                kind,
                channel: self.chip.channel(),
            }),
            None => debug!(
                "{}: {} interrupt without handler",
                self.chip.part_number(),
                kind
            ),
        }
    }
}
