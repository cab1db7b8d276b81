//! In-memory bus and GPIO platform, to exercise trigger devices without hardware.
//!
//! Register contents live in a [`DummyRegisters`] shared between the test and the
//! [`DummyBus`] handed to the device; interrupt edges are simulated with
//! [`DummyPinState::fire_edge()`].

use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::{
    bus::RegisterBus,
    gpio::{EdgeListener, GpioController, InterruptPin, PinConfig},
};

const REGISTER_COUNT: usize = 256;

#[derive(Debug, Copy, Clone)]
struct Faults {
    reads: bool,
    writes: bool,
    write_register: Option<u8>,
}

/// Register file of a simulated device.
pub struct DummyRegisters {
    registers: Mutex<CriticalSectionRawMutex, RefCell<[u8; REGISTER_COUNT]>>,
    faults: Mutex<CriticalSectionRawMutex, Cell<Faults>>,
    write_count: AtomicUsize,
}

impl DummyRegisters {
    #[expect(clippy::new_without_default)]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            registers: Mutex::new(RefCell::new([0; REGISTER_COUNT])),
            faults: Mutex::new(Cell::new(Faults {
                reads: false,
                writes: false,
                write_register: None,
            })),
            write_count: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn get(&self, register: u8) -> u8 {
        self.registers
            .lock(|registers| registers.borrow()[usize::from(register)])
    }

    /// Sets a register without counting it as a bus write.
    pub fn set(&self, register: u8, value: u8) {
        self.registers
            .lock(|registers| registers.borrow_mut()[usize::from(register)] = value);
    }

    /// Number of successful bus writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::Acquire)
    }

    /// Makes every bus read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.update_faults(|faults| faults.reads = fail);
    }

    /// Makes every bus write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.update_faults(|faults| faults.writes = fail);
    }

    /// Makes bus writes to `register` fail.
    pub fn fail_writes_to(&self, register: Option<u8>) {
        self.update_faults(|faults| faults.write_register = register);
    }

    fn update_faults(&self, f: impl FnOnce(&mut Faults)) {
        self.faults.lock(|cell| {
            let mut faults = cell.get();
            f(&mut faults);
            cell.set(faults);
        });
    }

    fn faults(&self) -> Faults {
        self.faults.lock(Cell::get)
    }
}

/// Error returned by a [`DummyBus`] with injected faults.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DummyBusError;

/// [`RegisterBus`] accessing a [`DummyRegisters`].
pub struct DummyBus {
    registers: &'static DummyRegisters,
}

impl DummyBus {
    #[must_use]
    pub const fn new(registers: &'static DummyRegisters) -> Self {
        Self { registers }
    }
}

impl RegisterBus for DummyBus {
    type Error = DummyBusError;

    fn read_bytes(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        if self.registers.faults().reads {
            return Err(DummyBusError);
        }

        let start = usize::from(register);
        self.registers.registers.lock(|registers| {
            match registers.borrow().get(start..start + buf.len()) {
                Some(source) => {
                    buf.copy_from_slice(source);
                    Ok(())
                }
                None => Err(DummyBusError),
            }
        })
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        let faults = self.registers.faults();
        if faults.writes || faults.write_register == Some(register) {
            return Err(DummyBusError);
        }

        self.registers.set(register, value);
        self.registers.write_count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

/// Simulated interrupt line.
pub struct DummyPinState {
    listener: Mutex<CriticalSectionRawMutex, Cell<Option<&'static dyn EdgeListener>>>,
    config: Mutex<CriticalSectionRawMutex, Cell<Option<PinConfig>>>,
    enabled: AtomicBool,
    fail_enable: AtomicBool,
}

impl DummyPinState {
    #[expect(clippy::new_without_default)]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            listener: Mutex::new(Cell::new(None)),
            config: Mutex::new(Cell::new(None)),
            enabled: AtomicBool::new(false),
            fail_enable: AtomicBool::new(false),
        }
    }

    /// Makes the next interrupt enable fail.
    pub fn fail_next_enable(&self) {
        self.fail_enable.store(true, Ordering::Release);
    }

    /// Simulates an interrupt edge, calling the registered listener as an interrupt handler
    /// would.
    ///
    /// Returns whether a listener was called.
    pub fn fire_edge(&self) -> bool {
        if !self.enabled.load(Ordering::Acquire) {
            return false;
        }

        match self.listener.lock(Cell::get) {
            Some(listener) => {
                listener.on_edge();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn config(&self) -> Option<PinConfig> {
        self.config.lock(Cell::get)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

/// Error returned by a [`DummyPin`] with an injected fault.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DummyPinError;

/// [`InterruptPin`] driving a [`DummyPinState`].
pub struct DummyPin {
    state: &'static DummyPinState,
}

impl InterruptPin for DummyPin {
    type Error = DummyPinError;

    fn configure(&mut self, config: PinConfig) -> Result<(), Self::Error> {
        self.state.config.lock(|cell| cell.set(Some(config)));
        Ok(())
    }

    fn set_listener(&mut self, listener: &'static dyn EdgeListener) -> Result<(), Self::Error> {
        self.state.listener.lock(|cell| cell.set(Some(listener)));
        Ok(())
    }

    fn enable_interrupt(&mut self) -> Result<(), Self::Error> {
        if self.state.fail_enable.swap(false, Ordering::AcqRel) {
            return Err(DummyPinError);
        }
        self.state.enabled.store(true, Ordering::Release);
        Ok(())
    }

    fn disable_interrupt(&mut self) -> Result<(), Self::Error> {
        self.state.enabled.store(false, Ordering::Release);
        Ok(())
    }
}

/// GPIO controller exposing a single interrupt pin.
pub struct DummyGpio {
    port: &'static str,
    pin: u8,
    state: &'static DummyPinState,
}

impl DummyGpio {
    #[must_use]
    pub const fn new(port: &'static str, pin: u8, state: &'static DummyPinState) -> Self {
        Self { port, pin, state }
    }
}

impl GpioController for DummyGpio {
    type Pin = DummyPin;

    fn pin(&self, port: &str, pin: u8) -> Option<Self::Pin> {
        (port == self.port && pin == self.pin).then_some(DummyPin { state: self.state })
    }
}
