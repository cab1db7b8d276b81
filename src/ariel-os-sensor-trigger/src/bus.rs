//! Register access to the sensor device.

use embedded_hal::i2c::{I2c, SevenBitAddress};

/// Register-level access to a sensor device.
///
/// Implemented by [`I2cRegisterBus`] for I2C-connected sensors.
pub trait RegisterBus {
    type Error: core::fmt::Debug;

    /// Reads `buf.len()` consecutive registers starting at `register`, in a single transaction.
    fn read_bytes(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Writes `value` to `register`.
    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), Self::Error>;

    /// Replaces the bits of `register` selected by `mask` with those of `value`.
    ///
    /// The default implementation is a read-modify-write.
    fn update_bits(&mut self, register: u8, mask: u8, value: u8) -> Result<(), Self::Error> {
        let mut current = [0];
        self.read_bytes(register, &mut current)?;
        let [current] = current;
        self.write_byte(register, (current & !mask) | (value & mask))
    }
}

/// [`RegisterBus`] over an [`embedded_hal`] I2C bus.
pub struct I2cRegisterBus<I2C> {
    i2c: I2C,
    address: SevenBitAddress,
    auto_increment: u8,
}

impl<I2C: I2c> I2cRegisterBus<I2C> {
    /// Creates a register bus for the device at `address`.
    #[must_use]
    pub const fn new(i2c: I2C, address: SevenBitAddress) -> Self {
        Self {
            i2c,
            address,
            auto_increment: 0,
        }
    }

    /// Sets the bits to be OR'ed into the register address of multi-byte reads.
    ///
    /// Some devices (e.g., from ST) only increment the register address during a burst read
    /// when the MSB of the register address is set.
    #[must_use]
    pub const fn with_auto_increment(mut self, flag: u8) -> Self {
        self.auto_increment = flag;
        self
    }

    /// Destroys the instance and returns the wrapped bus.
    pub fn destroy(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> RegisterBus for I2cRegisterBus<I2C> {
    type Error = I2C::Error;

    fn read_bytes(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        let register = if buf.len() > 1 {
            register | self.auto_increment
        } else {
            register
        };
        self.i2c.write_read(self.address, &[register], buf)
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        self.i2c.write(self.address, &[register, value])
    }
}

/// A write to a single register.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterWrite {
    pub register: u8,
    /// Bits of the register affected by the write; `0xff` overwrites the whole register.
    pub mask: u8,
    pub value: u8,
}

impl RegisterWrite {
    /// Overwrites the whole register.
    #[must_use]
    pub const fn byte(register: u8, value: u8) -> Self {
        Self {
            register,
            mask: 0xff,
            value,
        }
    }

    /// Only updates the bits selected by `mask`.
    #[must_use]
    pub const fn field(register: u8, mask: u8, value: u8) -> Self {
        Self {
            register,
            mask,
            value: value & mask,
        }
    }

    /// Performs the write, using a read-modify-write only if part of the register is preserved.
    pub fn apply<B: RegisterBus + ?Sized>(&self, bus: &mut B) -> Result<(), B::Error> {
        if self.mask == 0xff {
            bus.write_byte(self.register, self.value)
        } else {
            bus.update_bits(self.register, self.mask, self.value)
        }
    }
}
