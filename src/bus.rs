//! Register access over I²C, with retry.
//!
//! Every register read and write the driver performs goes through
//! [`RegisterBus`], so there is exactly one place that decides what happens
//! when the bus misbehaves.

use embedded_hal::blocking::{
    delay::DelayMs,
    i2c::{Write, WriteRead},
};

use crate::Error;

//
// Public Data
//

/// How many times a transaction is attempted before giving up.
pub const MAX_TRIES: usize = 3;

/// How long to wait between attempts, in milliseconds.
pub const RETRY_DELAY_MS: u32 = 100;

//
// Private Types
//

/// Owns the I²C bus and the delay used to back off between attempts.
pub(crate) struct RegisterBus<I2C, D> {
    i2c: I2C,
    delay: D,
}

//
// impls on Private Types
//

impl<I2C, D, E> RegisterBus<I2C, D>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
{
    pub(crate) fn new(i2c: I2C, delay: D) -> RegisterBus<I2C, D> {
        RegisterBus { i2c, delay }
    }

    /// Give back the bus and delay objects.
    pub(crate) fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    /// Read `buffer.len()` consecutive registers starting at `register`.
    ///
    /// This is one write-then-read transaction. A failure retries the whole
    /// transaction, never part of it.
    pub(crate) fn read(&mut self, address: u8, register: u8, buffer: &mut [u8]) -> Result<(), Error<E>> {
        if buffer.is_empty() {
            return Err(Error::InvalidArgument);
        }
        let mut attempt = 1;
        loop {
            match self.i2c.write_read(address, &[register], buffer) {
                Ok(()) => return Ok(()),
                Err(source) if attempt >= MAX_TRIES => {
                    error!(
                        "read failed after {} tries: addr 0x{:02x} reg 0x{:02x}",
                        attempt,
                        address,
                        register
                    );
                    return Err(Error::Bus {
                        address,
                        register,
                        value: None,
                        source,
                    });
                }
                Err(_) => {
                    self.delay.delay_ms(RETRY_DELAY_MS);
                    attempt += 1;
                }
            }
        }
    }

    /// Read a single register.
    pub(crate) fn read_byte(&mut self, address: u8, register: u8) -> Result<u8, Error<E>> {
        let mut buffer = [0u8; 1];
        self.read(address, register, &mut buffer)?;
        Ok(buffer[0])
    }

    /// Write a single register.
    pub(crate) fn write(&mut self, address: u8, register: u8, value: u8) -> Result<(), Error<E>> {
        let mut attempt = 1;
        loop {
            match self.i2c.write(address, &[register, value]) {
                Ok(()) => return Ok(()),
                Err(source) if attempt >= MAX_TRIES => {
                    error!(
                        "write failed after {} tries: addr 0x{:02x} reg 0x{:02x} val 0x{:02x}",
                        attempt,
                        address,
                        register,
                        value
                    );
                    return Err(Error::Bus {
                        address,
                        register,
                        value: Some(value),
                        source,
                    });
                }
                Err(_) => {
                    self.delay.delay_ms(RETRY_DELAY_MS);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeChip, Fault};

    #[test]
    fn read_survives_two_failures() {
        let chip = FakeChip::new();
        chip.set(0x39, 0x42, 0x60);
        chip.inject(Fault::NextTransactions(2));
        let (i2c, delay) = chip.bus();
        let mut bus = RegisterBus::new(i2c, delay);
        assert_eq!(bus.read_byte(0x39, 0x42), Ok(0x60));
        assert_eq!(chip.delayed_ms(), 200);
    }

    #[test]
    fn read_gives_up_after_three_failures() {
        let chip = FakeChip::new();
        chip.inject(Fault::NextTransactions(3));
        let (i2c, delay) = chip.bus();
        let mut bus = RegisterBus::new(i2c, delay);
        let result = bus.read_byte(0x39, 0x42);
        assert!(matches!(
            result,
            Err(Error::Bus {
                address: 0x39,
                register: 0x42,
                value: None,
                ..
            })
        ));
        assert_eq!(chip.transactions(), 3);
    }

    #[test]
    fn write_survives_two_failures() {
        let chip = FakeChip::new();
        chip.inject(Fault::NextTransactions(2));
        let (i2c, delay) = chip.bus();
        let mut bus = RegisterBus::new(i2c, delay);
        assert_eq!(bus.write(0x39, 0x41, 0x10), Ok(()));
        assert_eq!(chip.transactions(), 3);
        assert_eq!(chip.delayed_ms(), 2 * u64::from(RETRY_DELAY_MS));
        assert_eq!(chip.writes(), [(0x39, 0x41, 0x10)]);
    }

    #[test]
    fn write_failure_reports_value() {
        let chip = FakeChip::new();
        chip.inject(Fault::Register(0x3C, 0x27));
        let (i2c, delay) = chip.bus();
        let mut bus = RegisterBus::new(i2c, delay);
        assert!(matches!(
            bus.write(0x3C, 0x27, 0xCB),
            Err(Error::Bus {
                address: 0x3C,
                register: 0x27,
                value: Some(0xCB),
                ..
            })
        ));
        assert!(chip.writes().is_empty());
    }

    #[test]
    fn multi_byte_read_is_one_transaction() {
        let chip = FakeChip::new();
        for i in 0..16u8 {
            chip.set(0x3C, 0x85 + i, i);
        }
        let (i2c, delay) = chip.bus();
        let mut bus = RegisterBus::new(i2c, delay);
        let mut buffer = [0u8; 16];
        bus.read(0x3C, 0x85, &mut buffer).unwrap();
        assert_eq!(chip.transactions(), 1);
        assert_eq!(buffer[15], 15);
    }

    #[test]
    fn empty_read_is_rejected() {
        let chip = FakeChip::new();
        let (i2c, delay) = chip.bus();
        let mut bus = RegisterBus::new(i2c, delay);
        assert_eq!(bus.read(0x39, 0x00, &mut []), Err(Error::InvalidArgument));
        assert_eq!(chip.transactions(), 0);
    }
}

//
// End of file
//
