//! A simulated ADV7533 for the unit tests.
//!
//! [`FakeChip`] is a register file keyed on (bus address, register). It
//! implements the embedded-hal I²C and delay traits, keeps a log of every
//! successful write and can be told to fail transactions.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::vec::Vec;

use embedded_hal::blocking::{
    delay::DelayMs,
    i2c::{Write, WriteRead},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FakeError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The next N transactions fail, whatever they are
    NextTransactions(usize),
    /// Every transaction starting at this (address, register) fails
    Register(u8, u8),
}

#[derive(Default)]
struct Model {
    registers: BTreeMap<(u8, u8), u8>,
    writes: Vec<(u8, u8, u8)>,
    transactions: usize,
    fail_next: usize,
    bad_registers: Vec<(u8, u8)>,
    delayed_ms: u64,
}

impl Model {
    fn attempt(&mut self, address: u8, register: u8) -> Result<(), FakeError> {
        self.transactions += 1;
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(FakeError);
        }
        if self.bad_registers.contains(&(address, register)) {
            return Err(FakeError);
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeChip(Arc<Mutex<Model>>);

pub struct FakeI2c(Arc<Mutex<Model>>);

pub struct FakeDelay(Arc<Mutex<Model>>);

impl FakeChip {
    pub fn new() -> FakeChip {
        FakeChip::default()
    }

    fn model(&self) -> MutexGuard<'_, Model> {
        self.0.lock().unwrap()
    }

    pub fn bus(&self) -> (FakeI2c, FakeDelay) {
        (FakeI2c(self.0.clone()), FakeDelay(self.0.clone()))
    }

    pub fn set(&self, address: u8, register: u8, value: u8) {
        self.model().registers.insert((address, register), value);
    }

    pub fn set_block(&self, address: u8, start: u8, values: &[u8]) {
        let mut model = self.model();
        for (i, value) in values.iter().enumerate() {
            model
                .registers
                .insert((address, start.wrapping_add(i as u8)), *value);
        }
    }

    pub fn get(&self, address: u8, register: u8) -> u8 {
        self.model()
            .registers
            .get(&(address, register))
            .copied()
            .unwrap_or(0)
    }

    pub fn inject(&self, fault: Fault) {
        let mut model = self.model();
        match fault {
            Fault::NextTransactions(n) => model.fail_next = n,
            Fault::Register(address, register) => model.bad_registers.push((address, register)),
        }
    }

    /// Every successful write, oldest first, as (address, register, value).
    pub fn writes(&self) -> Vec<(u8, u8, u8)> {
        self.model().writes.clone()
    }

    /// The values written to one register, oldest first.
    pub fn writes_to(&self, address: u8, register: u8) -> Vec<u8> {
        self.model()
            .writes
            .iter()
            .filter(|(a, r, _)| *a == address && *r == register)
            .map(|(_, _, v)| *v)
            .collect()
    }

    pub fn clear_log(&self) {
        let mut model = self.model();
        model.writes.clear();
        model.transactions = 0;
    }

    /// Transaction attempts so far, failed ones included.
    pub fn transactions(&self) -> usize {
        self.model().transactions
    }

    pub fn delayed_ms(&self) -> u64 {
        self.model().delayed_ms
    }
}

impl Write for FakeI2c {
    type Error = FakeError;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        let mut model = self.0.lock().unwrap();
        let (register, value) = (bytes[0], bytes[1]);
        model.attempt(address, register)?;
        model.registers.insert((address, register), value);
        model.writes.push((address, register, value));
        Ok(())
    }
}

impl WriteRead for FakeI2c {
    type Error = FakeError;

    fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error> {
        let mut model = self.0.lock().unwrap();
        let register = bytes[0];
        model.attempt(address, register)?;
        for (i, byte) in buffer.iter_mut().enumerate() {
            let offset = register.wrapping_add(i as u8);
            *byte = model
                .registers
                .get(&(address, offset))
                .copied()
                .unwrap_or(0);
        }
        Ok(())
    }
}

impl DelayMs<u32> for FakeDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.0.lock().unwrap().delayed_ms += u64::from(ms);
    }
}

//
// End of file
//
