//! CEC message transmit and receive.
//!
//! The chip has one transmit buffer and three receive buffers. Received
//! frames are copied out of the chip by the interrupt handler into a
//! matching [`CecSlot`], where they wait until a client collects them.

use embedded_hal::blocking::{
    delay::DelayMs,
    i2c::{Write, WriteRead},
};

use crate::{bus::RegisterBus, registers, registers::Interrupt2, Config, Error, RegisterMap};

//
// Public Types
//

/// A received CEC frame: header block, opcode, then up to 14 operands.
///
/// Frames shorter than the maximum are padded with whatever the chip had in
/// its receive buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CecMessage {
    bytes: [u8; CEC_MSG_SIZE],
}

//
// Private Types
//

/// One of the three receive buffers, as copied out of the chip.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub(crate) struct CecSlot {
    message: [u8; CEC_MSG_SIZE],
    /// Arrival order tag from the chip. Zero means not valid yet.
    timestamp: u8,
    pending: bool,
}

/// The three receive slots, in buffer order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub(crate) struct CecSlots([CecSlot; NUM_SLOTS]);

//
// Public Data
//

/// Maximum operands in one frame.
pub const MAX_OPERANDS: usize = 14;

/// Size of a frame: header, opcode and operands.
pub const CEC_MSG_SIZE: usize = MAX_OPERANDS + 2;

/// Number of receive buffers in the chip.
pub const NUM_SLOTS: usize = 3;

//
// Private Data
//

/// Chip register holding each receive buffer.
const SLOT_REGISTERS: [u8; NUM_SLOTS] = [
    registers::CEC_RX_BUF1,
    registers::CEC_RX_BUF2,
    registers::CEC_RX_BUF3,
];

/// Value of the receive control register when we couldn't read it.
const RX_CONTROL_DEFAULT: u8 = 0x08;

//
// impls on Public Types
//

impl CecMessage {
    /// Wrap a full-size frame.
    pub fn from_bytes(bytes: [u8; CEC_MSG_SIZE]) -> CecMessage {
        CecMessage { bytes }
    }

    /// Initiator (upper nibble) and destination (lower nibble).
    pub fn header(&self) -> u8 {
        self.bytes[0]
    }

    /// The CEC opcode.
    pub fn opcode(&self) -> u8 {
        self.bytes[1]
    }

    /// All operand bytes.
    pub fn operands(&self) -> &[u8] {
        &self.bytes[2..]
    }

    /// The whole frame.
    pub fn as_bytes(&self) -> &[u8; CEC_MSG_SIZE] {
        &self.bytes
    }
}

//
// impls on Private Types
//

impl CecSlots {
    /// Record a frame that has just arrived in buffer `index`.
    pub(crate) fn store(&mut self, index: usize, message: [u8; CEC_MSG_SIZE], timestamp: u8) {
        self.0[index] = CecSlot {
            message,
            timestamp,
            pending: true,
        };
    }

    /// Hand out the first pending frame with a valid timestamp, searching
    /// buffers 1, 2, 3 in that order.
    pub(crate) fn take(&mut self) -> Option<CecMessage> {
        let slot = self
            .0
            .iter_mut()
            .find(|slot| slot.pending && slot.timestamp != 0)?;
        slot.pending = false;
        Some(CecMessage::from_bytes(slot.message))
    }

    /// Pending flags, bit N for buffer N + 1.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> u8 {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.pending)
            .fold(0, |acc, (i, _)| acc | (1 << i))
    }
}

//
// Private Functions
//

/// Load a frame into the transmit buffer and send it.
pub(crate) fn transmit<I2C, D, E>(
    bus: &mut RegisterBus<I2C, D>,
    config: &Config,
    message: &[u8],
) -> Result<(), Error<E>>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
{
    if message.is_empty() || message.len() > CEC_MSG_SIZE {
        error!("invalid cec message size {}", message.len());
        return Err(Error::InvalidArgument);
    }
    let address = config.address(RegisterMap::CecDsi);

    bus.write(address, registers::CEC_TX_HEADER, message[0])?;
    if let Some(opcode) = message.get(1) {
        bus.write(address, registers::CEC_TX_OPCODE, *opcode)?;
    }
    for (i, operand) in message.iter().skip(2).enumerate() {
        bus.write(address, registers::CEC_TX_OPERAND + i as u8, *operand)?;
    }
    bus.write(address, registers::CEC_TX_LENGTH, message.len() as u8)?;
    bus.write(address, registers::CEC_TX_ENABLE, registers::CEC_TX_SEND_3_RETRIES)
}

/// Deal with the CEC bits of one interrupt cycle.
///
/// Copies every ready receive buffer into `slots`, calling `on_message` after
/// each one, then clears the receive-ready state in the chip. Bus failures
/// are logged and skipped over.
pub(crate) fn service<I2C, D, E, F>(
    bus: &mut RegisterBus<I2C, D>,
    config: &Config,
    slots: &mut CecSlots,
    status: Interrupt2,
    mut on_message: F,
) -> u8
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
    F: FnMut(usize),
{
    let address = config.address(RegisterMap::CecDsi);

    if status.contains(Interrupt2::CEC_TX_READY) {
        debug!("cec tx ready");
    }
    if status.contains(Interrupt2::CEC_TX_ARB_LOST) {
        debug!("cec tx arbitration lost");
    }
    if status.contains(Interrupt2::CEC_TX_RETRY_TIMEOUT) {
        debug!("cec tx retry timeout");
    }

    let rx_bits = (status & Interrupt2::CEC_RX_GROUP).bits();
    if rx_bits == 0 {
        return 0;
    }

    let rx_control = bus
        .read_byte(address, registers::CEC_RX_CONTROL)
        .unwrap_or(RX_CONTROL_DEFAULT);
    let rx_ready = bus.read_byte(address, registers::CEC_RX_READY).unwrap_or(0);
    let timestamps = bus
        .read_byte(address, registers::CEC_RX_TIMESTAMP)
        .unwrap_or(0);

    let mut received = 0;
    for (index, register) in SLOT_REGISTERS.iter().enumerate() {
        if rx_ready & (1 << index) == 0 {
            continue;
        }
        let mut message = [0u8; CEC_MSG_SIZE];
        if bus.read(address, *register, &mut message).is_err() {
            warn!("cec rx buffer {} lost", index + 1);
            continue;
        }
        debug!("cec rx buffer {} ready", index + 1);
        let timestamp = (timestamps >> (index * 2)) & 0x3;
        slots.store(index, message, timestamp);
        received |= 1 << index;
        on_message(index);
    }

    // Writing the ready bits back clears them, then re-arm the buffers
    if bus.write(address, registers::CEC_RX_CONTROL, rx_control | rx_bits).is_err() {
        warn!("could not clear cec rx ready");
    }
    if bus
        .write(address, registers::CEC_RX_CONTROL, rx_control & !Interrupt2::CEC_RX_GROUP.bits())
        .is_err()
    {
        warn!("could not rearm cec rx buffers");
    }

    received
}


//
// End of file
//
