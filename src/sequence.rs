//! Fixed register sequences, and applying them.
//!
//! A [`ConfigSequence`] is an ordered list of register writes that together
//! perform one configuration step. The tables here are straight from the
//! ADV7533 programming guide.

use embedded_hal::blocking::{
    delay::DelayMs,
    i2c::{Write, WriteRead},
};

use crate::{bus::RegisterBus, Config, Error, RegisterMap};

//
// Public Types
//

/// One register write: which map, which register, what value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterWrite {
    /// Which of the two register maps
    pub map: RegisterMap,
    /// Register offset within the map
    pub register: u8,
    /// Value to write
    pub value: u8,
}

/// A named, ordered list of register writes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConfigSequence<'a> {
    /// Used when logging
    pub name: &'static str,
    /// Written first to last
    pub writes: &'a [RegisterWrite],
}

//
// Public Data
//

/// Brings the transmitter out of power-down with the fixed settings the chip
/// needs for normal operation.
pub const INIT: ConfigSequence<'static> = ConfigSequence::new(
    "init",
    &[
        // HDMI normal
        RegisterWrite::main(0x41, 0x10),
        // HPD overridden
        RegisterWrite::main(0xD6, 0x48),
        // HDMI enabled
        RegisterWrite::cec_dsi(0x03, 0x89),
        RegisterWrite::main(0x16, 0x20),
        RegisterWrite::main(0x9A, 0xE0),
        // HDCP
        RegisterWrite::main(0xBA, 0x70),
        RegisterWrite::main(0xDE, 0x82),
        // V1P2
        RegisterWrite::main(0xE4, 0x40),
        RegisterWrite::main(0xE5, 0x80),
        RegisterWrite::cec_dsi(0x15, 0xD0),
        RegisterWrite::cec_dsi(0x17, 0xD0),
        RegisterWrite::cec_dsi(0x24, 0x20),
        RegisterWrite::cec_dsi(0x57, 0x11),
        // Reset internal timing generator
        RegisterWrite::main(0xAF, 0x16),
        // HDMI mode select
        RegisterWrite::cec_dsi(0x78, 0x03),
    ],
);

/// Starts the timing generator and turns on the HDMI output. Written after
/// the video timings have been programmed.
pub const VIDEO_ENABLE: ConfigSequence<'static> = ConfigSequence::new(
    "video enable",
    &[
        // Timing generator enable, toggled
        RegisterWrite::cec_dsi(0x27, 0xCB),
        RegisterWrite::cec_dsi(0x27, 0x8B),
        RegisterWrite::cec_dsi(0x27, 0xCB),
        // Power up
        RegisterWrite::main(0x41, 0x10),
        // HDMI enable
        RegisterWrite::cec_dsi(0x03, 0x89),
        // Colour depth
        RegisterWrite::main(0x4C, 0x04),
        // Down dither
        RegisterWrite::main(0x49, 0x02),
        // Audio and CEC clock gate
        RegisterWrite::cec_dsi(0x05, 0xC8),
        // GC packet enable
        RegisterWrite::main(0x40, 0x80),
    ],
);

/// Ungates the CEC clock.
pub const CEC_ENABLE: ConfigSequence<'static> = ConfigSequence::new(
    "cec enable",
    &[
        RegisterWrite::cec_dsi(0x05, 0xC8),
        RegisterWrite::cec_dsi(0xBE, 0x01),
    ],
);

/// CEC bit timings for a 19.2 MHz reference, divider 25.
pub const CEC_TIMING: ConfigSequence<'static> = ConfigSequence::new(
    "cec timing",
    &[
        RegisterWrite::cec_dsi(0xBE, 0x61),
        RegisterWrite::cec_dsi(0xC1, 0x0D),
        RegisterWrite::cec_dsi(0xC2, 0x80),
        RegisterWrite::cec_dsi(0xC3, 0x0C),
        RegisterWrite::cec_dsi(0xC4, 0x9A),
        RegisterWrite::cec_dsi(0xC5, 0x0E),
        RegisterWrite::cec_dsi(0xC6, 0x66),
        RegisterWrite::cec_dsi(0xC7, 0x0B),
        RegisterWrite::cec_dsi(0xC8, 0x1A),
        RegisterWrite::cec_dsi(0xC9, 0x0A),
        RegisterWrite::cec_dsi(0xCA, 0x33),
        RegisterWrite::cec_dsi(0xCB, 0x0C),
        RegisterWrite::cec_dsi(0xCC, 0x00),
        RegisterWrite::cec_dsi(0xCD, 0x07),
        RegisterWrite::cec_dsi(0xCE, 0x33),
        RegisterWrite::cec_dsi(0xCF, 0x05),
        RegisterWrite::cec_dsi(0xD0, 0xDA),
        RegisterWrite::cec_dsi(0xD1, 0x08),
        RegisterWrite::cec_dsi(0xD2, 0x8D),
        RegisterWrite::cec_dsi(0xD3, 0x01),
        RegisterWrite::cec_dsi(0xD4, 0xCD),
        RegisterWrite::cec_dsi(0xD5, 0x04),
        RegisterWrite::cec_dsi(0xD6, 0x80),
        RegisterWrite::cec_dsi(0xD7, 0x05),
        RegisterWrite::cec_dsi(0xD8, 0x66),
        RegisterWrite::cec_dsi(0xD9, 0x03),
        RegisterWrite::cec_dsi(0xDA, 0x26),
        RegisterWrite::cec_dsi(0xDB, 0x0A),
        RegisterWrite::cec_dsi(0xDC, 0xCD),
        RegisterWrite::cec_dsi(0xDE, 0x00),
        RegisterWrite::cec_dsi(0xDF, 0xC0),
        RegisterWrite::cec_dsi(0xE1, 0x00),
        RegisterWrite::cec_dsi(0xE2, 0xE6),
        RegisterWrite::cec_dsi(0xE3, 0x02),
        RegisterWrite::cec_dsi(0xE4, 0xB3),
        RegisterWrite::cec_dsi(0xE5, 0x03),
        RegisterWrite::cec_dsi(0xE6, 0x9A),
    ],
);

/// Powers up the CEC engine, selects logical address 4 and arms all three
/// receive buffers.
pub const CEC_POWER: ConfigSequence<'static> = ConfigSequence::new(
    "cec power",
    &[
        RegisterWrite::main(0xE2, 0x00),
        // HPD override
        RegisterWrite::main(0xD6, 0x48),
        // EDID re-read
        RegisterWrite::main(0xC9, 0x13),
        // Use all three receive buffers
        RegisterWrite::cec_dsi(0xBA, 0x08),
        // Logical address 0 = 4
        RegisterWrite::cec_dsi(0xBC, 0x04),
        // Select logical address 0
        RegisterWrite::cec_dsi(0xBB, 0x10),
    ],
);

/// 16-bit, 48 kHz, two channel I²S. Applied at attach time when
/// [`Config::audio`] is set.
pub const I2S_DEFAULT: ConfigSequence<'static> = ConfigSequence::new(
    "i2s default",
    &[
        // 16-bit I2S
        RegisterWrite::main(0x0D, 0x18),
        // 48 kHz
        RegisterWrite::main(0x15, 0x20),
        // N = 6144
        RegisterWrite::main(0x02, 0x18),
        // Word length 16 bits
        RegisterWrite::main(0x14, 0x02),
        // Two channels
        RegisterWrite::main(0x73, 0x01),
    ],
);

//
// impls on Public Types
//

impl RegisterWrite {
    /// A write to the main register map.
    pub const fn main(register: u8, value: u8) -> RegisterWrite {
        RegisterWrite {
            map: RegisterMap::Main,
            register,
            value,
        }
    }

    /// A write to the CEC/DSI register map.
    pub const fn cec_dsi(register: u8, value: u8) -> RegisterWrite {
        RegisterWrite {
            map: RegisterMap::CecDsi,
            register,
            value,
        }
    }
}

impl<'a> ConfigSequence<'a> {
    /// Name a list of writes.
    pub const fn new(name: &'static str, writes: &'a [RegisterWrite]) -> ConfigSequence<'a> {
        ConfigSequence { name, writes }
    }
}

//
// Private Functions
//

/// Write every register in `sequence`, in order.
///
/// Stops at the first write that fails. Nothing is undone: the registers
/// already written stay written.
pub(crate) fn apply<I2C, D, E>(
    bus: &mut RegisterBus<I2C, D>,
    config: &Config,
    sequence: &ConfigSequence<'_>,
) -> Result<(), Error<E>>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
{
    debug!("applying {} ({} writes)", sequence.name, sequence.writes.len());
    for (index, write) in sequence.writes.iter().enumerate() {
        let address = config.address(write.map);
        if let Err(e) = bus.write(address, write.register, write.value) {
            error!(
                "{} stopped at step {}: 0x{:02x} to reg 0x{:02x}",
                sequence.name,
                index,
                write.value,
                write.register
            );
            return Err(e);
        }
    }
    Ok(())
}


//
// End of file
//
