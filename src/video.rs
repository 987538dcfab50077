//! Video timing programming.

use crate::{registers, sequence::RegisterWrite, Error};

//
// Public Types
//

/// The video mode coming in over DSI.
///
/// All timings are in pixels (horizontal) or lines (vertical). The chip
/// holds 12 bits of each.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct VideoConfig {
    /// Visible pixels per line
    pub h_active: u32,
    /// Horizontal front porch
    pub h_front_porch: u32,
    /// Horizontal sync pulse width
    pub h_pulse_width: u32,
    /// Horizontal back porch
    pub h_back_porch: u32,
    /// Visible lines per frame
    pub v_active: u32,
    /// Vertical front porch
    pub v_front_porch: u32,
    /// Vertical sync pulse width
    pub v_pulse_width: u32,
    /// Vertical back porch
    pub v_back_porch: u32,
    /// Number of DSI data lanes in use (1 to 4)
    pub num_of_input_lanes: u8,
    /// Send HDMI rather than DVI
    pub hdmi_mode: bool,
    /// AVI InfoFrame scan information (0 = no data, 1 = overscan,
    /// 2 = underscan). Only the bottom two bits are used.
    pub scan_info: u8,
}

/// The two picture aspect ratios the chip can signal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AspectRatio {
    /// 4:3
    Standard,
    /// 16:9
    Widescreen,
}

//
// Public Data
//

/// Number of registers written by [`VideoConfig::timing_writes`].
pub const TIMING_WRITES: usize = 16;

/// Largest value any timing register pair can hold.
pub const MAX_TIMING: u32 = 0xFFF;

/// Most DSI data lanes the chip takes.
pub const MAX_LANES: u8 = 4;

//
// impls on Public Types
//

impl VideoConfig {
    /// Total pixels per line, blanking included. Saturates at `u32::MAX`.
    pub fn h_total(&self) -> u32 {
        total(&[
            self.h_active,
            self.h_front_porch,
            self.h_pulse_width,
            self.h_back_porch,
        ])
    }

    /// Total lines per frame, blanking included. Saturates at `u32::MAX`.
    pub fn v_total(&self) -> u32 {
        total(&[
            self.v_active,
            self.v_front_porch,
            self.v_pulse_width,
            self.v_back_porch,
        ])
    }

    /// Check the mode fits the chip: 1 to 4 lanes, and every value that
    /// goes into a timing register no more than [`MAX_TIMING`].
    pub fn validate<E>(&self) -> Result<(), Error<E>> {
        if self.num_of_input_lanes == 0 || self.num_of_input_lanes > MAX_LANES {
            error!("bad dsi lane count {}", self.num_of_input_lanes);
            return Err(Error::InvalidArgument);
        }
        if self.timings().iter().any(|value| *value > MAX_TIMING) {
            error!("video timing out of range");
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }

    /// Anything that isn't exactly 4:3 is treated as 16:9.
    pub fn aspect_ratio(&self) -> AspectRatio {
        let difference = i64::from(self.h_active) * 3 - i64::from(self.v_active) * 4;
        if difference != 0 {
            AspectRatio::Widescreen
        } else {
            AspectRatio::Standard
        }
    }

    /// The DSI timing registers, in register order.
    ///
    /// Only meaningful once [`VideoConfig::validate`] has passed; anything
    /// above 12 bits is cut off.
    pub fn timing_writes(&self) -> [RegisterWrite; TIMING_WRITES] {
        let mut writes = [RegisterWrite::cec_dsi(0, 0); TIMING_WRITES];
        for (i, value) in self.timings().iter().enumerate() {
            let [high, low] = pack_12bit(*value);
            let register = registers::DSI_TIMING_BASE + (i as u8) * 2;
            writes[i * 2] = RegisterWrite::cec_dsi(register, high);
            writes[i * 2 + 1] = RegisterWrite::cec_dsi(register + 1, low);
        }
        writes
    }

    /// Register values in register order.
    fn timings(&self) -> [u32; TIMING_WRITES / 2] {
        [
            self.h_total(),
            self.h_pulse_width,
            self.h_front_porch,
            self.h_back_porch,
            self.v_total(),
            self.v_pulse_width,
            self.v_front_porch,
            self.v_back_porch,
        ]
    }
}

impl AspectRatio {
    /// Values for the aspect/sync register and the AVI aspect register.
    pub fn register_values(self) -> (u8, u8) {
        match self {
            AspectRatio::Widescreen => (0x02, 0x28),
            AspectRatio::Standard => (0x00, 0x18),
        }
    }
}

//
// Private Functions
//

fn total(parts: &[u32]) -> u32 {
    parts.iter().fold(0u32, |acc, part| acc.saturating_add(*part))
}

/// Split a 12-bit value into the chip's two-register form: bits 11:4 in the
/// first register, bits 3:0 in the top nibble of the second.
fn pack_12bit(value: u32) -> [u8; 2] {
    [((value & 0xFF0) >> 4) as u8, ((value & 0xF) << 4) as u8]
}


//
// End of file
//
