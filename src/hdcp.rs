//! HDCP status decoding.
//!
//! The driver never acts on HDCP errors; they are link conditions the sink
//! and transmitter sort out between themselves. They are decoded so they can
//! be logged and handed back in the interrupt report.

use crate::registers::Interrupt2;

//
// Public Types
//

/// Why HDCP authentication failed, from the DDC controller status.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DdcError {
    /// No error
    None,
    /// Receiver BKSV is not valid
    BadBksv,
    /// Ri did not match
    RiMismatch,
    /// Pj did not match
    PjMismatch,
    /// DDC bus error
    I2cError,
    /// Timed out waiting for the downstream repeater
    TimedOut,
    /// Maximum repeater cascade depth exceeded
    MaxCascadeExceeded,
    /// A code the chip documentation does not list
    Unknown(u8),
}

/// What the HDCP bits of one interrupt cycle said.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HdcpStatus {
    /// BKSV is ready to be read
    pub bksv_ready: bool,
    /// Set when the error bit was raised and the DDC status could be read
    pub error: Option<DdcError>,
    /// The error bit was raised
    pub error_flagged: bool,
}

//
// impls on Public Types
//

impl DdcError {
    /// Decode the DDC controller status register. The error code is the
    /// upper nibble.
    pub fn from_ddc_status(status: u8) -> DdcError {
        match status >> 4 {
            0 => DdcError::None,
            1 => DdcError::BadBksv,
            2 => DdcError::RiMismatch,
            3 => DdcError::PjMismatch,
            4 => DdcError::I2cError,
            5 => DdcError::TimedOut,
            6 => DdcError::MaxCascadeExceeded,
            code => DdcError::Unknown(code),
        }
    }
}

impl HdcpStatus {
    /// Look at the HDCP bits of the second interrupt status register. The DDC
    /// status is only filled in later, if [`HdcpStatus::error_flagged`].
    pub fn from_interrupts(status: Interrupt2) -> HdcpStatus {
        HdcpStatus {
            bksv_ready: status.contains(Interrupt2::HDCP_BKSV_FLAG),
            error: None,
            error_flagged: status.contains(Interrupt2::HDCP_ERROR),
        }
    }
}


//
// End of file
//
