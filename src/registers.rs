//! ADV7533 register map.
//!
//! The chip answers on two I²C addresses. The *main* map holds the HDMI
//! transmitter, interrupt and EDID/HDCP controls; the *CEC/DSI* map holds the
//! DSI receiver, timing generator and CEC engine.

use bitflags::bitflags;

//
// Main map
//

/// Chip revision (read-only)
pub const MAIN_CHIP_REVISION: u8 = 0x00;
/// Power-down / HDMI normal operation
pub const MAIN_POWER: u8 = 0x41;
/// Hot-plug / monitor-sense state
pub const MAIN_HPD_STATE: u8 = 0x42;
/// Pointer holding the (8-bit) bus address of the EDID memory
pub const MAIN_EDID_ADDRESS: u8 = 0x43;
/// AVI InfoFrame scan information
pub const MAIN_AVI_SCAN_INFO: u8 = 0x55;
/// Interrupt enable, HPD/EDID/HDCP-authenticated
pub const MAIN_INT_ENABLE1: u8 = 0x94;
/// Interrupt enable, HDCP-error/CEC
pub const MAIN_INT_ENABLE2: u8 = 0x95;
/// Interrupt status, HPD/EDID/HDCP-authenticated
pub const MAIN_INT_STATUS1: u8 = 0x96;
/// Interrupt status, HDCP-error/CEC
pub const MAIN_INT_STATUS2: u8 = 0x97;
/// HDMI/DVI mode and HDCP control
pub const MAIN_HDCP_HDMI_CONTROL: u8 = 0xAF;
/// DDC controller status, upper nibble is the HDCP error code
pub const MAIN_DDC_STATUS: u8 = 0xC8;
/// EDID re-read control
pub const MAIN_EDID_CONTROL: u8 = 0xC9;
/// Aspect ratio / sync polarity
pub const MAIN_ASPECT_SYNC: u8 = 0x17;
/// AVI InfoFrame picture aspect
pub const MAIN_AVI_ASPECT: u8 = 0x56;

/// Value for [`MAIN_POWER`]: HDMI normal operation
pub const POWER_UP: u8 = 0x10;
/// Value for [`MAIN_POWER`]: power down the transmitter
pub const POWER_DOWN: u8 = 0x50;
/// Value for [`MAIN_EDID_CONTROL`]: start an EDID fetch
pub const EDID_REREAD: u8 = 0x13;
/// Value for [`MAIN_HDCP_HDMI_CONTROL`]: HDMI (rather than DVI) mode
pub const HDMI_MODE: u8 = 0x06;
/// Bit in [`MAIN_HPD_STATE`]: HPD pin is high
pub const HPD_STATE_HPD: u8 = 1 << 6;
/// Bit in [`MAIN_HPD_STATE`]: receiver sense (TMDS clock termination seen)
pub const HPD_STATE_MONITOR_SENSE: u8 = 1 << 5;
/// Bit in [`MAIN_HDCP_HDMI_CONTROL`]: HDCP enable
pub const HDCP_ENABLE: u8 = 1 << 7;
/// Bit in [`MAIN_HDCP_HDMI_CONTROL`]: frame encryption enable
pub const HDCP_ENCRYPTION: u8 = 1 << 4;

//
// CEC/DSI map
//

/// DSI lane count, in the upper nibble
pub const DSI_LANES: u8 = 0x1C;
/// First of sixteen timing registers: h_total, hsync, hfp, hbp, v_total,
/// vsync, vfp, vbp, each a 12-bit value over two registers
pub const DSI_TIMING_BASE: u8 = 0x28;
/// CEC transmit frame header
pub const CEC_TX_HEADER: u8 = 0x70;
/// CEC transmit opcode
pub const CEC_TX_OPCODE: u8 = 0x71;
/// First CEC transmit operand
pub const CEC_TX_OPERAND: u8 = 0x72;
/// CEC transmit frame length
pub const CEC_TX_LENGTH: u8 = 0x80;
/// CEC transmit enable and retry count
pub const CEC_TX_ENABLE: u8 = 0x81;
/// Value for [`CEC_TX_ENABLE`]: send, retry three times on NACK
pub const CEC_TX_SEND_3_RETRIES: u8 = 0x07;
/// Receive buffer 1
pub const CEC_RX_BUF1: u8 = 0x85;
/// Receive timestamps, two bits per buffer
pub const CEC_RX_TIMESTAMP: u8 = 0x96;
/// Receive buffer 2
pub const CEC_RX_BUF2: u8 = 0x97;
/// Receive buffer 3
pub const CEC_RX_BUF3: u8 = 0xA8;
/// Receive buffers ready, one bit per buffer
pub const CEC_RX_READY: u8 = 0xB9;
/// Receive buffer clear / enable
pub const CEC_RX_CONTROL: u8 = 0xBA;

/// Bit in a pass-through register index that selects the CEC/DSI map
pub const PASSTHROUGH_CEC_DSI: u16 = 0x100;

//
// Bit sets
//

bitflags! {
    /// Bits of [`MAIN_INT_ENABLE1`] and [`MAIN_INT_STATUS1`].
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Interrupt1: u8 {
        /// Hot-plug detect changed
        const HPD = 1 << 7;
        /// Monitor sense changed
        const MONITOR_SENSE = 1 << 6;
        /// Active VSYNC edge
        const ACTIVE_VSYNC_EDGE = 1 << 5;
        /// Audio FIFO full
        const AUDIO_FIFO_FULL = 1 << 4;
        /// EDID ready to read
        const EDID_READY = 1 << 2;
        /// HDCP authenticated
        const HDCP_AUTHENTICATED = 1 << 1;
        /// HDCP Ri ready
        const HDCP_RI_READY = 1 << 0;

        /// Everything belonging to hot-plug handling
        const HPD_GROUP = Self::HPD.bits() | Self::MONITOR_SENSE.bits();
    }
}

bitflags! {
    /// Bits of [`MAIN_INT_ENABLE2`] and [`MAIN_INT_STATUS2`].
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Interrupt2: u8 {
        /// HDCP error
        const HDCP_ERROR = 1 << 7;
        /// BKSV ready for read
        const HDCP_BKSV_FLAG = 1 << 6;
        /// CEC transmit complete
        const CEC_TX_READY = 1 << 5;
        /// CEC transmit lost arbitration
        const CEC_TX_ARB_LOST = 1 << 4;
        /// CEC transmit gave up after retrying
        const CEC_TX_RETRY_TIMEOUT = 1 << 3;
        /// CEC receive buffer 3 ready
        const CEC_RX_BUF3_READY = 1 << 2;
        /// CEC receive buffer 2 ready
        const CEC_RX_BUF2_READY = 1 << 1;
        /// CEC receive buffer 1 ready
        const CEC_RX_BUF1_READY = 1 << 0;

        /// HDCP bits of this register
        const HDCP_GROUP = Self::HDCP_ERROR.bits() | Self::HDCP_BKSV_FLAG.bits();
        /// Receive-ready bits of this register
        const CEC_RX_GROUP = Self::CEC_RX_BUF1_READY.bits()
            | Self::CEC_RX_BUF2_READY.bits()
            | Self::CEC_RX_BUF3_READY.bits();
        /// All CEC bits of this register
        const CEC_GROUP = Self::CEC_TX_READY.bits()
            | Self::CEC_TX_ARB_LOST.bits()
            | Self::CEC_TX_RETRY_TIMEOUT.bits()
            | Self::CEC_RX_GROUP.bits();
    }
}

bitflags! {
    /// Interrupt sources, grouped by driver feature.
    ///
    /// One feature may span both interrupt-enable registers; see
    /// [`Interrupts::enable_bits`].
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Interrupts: u8 {
        /// Hot-plug and monitor sense
        const HPD = 1 << 0;
        /// EDID ready
        const EDID = 1 << 1;
        /// HDCP authenticated, BKSV and error
        const HDCP = 1 << 2;
        /// CEC transmit and receive
        const CEC = 1 << 3;
    }
}

impl Interrupts {
    /// The bits these features occupy in [`MAIN_INT_ENABLE1`] and
    /// [`MAIN_INT_ENABLE2`] respectively.
    pub fn enable_bits(self) -> (Interrupt1, Interrupt2) {
        let mut first = Interrupt1::empty();
        let mut second = Interrupt2::empty();
        if self.contains(Interrupts::HPD) {
            first |= Interrupt1::HPD_GROUP;
        }
        if self.contains(Interrupts::EDID) {
            first |= Interrupt1::EDID_READY;
        }
        if self.contains(Interrupts::HDCP) {
            first |= Interrupt1::HDCP_AUTHENTICATED;
            second |= Interrupt2::HDCP_GROUP;
        }
        if self.contains(Interrupts::CEC) {
            second |= Interrupt2::CEC_GROUP;
        }
        (first, second)
    }
}


//
// End of file
//
