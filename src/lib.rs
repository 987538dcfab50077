//! # ADV7533 Driver
//!
//! This is a driver for the Analog Devices ADV7533 DSI-to-HDMI transmitter.
//!
//! Specifically, this driver sets up the ADV7533 over I²C and services its
//! interrupt line - it does not generate the DSI video stream or the I²S
//! audio stream, and it does not own the GPIOs, clocks or regulators the
//! chip needs.
//!
//! The driver handles:
//!
//! * Power-up and the chip's fixed initialisation sequence
//! * Video timing, aspect ratio and HDMI/DVI mode
//! * Audio input format and channel status
//! * Hot-plug detection and reading the sink's EDID
//! * Turning HDCP on and off, and decoding HDCP errors
//! * Sending and receiving CEC messages
//!
//! The [`Adv7533`] object is shared between your interrupt handler, one
//! worker context that does the slow part of interrupt handling, and any
//! number of callers doing display set-up. All chip state sits behind one
//! lock.
//!
//! The interrupt line is edge-triggered. Call [`Adv7533::on_interrupt`] from
//! the edge handler - it only sets a flag - and then call
//! [`Adv7533::service_interrupt`] from somewhere that is allowed to block.
//!
//! # Example
//!
//! You might set up the bridge like this:
//!
//! ```rust
//! # use embedded_hal::blocking::i2c::{Write, WriteRead};
//! # struct I2c;
//! # impl Write for I2c {
//! #     type Error = ();
//! #     fn write(&mut self, _address: u8, _bytes: &[u8]) -> Result<(), Self::Error> {
//! #         Ok(())
//! #     }
//! # }
//! # impl WriteRead for I2c {
//! #     type Error = ();
//! #     fn write_read(&mut self, _address: u8, _bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error> {
//! #         buffer.fill(0);
//! #         Ok(())
//! #     }
//! # }
//! # struct Delay;
//! # impl embedded_hal::blocking::delay::DelayMs<u32> for Delay {
//! #     fn delay_ms(&mut self, _ms: u32) {}
//! # }
//! # let (i2c, delay) = (I2c, Delay);
//! fn on_event(event: adv7533::Event) {
//!     // Tell the display stack
//! }
//! static ON_EVENT: fn(adv7533::Event) = on_event;
//!
//! let bridge = adv7533::Adv7533::new(i2c, delay, adv7533::Config::default());
//! if let Err(e) = bridge.probe() {
//!     // Chip didn't respond
//! }
//! bridge.register_client("display", &ON_EVENT).unwrap();
//! bridge.power(true).unwrap();
//! bridge.video(&adv7533::VideoConfig {
//!     h_active: 1920,
//!     h_front_porch: 88,
//!     h_pulse_width: 44,
//!     h_back_porch: 148,
//!     v_active: 1080,
//!     v_front_porch: 4,
//!     v_pulse_width: 5,
//!     v_back_porch: 36,
//!     num_of_input_lanes: 4,
//!     hdmi_mode: true,
//!     scan_info: 0,
//! }).unwrap();
//! // The cable may have been plugged in before the interrupt was armed
//! let connected = bridge.check_hot_plug().unwrap();
//!
//! // Later, in the interrupt worker:
//! if let Some(report) = bridge.service_interrupt() {
//!     // Clients have already been told about anything interesting
//! }
//! ```

#![no_std]
#![deny(unsafe_code)]
#![deny(missing_docs)]

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

pub mod audio;
mod bridge;
mod bus;
pub mod cec;
pub mod hdcp;
mod irq;
pub mod registers;
pub mod sequence;
#[cfg(test)]
mod testing;
pub mod video;

pub use audio::AudioConfig;
pub use bridge::{Adv7533, Callback, Event, EDID_SIZE, MAX_CLIENTS};
pub use bus::{MAX_TRIES, RETRY_DELAY_MS};
pub use cec::CecMessage;
pub use irq::{HotPlugState, InterruptReport};
pub use video::VideoConfig;

//
// Public Types
//

/// The ADV7533 answers on two I²C addresses, one per register map.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterMap {
    /// HDMI transmitter, interrupts, EDID and HDCP
    Main,
    /// DSI receiver, timing generator and CEC
    CecDsi,
}

/// How the chip is wired up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    /// 7-bit I²C address of the main register map
    pub main_address: u8,
    /// 7-bit I²C address of the CEC/DSI register map
    pub cec_dsi_address: u8,
    /// Apply a default 48 kHz stereo I²S set-up when the chip is probed
    pub audio: bool,
}

/// The ways in which talking to the ADV7533 can fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error<E> {
    /// An I²C transaction failed, even after retrying
    Bus {
        /// 7-bit I²C address
        address: u8,
        /// Register being accessed
        register: u8,
        /// The value, if this was a write
        value: Option<u8>,
        /// What the I²C driver said on the last attempt
        source: E,
    },
    /// A buffer or message was empty or too large, or a field out of range
    InvalidArgument,
    /// The chip hasn't been probed
    NotAttached,
    /// There is no room for another client
    TooManyClients,
}

//
// Public Data
//

/// The usual address of the main register map.
pub const DEFAULT_MAIN_ADDRESS: u8 = 0x39;

/// The usual address of the CEC/DSI register map.
pub const DEFAULT_CEC_DSI_ADDRESS: u8 = 0x3C;

//
// impls on Public Types
//

impl Default for Config {
    fn default() -> Config {
        Config {
            main_address: DEFAULT_MAIN_ADDRESS,
            cec_dsi_address: DEFAULT_CEC_DSI_ADDRESS,
            audio: false,
        }
    }
}

impl Config {
    /// The I²C address for a register map.
    pub fn address(&self, map: RegisterMap) -> u8 {
        match map {
            RegisterMap::Main => self.main_address,
            RegisterMap::CecDsi => self.cec_dsi_address,
        }
    }
}

//
// End of file
//
