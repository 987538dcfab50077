//! Interrupt handling.
//!
//! Handling an interrupt takes two steps:
//!
//! 1. [`Adv7533::on_interrupt`] runs on the falling edge of the interrupt
//!    line. It only marks a cycle as pending, so it never blocks.
//! 2. [`Adv7533::service_interrupt`] runs the cycle somewhere that may
//!    sleep. It masks the chip's interrupts, works out what happened, tells
//!    clients, clears the status registers and unmasks again.
//!
//! A cycle always finishes by unmasking, even if the bus is failing part
//! way through, so the line can't get stuck.

use core::sync::atomic::Ordering;

use embedded_hal::blocking::{
    delay::DelayMs,
    i2c::{Write, WriteRead},
};

use crate::{
    bridge::{Adv7533, Event, Inner, EDID_SIZE},
    bus::RegisterBus,
    cec,
    hdcp::{DdcError, HdcpStatus},
    registers::{self, Interrupt1, Interrupt2, Interrupts},
    Config, Error,
};

//
// Public Types
//

/// The hot-plug pin and receiver-sense state, as of one interrupt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HotPlugState {
    /// HPD high and the sink's TMDS termination is present
    Connected,
    /// Neither HPD nor termination
    Disconnected,
    /// One but not the other
    Intermediate,
}

/// What one interrupt cycle found and did.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptReport {
    /// Set if a hot-plug interrupt was seen and the state could be read
    pub hot_plug: Option<HotPlugState>,
    /// A fresh EDID was read into the cache
    pub edid_cached: bool,
    /// Set if HDCP is being tracked
    pub hdcp: Option<HdcpStatus>,
    /// CEC receive buffers copied out of the chip, bit N for buffer N + 1
    pub cec_received: u8,
    /// An EDID read was kicked off because a sink connected
    pub edid_read_started: bool,
}

//
// impls on Public Types
//

impl HotPlugState {
    /// Decode the hot-plug state register.
    pub fn from_register(value: u8) -> HotPlugState {
        let hpd = value & registers::HPD_STATE_HPD != 0;
        let sense = value & registers::HPD_STATE_MONITOR_SENSE != 0;
        match (hpd, sense) {
            (true, true) => HotPlugState::Connected,
            (false, false) => HotPlugState::Disconnected,
            _ => HotPlugState::Intermediate,
        }
    }
}

impl<I2C, D, E> Adv7533<I2C, D>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
{
    /// Call this from the interrupt line's falling-edge handler.
    ///
    /// Doesn't touch the bus or the chip lock. Returns `false` if a cycle
    /// was already pending, in which case this edge is covered by it.
    pub fn on_interrupt(&self) -> bool {
        !self.work_pending.swap(true, Ordering::AcqRel)
    }

    /// Whether [`Adv7533::on_interrupt`] has queued a cycle that hasn't run.
    pub fn interrupt_pending(&self) -> bool {
        self.work_pending.load(Ordering::Acquire)
    }

    /// Run the pending interrupt cycle, if there is one.
    ///
    /// Call this from a context that can block: bus retries sleep. Clients
    /// are notified from inside this call.
    pub fn service_interrupt(&self) -> Option<InterruptReport> {
        if !self.work_pending.swap(false, Ordering::AcqRel) {
            return None;
        }
        let mut inner = self.inner.lock();
        if !inner.state.attached {
            warn!("interrupt before probe");
            return None;
        }
        Some(run_cycle(&self.config, &mut *inner))
    }
}

//
// Private Functions
//

/// One full interrupt cycle: mask, decode, notify, clear, unmask.
fn run_cycle<I2C, D, E>(config: &Config, inner: &mut Inner<I2C, D>) -> InterruptReport
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
{
    let Inner { bus, state } = inner;
    let main = config.main_address;
    let mut report = InterruptReport::default();

    if set_enabled(bus, config, state.interrupt_features(), false).is_err() {
        warn!("could not mask interrupts");
    }

    let status1 = bus.read_byte(main, registers::MAIN_INT_STATUS1).ok();
    let status2 = bus.read_byte(main, registers::MAIN_INT_STATUS2).ok();
    let first = Interrupt1::from_bits_retain(status1.unwrap_or(0));
    let second = Interrupt2::from_bits_retain(status2.unwrap_or(0));
    debug!("interrupt status 0x{:02x} 0x{:02x}", first.bits(), second.bits());

    let mut connected = false;
    if first.intersects(Interrupt1::HPD_GROUP) {
        match bus.read_byte(main, registers::MAIN_HPD_STATE) {
            Ok(value) => {
                let hot_plug = HotPlugState::from_register(value);
                debug!("hot plug {}", hot_plug);
                match hot_plug {
                    HotPlugState::Connected => connected = true,
                    HotPlugState::Disconnected => state.clients.notify(Event::Disconnect),
                    HotPlugState::Intermediate => {}
                }
                report.hot_plug = Some(hot_plug);
            }
            Err(_) => warn!("hot plug state unreadable"),
        }
    }

    if first.contains(Interrupt1::EDID_READY) {
        let mut edid = [0u8; EDID_SIZE];
        match read_edid(bus, config, &mut edid) {
            Ok(()) => {
                state.edid = edid;
                report.edid_cached = true;
                // Only now is there an EDID for clients to read
                state.clients.notify(Event::Connect);
            }
            Err(_) => error!("edid read failed"),
        }
    }

    if state.hdcp_enabled {
        report.hdcp = Some(service_hdcp(bus, config, second));
    }

    if state.cec_enabled {
        let clients = &state.clients;
        report.cec_received = cec::service(bus, config, &mut state.cec, second, |_| {
            clients.notify(Event::CecMessagePending)
        });
    }

    // Writing the latched bits back clears them. If the status couldn't be
    // read, clear everything.
    if bus.write(main, registers::MAIN_INT_STATUS1, status1.unwrap_or(0xFF)).is_err() {
        warn!("could not clear interrupt status 1");
    }
    if bus.write(main, registers::MAIN_INT_STATUS2, status2.unwrap_or(0xFF)).is_err() {
        warn!("could not clear interrupt status 2");
    }

    if set_enabled(bus, config, state.interrupt_features(), true).is_err() {
        error!("could not unmask interrupts");
    }

    if connected {
        match start_edid_read(bus, config) {
            Ok(()) => report.edid_read_started = true,
            Err(_) => error!("could not start edid read"),
        }
    }

    report
}

/// Decode the HDCP bits, fetching the DDC status if there was an error.
fn service_hdcp<I2C, D, E>(bus: &mut RegisterBus<I2C, D>, config: &Config, status: Interrupt2) -> HdcpStatus
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
{
    let mut hdcp = HdcpStatus::from_interrupts(status);
    if hdcp.bksv_ready {
        debug!("hdcp bksv ready");
    }
    if hdcp.error_flagged {
        match bus.read_byte(config.main_address, registers::MAIN_DDC_STATUS) {
            Ok(ddc) => {
                let error = DdcError::from_ddc_status(ddc);
                if error == DdcError::None {
                    debug!("hdcp error, ddc reports none");
                } else {
                    error!("hdcp error: {}", error);
                }
                hdcp.error = Some(error);
            }
            Err(_) => warn!("hdcp error, ddc status unreadable"),
        }
    }
    hdcp
}

/// Read both halves of the EDID from wherever the chip says it is.
fn read_edid<I2C, D, E>(
    bus: &mut RegisterBus<I2C, D>,
    config: &Config,
    edid: &mut [u8; EDID_SIZE],
) -> Result<(), Error<E>>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
{
    // The chip holds an 8-bit address
    let pointer = bus.read_byte(config.main_address, registers::MAIN_EDID_ADDRESS)?;
    let address = pointer >> 1;
    debug!("edid at 0x{:02x}", address);
    let half = EDID_SIZE / 2;
    let (low, high) = edid.split_at_mut(half);
    bus.read(address, 0x00, low)?;
    bus.read(address, half as u8, high)
}

/// Have the chip fetch the sink's EDID. It raises EDID-ready when done.
pub(crate) fn start_edid_read<I2C, D, E>(bus: &mut RegisterBus<I2C, D>, config: &Config) -> Result<(), Error<E>>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
{
    bus.write(config.main_address, registers::MAIN_POWER, registers::POWER_UP)?;
    bus.write(config.main_address, registers::MAIN_EDID_CONTROL, registers::EDID_REREAD)
}

/// Turn the interrupt-enable bits for `features` on or off.
///
/// Each enable register is only written if it changes. Both registers are
/// attempted; the first failure is returned.
pub(crate) fn set_enabled<I2C, D, E>(
    bus: &mut RegisterBus<I2C, D>,
    config: &Config,
    features: Interrupts,
    enable: bool,
) -> Result<(), Error<E>>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
{
    let (first, second) = features.enable_bits();
    let result1 = update_enable(bus, config, registers::MAIN_INT_ENABLE1, first.bits(), enable);
    let result2 = update_enable(bus, config, registers::MAIN_INT_ENABLE2, second.bits(), enable);
    result1.and(result2)
}

fn update_enable<I2C, D, E>(
    bus: &mut RegisterBus<I2C, D>,
    config: &Config,
    register: u8,
    bits: u8,
    enable: bool,
) -> Result<(), Error<E>>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
{
    let current = bus.read_byte(config.main_address, register)?;
    let wanted = if enable { current | bits } else { current & !bits };
    if wanted != current {
        debug!("interrupt enable 0x{:02x}: 0x{:02x}", register, wanted);
        bus.write(config.main_address, register, wanted)?;
    }
    Ok(())
}


//
// End of file
//
