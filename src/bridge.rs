//! The [`Adv7533`] handle and the operations display-stack clients call.

use core::sync::atomic::AtomicBool;

use embedded_hal::blocking::{
    delay::DelayMs,
    i2c::{Write, WriteRead},
};
use spin::{Mutex, MutexGuard};

use crate::{
    audio::AudioConfig,
    bus::RegisterBus,
    cec::{self, CecMessage, CecSlots},
    irq,
    registers::{self, Interrupts},
    sequence::{self, ConfigSequence},
    video::VideoConfig,
    Config, Error, RegisterMap,
};

//
// Public Types
//

/// Something that happened on the HDMI side of the bridge.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// A sink is connected and its EDID has been read
    Connect,
    /// The sink went away, or the transmitter was powered down
    Disconnect,
    /// A CEC message is waiting; see [`Adv7533::cec_receive`]
    CecMessagePending,
}

/// A client's event handler.
///
/// Handlers run with the chip locked, so they must not call back into the
/// [`Adv7533`] they were registered with.
pub type Callback = &'static (dyn Fn(Event) + Sync);

/// Represents one ADV7533 and everything we know about it.
pub struct Adv7533<I2C, D> {
    pub(crate) config: Config,
    /// Set by the interrupt handler, cleared by the worker. At most one
    /// cycle is ever outstanding.
    pub(crate) work_pending: AtomicBool,
    pub(crate) inner: Mutex<Inner<I2C, D>>,
}

//
// Private Types
//

/// Everything the chip lock protects.
pub(crate) struct Inner<I2C, D> {
    pub(crate) bus: RegisterBus<I2C, D>,
    pub(crate) state: ChipState,
}

pub(crate) struct ChipState {
    pub(crate) attached: bool,
    pub(crate) power_on: bool,
    pub(crate) hdcp_enabled: bool,
    pub(crate) cec_enabled: bool,
    pub(crate) edid: [u8; EDID_SIZE],
    pub(crate) cec: CecSlots,
    pub(crate) clients: Clients,
}

#[derive(Copy, Clone)]
struct Client {
    name: &'static str,
    callback: Callback,
}

/// Registered clients, in registration order.
pub(crate) struct Clients([Option<Client>; MAX_CLIENTS]);

//
// Public Data
//

/// Size of the cached EDID: the base block and one extension.
pub const EDID_SIZE: usize = 256;

/// How many clients can subscribe to events.
pub const MAX_CLIENTS: usize = 4;

//
// impls on Public Types
//

impl<I2C, D, E> Adv7533<I2C, D>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
{
    /// Create a new ADV7533 handle.
    ///
    /// Nothing is sent to the chip until you call [`Adv7533::probe`].
    pub fn new(i2c: I2C, delay: D, config: Config) -> Adv7533<I2C, D> {
        Adv7533 {
            config,
            work_pending: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                bus: RegisterBus::new(i2c, delay),
                state: ChipState {
                    attached: false,
                    power_on: false,
                    hdcp_enabled: false,
                    cec_enabled: false,
                    edid: [0; EDID_SIZE],
                    cec: CecSlots::default(),
                    clients: Clients([None; MAX_CLIENTS]),
                },
            }),
        }
    }

    /// Check the chip is there, and get it ready for use.
    ///
    /// Returns the chip revision. If [`Config::audio`] is set, the default
    /// I²S audio set-up is written too.
    pub fn probe(&self) -> Result<u8, Error<E>> {
        let mut inner = self.inner.lock();
        let Inner { bus, state } = &mut *inner;
        let revision = bus.read_byte(self.config.main_address, registers::MAIN_CHIP_REVISION)?;
        info!("adv7533 revision 0x{:02x}", revision);
        if self.config.audio {
            sequence::apply(bus, &self.config, &sequence::I2S_DEFAULT)?;
        }
        state.attached = true;
        Ok(revision)
    }

    /// Stop using the chip, masking all of its interrupts, and get the bus
    /// back.
    pub fn detach(self) -> (I2C, D) {
        let Inner { mut bus, state } = self.inner.into_inner();
        if state.attached && irq::set_enabled(&mut bus, &self.config, Interrupts::all(), false).is_err() {
            warn!("interrupts left enabled at detach");
        }
        bus.release()
    }

    /// Subscribe to [`Event`]s. Clients are told about events in the order
    /// they registered.
    pub fn register_client(&self, name: &'static str, callback: Callback) -> Result<(), Error<E>> {
        let mut inner = self.inner.lock();
        inner.state.clients.add(Client { name, callback })
    }

    /// Power the HDMI transmitter up or down.
    ///
    /// Powering up an already powered chip does nothing. Powering down tells
    /// every client the sink has gone.
    pub fn power(&self, on: bool) -> Result<(), Error<E>> {
        let mut inner = self.lock_attached()?;
        let Inner { bus, state } = &mut *inner;
        if on {
            if state.power_on {
                debug!("already powered on");
                return Ok(());
            }
            sequence::apply(bus, &self.config, &sequence::INIT)?;
            irq::set_enabled(bus, &self.config, Interrupts::HPD, true)?;
            state.power_on = true;
        } else {
            bus.write(self.config.main_address, registers::MAIN_POWER, registers::POWER_DOWN)?;
            state.power_on = false;
            state.clients.notify(Event::Disconnect);
        }
        Ok(())
    }

    /// Whether [`Adv7533::power`] last turned the transmitter on.
    pub fn is_power_on(&self) -> bool {
        self.inner.lock().state.power_on
    }

    /// Program the video mode and start the timing generator.
    ///
    /// A mode that fails [`VideoConfig::validate`] is rejected before the
    /// chip is touched.
    pub fn video(&self, video: &VideoConfig) -> Result<(), Error<E>> {
        video.validate()?;
        let mut inner = self.lock_attached()?;
        let bus = &mut inner.bus;
        let main = self.config.main_address;
        let cec_dsi = self.config.cec_dsi_address;

        bus.write(cec_dsi, registers::DSI_LANES, video.num_of_input_lanes << 4)?;

        debug!(
            "h_total {} v_total {} ({}x{})",
            video.h_total(),
            video.v_total(),
            video.h_active,
            video.v_active
        );
        let timings = video.timing_writes();
        sequence::apply(bus, &self.config, &ConfigSequence::new("video timing", &timings))?;

        if video.hdmi_mode {
            bus.write(main, registers::MAIN_HDCP_HDMI_CONTROL, registers::HDMI_MODE)?;
        }

        if video.scan_info != 0 {
            let scan = bus.read_byte(main, registers::MAIN_AVI_SCAN_INFO)?;
            bus.write(main, registers::MAIN_AVI_SCAN_INFO, scan | (video.scan_info & 0x3))?;
        }

        let (sync, picture) = video.aspect_ratio().register_values();
        bus.write(main, registers::MAIN_ASPECT_SYNC, sync)?;
        bus.write(main, registers::MAIN_AVI_ASPECT, picture)?;

        sequence::apply(bus, &self.config, &sequence::VIDEO_ENABLE)
    }

    /// Turn HDCP, and HDCP frame encryption, on or off.
    ///
    /// HDCP interrupts are tracked while HDCP is on.
    pub fn hdcp(&self, enable: bool, encryption: bool) -> Result<(), Error<E>> {
        let mut inner = self.lock_attached()?;
        let Inner { bus, state } = &mut *inner;
        let main = self.config.main_address;

        let mut control = bus.read_byte(main, registers::MAIN_HDCP_HDMI_CONTROL)?;
        control &= !(registers::HDCP_ENABLE | registers::HDCP_ENCRYPTION);
        if enable {
            control |= registers::HDCP_ENABLE;
        }
        if encryption {
            control |= registers::HDCP_ENCRYPTION;
        }
        bus.write(main, registers::MAIN_HDCP_HDMI_CONTROL, control)?;

        state.hdcp_enabled = enable;
        irq::set_enabled(bus, &self.config, Interrupts::HDCP, enable)
    }

    /// Program the audio input format and channel status.
    pub fn audio(&self, audio: &AudioConfig) -> Result<(), Error<E>> {
        let mut inner = self.lock_attached()?;
        debug!("audio at {} Hz", audio.sample_rate.hz());
        let writes = audio.register_writes();
        sequence::apply(&mut inner.bus, &self.config, &ConfigSequence::new("audio", &writes))
    }

    /// Turn the CEC engine on or off.
    ///
    /// CEC interrupts are tracked while CEC is on.
    pub fn cec_enable(&self, on: bool) -> Result<(), Error<E>> {
        let mut inner = self.lock_attached()?;
        let Inner { bus, state } = &mut *inner;
        if on {
            sequence::apply(bus, &self.config, &sequence::CEC_ENABLE)?;
            sequence::apply(bus, &self.config, &sequence::CEC_TIMING)?;
            sequence::apply(bus, &self.config, &sequence::CEC_POWER)?;
        }
        state.cec_enabled = on;
        irq::set_enabled(bus, &self.config, Interrupts::CEC, on)
    }

    /// Send a CEC frame of 1 to 16 bytes: header, opcode, operands.
    ///
    /// The chip retries three times if the frame isn't acknowledged.
    pub fn cec_send(&self, message: &[u8]) -> Result<(), Error<E>> {
        let mut inner = self.lock_attached()?;
        cec::transmit(&mut inner.bus, &self.config, message)
    }

    /// Collect a received CEC frame, if there is one.
    pub fn cec_receive(&self) -> Result<Option<CecMessage>, Error<E>> {
        let mut inner = self.lock_attached()?;
        let message = inner.state.cec.take();
        if message.is_none() {
            debug!("no pending cec message");
        }
        Ok(message)
    }

    /// Look at the hot-plug pin directly.
    ///
    /// The interrupt is edge-triggered, so a sink connected before the
    /// interrupt was armed never raises one. If a sink is connected this
    /// starts an EDID read, which finishes with an [`Event::Connect`] once the
    /// interrupt worker has run.
    pub fn check_hot_plug(&self) -> Result<bool, Error<E>> {
        let mut inner = self.lock_attached()?;
        let bus = &mut inner.bus;
        let main = self.config.main_address;

        let hpd = bus.read_byte(main, registers::MAIN_HPD_STATE)?;
        let connected = hpd & registers::HPD_STATE_HPD != 0;
        if connected {
            debug!("cable is connected");
            // Clear anything stale before the EDID read raises its own
            let status = bus.read_byte(main, registers::MAIN_INT_STATUS1)?;
            bus.write(main, registers::MAIN_INT_STATUS1, status)?;
            irq::set_enabled(bus, &self.config, Interrupts::HPD | Interrupts::EDID, true)?;
            irq::start_edid_read(bus, &self.config)?;
        }
        Ok(connected)
    }

    /// Size of the EDID cache.
    pub fn edid_size(&self) -> Result<usize, Error<E>> {
        self.lock_attached()?;
        Ok(EDID_SIZE)
    }

    /// Copy the cached EDID into `buffer`, returning how many bytes were
    /// copied. That is the smaller of the buffer length and [`EDID_SIZE`].
    pub fn edid(&self, buffer: &mut [u8]) -> Result<usize, Error<E>> {
        if buffer.is_empty() {
            return Err(Error::InvalidArgument);
        }
        let inner = self.lock_attached()?;
        let size = buffer.len().min(EDID_SIZE);
        buffer[..size].copy_from_slice(&inner.state.edid[..size]);
        Ok(size)
    }

    /// Write any register. Bit 8 of `register` selects the CEC/DSI map.
    pub fn write_register(&self, register: u16, value: u8) -> Result<(), Error<E>> {
        let (address, offset) = self.passthrough_address(register)?;
        let mut inner = self.lock_attached()?;
        inner.bus.write(address, offset, value)
    }

    /// Read any register. Bit 8 of `register` selects the CEC/DSI map.
    pub fn read_register(&self, register: u16) -> Result<u8, Error<E>> {
        let (address, offset) = self.passthrough_address(register)?;
        let mut inner = self.lock_attached()?;
        inner.bus.read_byte(address, offset)
    }

    /// Take the chip lock, failing if the chip hasn't been probed.
    fn lock_attached(&self) -> Result<MutexGuard<'_, Inner<I2C, D>>, Error<E>> {
        let inner = self.inner.lock();
        if !inner.state.attached {
            error!("adv7533 not probed");
            return Err(Error::NotAttached);
        }
        Ok(inner)
    }

    fn passthrough_address(&self, register: u16) -> Result<(u8, u8), Error<E>> {
        if register > (registers::PASSTHROUGH_CEC_DSI | 0xFF) {
            return Err(Error::InvalidArgument);
        }
        let map = if register & registers::PASSTHROUGH_CEC_DSI != 0 {
            RegisterMap::CecDsi
        } else {
            RegisterMap::Main
        };
        Ok((self.config.address(map), (register & 0xFF) as u8))
    }
}

//
// impls on Private Types
//

impl ChipState {
    /// The interrupts that should be live given which features are on.
    pub(crate) fn interrupt_features(&self) -> Interrupts {
        let mut interrupts = Interrupts::HPD | Interrupts::EDID;
        interrupts.set(Interrupts::HDCP, self.hdcp_enabled);
        interrupts.set(Interrupts::CEC, self.cec_enabled);
        interrupts
    }
}

impl Clients {
    fn add<E>(&mut self, client: Client) -> Result<(), Error<E>> {
        let slot = self
            .0
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(Error::TooManyClients)?;
        debug!("registered client {}", client.name);
        *slot = Some(client);
        Ok(())
    }

    /// Tell every client, oldest first.
    pub(crate) fn notify(&self, event: Event) {
        for client in self.0.iter().flatten() {
            debug!("notifying {} of {}", client.name, event);
            (client.callback)(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleRate;
    use crate::testing::{FakeChip, FakeDelay, FakeI2c, Fault};
    use std::boxed::Box;
    use std::sync::Mutex as StdMutex;
    use std::vec::Vec;

    const MAIN: u8 = 0x39;
    const CEC: u8 = 0x3C;

    type Bridge = Adv7533<FakeI2c, FakeDelay>;

    fn attached() -> (FakeChip, Bridge) {
        let chip = FakeChip::new();
        chip.set(MAIN, 0x00, 0x14);
        let (i2c, delay) = chip.bus();
        let bridge = Adv7533::new(i2c, delay, Config::default());
        assert_eq!(bridge.probe(), Ok(0x14));
        chip.clear_log();
        (chip, bridge)
    }

    fn recorder(bridge: &Bridge) -> &'static StdMutex<Vec<Event>> {
        let events: &'static StdMutex<Vec<Event>> = Box::leak(Box::new(StdMutex::new(Vec::new())));
        let callback: Callback = Box::leak(Box::new(move |event: Event| events.lock().unwrap().push(event)));
        bridge.register_client("test", callback).unwrap();
        events
    }

    #[test]
    fn operations_need_probe() {
        let chip = FakeChip::new();
        let (i2c, delay) = chip.bus();
        let bridge = Adv7533::new(i2c, delay, Config::default());
        assert_eq!(bridge.power(true), Err(Error::NotAttached));
        assert_eq!(bridge.cec_receive(), Err(Error::NotAttached));
        assert_eq!(bridge.edid_size(), Err(Error::NotAttached));
        assert_eq!(chip.transactions(), 0);
    }

    #[test]
    fn probe_applies_default_audio() {
        let chip = FakeChip::new();
        let (i2c, delay) = chip.bus();
        let config = Config {
            audio: true,
            ..Config::default()
        };
        let bridge = Adv7533::new(i2c, delay, config);
        bridge.probe().unwrap();
        assert_eq!(chip.writes().len(), sequence::I2S_DEFAULT.writes.len());
        assert_eq!(chip.get(MAIN, 0x73), 0x01);
    }

    #[test]
    fn power_on_is_idempotent() {
        let (chip, bridge) = attached();
        bridge.power(true).unwrap();
        let first = chip.writes().len();
        assert_eq!(chip.writes_to(MAIN, 0x94), [0xC0]);

        bridge.power(true).unwrap();
        assert_eq!(chip.writes().len(), first);
        assert!(bridge.is_power_on());
        // The init sequence's one write to 0xD6 happened once
        assert_eq!(chip.writes_to(MAIN, 0xD6), [0x48]);
    }

    #[test]
    fn power_off_notifies_disconnect() {
        let (chip, bridge) = attached();
        let events = recorder(&bridge);
        bridge.power(true).unwrap();
        bridge.power(false).unwrap();
        assert_eq!(chip.writes_to(MAIN, 0x41).last(), Some(&0x50));
        assert_eq!(*events.lock().unwrap(), [Event::Disconnect]);
        assert!(!bridge.is_power_on());
    }

    #[test]
    fn power_on_fails_fast() {
        let (chip, bridge) = attached();
        chip.inject(Fault::Register(MAIN, 0xD6));
        assert!(matches!(
            bridge.power(true),
            Err(Error::Bus { register: 0xD6, .. })
        ));
        assert!(!bridge.is_power_on());
        assert_eq!(chip.writes().len(), 1);
    }

    #[test]
    fn video_1080p() {
        let (chip, bridge) = attached();
        bridge
            .video(&VideoConfig {
                h_active: 1920,
                h_front_porch: 88,
                h_pulse_width: 44,
                h_back_porch: 148,
                v_active: 1080,
                v_front_porch: 4,
                v_pulse_width: 5,
                v_back_porch: 36,
                num_of_input_lanes: 4,
                hdmi_mode: true,
                scan_info: 2,
            })
            .unwrap();

        let writes = chip.writes();
        assert_eq!(writes[0], (CEC, 0x1C, 0x40));
        assert_eq!(writes[1], (CEC, 0x28, 0x89));
        assert_eq!(writes[2], (CEC, 0x29, 0x80));
        assert_eq!(chip.writes_to(MAIN, 0xAF), [0x06]);
        assert_eq!(chip.get(MAIN, 0x55), 0x02);
        assert_eq!(chip.writes_to(MAIN, 0x17), [0x02]);
        assert_eq!(chip.writes_to(MAIN, 0x56), [0x28]);
        // Video enable comes last
        let tail = &writes[writes.len() - sequence::VIDEO_ENABLE.writes.len()..];
        assert_eq!(tail[0], (CEC, 0x27, 0xCB));
        assert_eq!(tail[tail.len() - 1], (MAIN, 0x40, 0x80));
    }

    #[test]
    fn video_rejects_bad_lane_count() {
        let (chip, bridge) = attached();
        let video = VideoConfig {
            num_of_input_lanes: 5,
            ..Default::default()
        };
        assert_eq!(bridge.video(&video), Err(Error::InvalidArgument));
        assert_eq!(chip.transactions(), 0);
    }

    #[test]
    fn video_rejects_oversized_timings() {
        let (chip, bridge) = attached();
        let uhd = VideoConfig {
            h_active: 3840,
            h_front_porch: 176,
            h_pulse_width: 88,
            h_back_porch: 296,
            v_active: 2160,
            v_front_porch: 8,
            v_pulse_width: 10,
            v_back_porch: 72,
            num_of_input_lanes: 4,
            hdmi_mode: true,
            scan_info: 0,
        };
        assert_eq!(bridge.video(&uhd), Err(Error::InvalidArgument));
        let overflowing = VideoConfig {
            h_active: u32::MAX,
            h_front_porch: 1,
            ..uhd
        };
        assert_eq!(bridge.video(&overflowing), Err(Error::InvalidArgument));
        assert_eq!(chip.transactions(), 0);
    }

    #[test]
    fn hdcp_read_modify_write() {
        let (chip, bridge) = attached();
        chip.set(MAIN, 0xAF, 0x06);
        bridge.hdcp(true, true).unwrap();
        assert_eq!(chip.get(MAIN, 0xAF), 0x96);
        assert_eq!(chip.get(MAIN, 0x94), 0x02);
        assert_eq!(chip.get(MAIN, 0x95), 0xC0);

        bridge.hdcp(false, false).unwrap();
        assert_eq!(chip.get(MAIN, 0xAF), 0x06);
        assert_eq!(chip.get(MAIN, 0x94), 0x00);
        assert_eq!(chip.get(MAIN, 0x95), 0x00);
    }

    #[test]
    fn audio_writes_fifteen_registers() {
        let (chip, bridge) = attached();
        bridge
            .audio(&AudioConfig {
                sample_rate: SampleRate::Hz96000,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(chip.writes().len(), 15);
        assert_eq!(chip.get(MAIN, 0x15), 0xA0);
    }

    #[test]
    fn cec_enable_and_disable() {
        let (chip, bridge) = attached();
        bridge.cec_enable(true).unwrap();
        assert_eq!(chip.get(CEC, 0xBB), 0x10);
        assert_eq!(chip.get(MAIN, 0x95), 0x3F);
        bridge.cec_enable(false).unwrap();
        assert_eq!(chip.get(MAIN, 0x95), 0x00);
    }

    #[test]
    fn cec_send_and_empty_receive() {
        let (chip, bridge) = attached();
        bridge.cec_send(&[0x4F, 0x36]).unwrap();
        assert_eq!(chip.get(CEC, 0x80), 2);
        assert_eq!(chip.get(CEC, 0x81), 0x07);
        assert_eq!(bridge.cec_send(&[0; 17]), Err(Error::InvalidArgument));
        assert_eq!(bridge.cec_receive(), Ok(None));
    }

    #[test]
    fn hot_plug_poll_starts_edid_read() {
        let (chip, bridge) = attached();
        chip.set(MAIN, 0x42, 0x60);
        chip.set(MAIN, 0x96, 0x84);
        assert_eq!(bridge.check_hot_plug(), Ok(true));
        assert_eq!(chip.writes_to(MAIN, 0x96), [0x84]);
        assert_eq!(chip.get(MAIN, 0x94), 0xC4);
        assert_eq!(chip.writes_to(MAIN, 0x41), [0x10]);
        assert_eq!(chip.writes_to(MAIN, 0xC9), [0x13]);
    }

    #[test]
    fn hot_plug_poll_when_unplugged() {
        let (chip, bridge) = attached();
        assert_eq!(bridge.check_hot_plug(), Ok(false));
        assert!(chip.writes().is_empty());
    }

    #[test]
    fn edid_copy_is_truncated() {
        let (_chip, bridge) = attached();
        bridge.inner.lock().state.edid[0] = 0x00;
        bridge.inner.lock().state.edid[1] = 0xFF;
        let mut small = [0xAAu8; 8];
        assert_eq!(bridge.edid(&mut small), Ok(8));
        assert_eq!(small[1], 0xFF);
        let mut large = [0u8; 300];
        assert_eq!(bridge.edid(&mut large), Ok(EDID_SIZE));
        assert_eq!(bridge.edid(&mut []), Err(Error::InvalidArgument));
    }

    #[test]
    fn register_passthrough() {
        let (chip, bridge) = attached();
        bridge.write_register(0x1BE, 0x61).unwrap();
        bridge.write_register(0x041, 0x10).unwrap();
        assert_eq!(chip.writes(), [(CEC, 0xBE, 0x61), (MAIN, 0x41, 0x10)]);
        chip.set(CEC, 0x03, 0x89);
        assert_eq!(bridge.read_register(0x103), Ok(0x89));
        assert_eq!(bridge.read_register(0x200), Err(Error::InvalidArgument));
    }

    #[test]
    fn client_table_fills_up() {
        let (_chip, bridge) = attached();
        for _ in 0..MAX_CLIENTS {
            recorder(&bridge);
        }
        static NOTHING: fn(Event) = |_| {};
        assert_eq!(
            bridge.register_client("one too many", &NOTHING),
            Err(Error::TooManyClients)
        );
    }

    #[test]
    fn detach_masks_interrupts() {
        let (chip, bridge) = attached();
        bridge.power(true).unwrap();
        bridge.cec_enable(true).unwrap();
        let _ = bridge.detach();
        assert_eq!(chip.get(MAIN, 0x94), 0x00);
        assert_eq!(chip.get(MAIN, 0x95), 0x00);
    }
}

//
// End of file
//
