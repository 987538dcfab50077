//! Audio input and channel-status configuration.

use crate::sequence::RegisterWrite;

//
// Public Types
//

/// IEC 60958 copyright bit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Copyright {
    /// Content is copyright protected
    #[default]
    Protected,
    /// Content is not copyright protected
    NotProtected,
}

/// Pre-emphasis applied to the source audio.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PreEmphasis {
    /// No pre-emphasis
    #[default]
    None,
    /// 50/15 µs pre-emphasis
    Us50_15,
}

/// Sampling clock accuracy, as reported in channel status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockAccuracy {
    /// Level II, normal accuracy
    #[default]
    Level2,
    /// Level I, high accuracy
    Level1,
    /// Level III, variable pitch shifted
    Level3,
}

/// Audio sampling rate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleRate {
    /// 32 kHz
    Hz32000,
    /// 44.1 kHz
    Hz44100,
    /// 48 kHz
    #[default]
    Hz48000,
    /// 88.2 kHz
    Hz88200,
    /// 96 kHz
    Hz96000,
    /// 176.4 kHz
    Hz176400,
    /// 192 kHz
    Hz192000,
}

/// Whether the chip follows the incoming audio automatically.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioMode {
    /// Chip measures CTS itself
    #[default]
    Automatic,
    /// CTS is taken from [`AudioConfig::cts`]
    Manual,
}

/// The digital audio input in use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioInterface {
    /// I²S
    #[default]
    I2s,
    /// S/PDIF
    Spdif,
}

/// Order of 16-bit words within an incoming I²S sample.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WordEndianness {
    /// Most significant word first
    #[default]
    Big,
    /// Least significant word first
    Little,
}

/// Everything needed to program the chip's audio path.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct AudioConfig {
    /// Channel status copyright bit
    pub copyright: Copyright,
    /// Channel status pre-emphasis
    pub pre_emphasis: PreEmphasis,
    /// Channel status clock accuracy
    pub clock_accuracy: ClockAccuracy,
    /// Channel status category code
    pub channel_status_category_code: u8,
    /// Channel status word length (4 bits)
    pub channel_status_word_length: u8,
    /// Channel status source number (4 bits)
    pub channel_status_source_number: u8,
    /// Take channel status from the registers rather than the stream
    pub channel_status_override: bool,
    /// Channel status validity bit for compressed audio
    pub channel_status_v_bit: bool,
    /// Sampling rate
    pub sample_rate: SampleRate,
    /// Automatic or manual CTS
    pub mode: AudioMode,
    /// I²S or S/PDIF input
    pub interface: AudioInterface,
    /// I²S format (2 bits): standard, right justified, left justified, AES3
    pub i2s_format: u8,
    /// Word order of incoming I²S data
    pub word_endianness: WordEndianness,
    /// Audio clock regeneration N (20 bits)
    pub n: u32,
    /// Audio clock regeneration CTS (20 bits)
    pub cts: u32,
    /// Channel count field of the audio InfoFrame (2 bits)
    pub channels: u8,
    /// Speaker channel allocation of the audio InfoFrame
    pub channel_allocation: u8,
}

//
// Public Data
//

/// Number of registers written by [`AudioConfig::register_writes`].
pub const AUDIO_WRITES: usize = 15;

//
// impls on Public Types
//

impl SampleRate {
    /// The chip's 4-bit code for this rate.
    pub fn code(self) -> u8 {
        match self {
            SampleRate::Hz44100 => 0x0,
            SampleRate::Hz48000 => 0x2,
            SampleRate::Hz32000 => 0x3,
            SampleRate::Hz88200 => 0x8,
            SampleRate::Hz96000 => 0xA,
            SampleRate::Hz176400 => 0xC,
            SampleRate::Hz192000 => 0xE,
        }
    }

    /// Turn a 4-bit chip code back into a rate.
    pub fn from_code(code: u8) -> Option<SampleRate> {
        match code & 0xF {
            0x0 => Some(SampleRate::Hz44100),
            0x2 => Some(SampleRate::Hz48000),
            0x3 => Some(SampleRate::Hz32000),
            0x8 => Some(SampleRate::Hz88200),
            0xA => Some(SampleRate::Hz96000),
            0xC => Some(SampleRate::Hz176400),
            0xE => Some(SampleRate::Hz192000),
            _ => None,
        }
    }

    /// The rate in Hz.
    pub fn hz(self) -> u32 {
        match self {
            SampleRate::Hz32000 => 32_000,
            SampleRate::Hz44100 => 44_100,
            SampleRate::Hz48000 => 48_000,
            SampleRate::Hz88200 => 88_200,
            SampleRate::Hz96000 => 96_000,
            SampleRate::Hz176400 => 176_400,
            SampleRate::Hz192000 => 192_000,
        }
    }
}

impl AudioConfig {
    /// The audio registers, in the order the chip wants them written.
    pub fn register_writes(&self) -> [RegisterWrite; AUDIO_WRITES] {
        // Channel status: copyright, pre-emphasis, clock accuracy
        let mut status = 0u8;
        if self.copyright == Copyright::NotProtected {
            status |= 1 << 5;
        }
        if self.pre_emphasis == PreEmphasis::Us50_15 {
            status |= 1 << 2;
        }
        match self.clock_accuracy {
            ClockAccuracy::Level1 => status |= 1 << 0,
            ClockAccuracy::Level3 => status |= 1 << 1,
            ClockAccuracy::Level2 => {}
        }

        let word_length_source =
            (self.channel_status_word_length & 0xF) | ((self.channel_status_source_number & 0xF) << 4);

        let mut input = 0u8;
        if self.mode == AudioMode::Manual {
            input |= 1 << 7;
        }
        if self.interface == AudioInterface::Spdif {
            input |= 1 << 4;
        }

        let mut i2s = self.i2s_format & 0x3;
        if self.interface == AudioInterface::I2s {
            // I2S enable, sampling frequency from register
            i2s |= (1 << 2) | (1 << 7);
        }
        if self.channel_status_override {
            i2s |= 1 << 6;
        }

        // 24-bit samples
        let mut word = 0x18u8;
        if self.word_endianness == WordEndianness::Little {
            word |= 1 << 7;
        }
        if self.channel_status_v_bit {
            word |= 1 << 5;
        }

        let [n_low, n_mid, n_high] = split_20bit(self.n);
        let [cts_low, cts_mid, cts_high] = split_20bit(self.cts);

        [
            RegisterWrite::main(0x12, status),
            RegisterWrite::main(0x13, self.channel_status_category_code),
            RegisterWrite::main(0x14, word_length_source),
            RegisterWrite::main(0x15, self.sample_rate.code() << 4),
            RegisterWrite::main(0x0A, input),
            RegisterWrite::main(0x0C, i2s),
            RegisterWrite::main(0x0D, word),
            RegisterWrite::main(0x03, n_low),
            RegisterWrite::main(0x02, n_mid),
            RegisterWrite::main(0x01, n_high),
            RegisterWrite::main(0x09, cts_low),
            RegisterWrite::main(0x08, cts_mid),
            RegisterWrite::main(0x07, cts_high),
            RegisterWrite::main(0x73, self.channels & 0x3),
            RegisterWrite::main(0x76, self.channel_allocation),
        ]
    }
}

//
// Private Functions
//

/// Bits 7:0, 15:8 and 19:16 of an ACR value.
fn split_20bit(value: u32) -> [u8; 3] {
    [
        (value & 0xFF) as u8,
        ((value & 0xFF00) >> 8) as u8,
        ((value & 0xF_0000) >> 16) as u8,
    ]
}


//
// End of file
//
