//! # Control word
//!
//! The host configures the E3K with a single 16-bit word:
//!
//! | bits  | field            | meaning                                           |
//! |-------|------------------|---------------------------------------------------|
//! | 15    | `run_state`      | 1 = stream samples, 0 = stop                      |
//! | 14-13 | `transport_mode` | 0 = wired, 1 = wireless, 2 = reserved, 3 = wired  |
//! | 12-11 | `rate_code`      | 0 = 10 Hz, 1 = 100 Hz, 2 = 500 Hz, 3 = 1000 Hz    |
//! | 10-5  | `channel_mask`   | bit (10 - i) activates channel i                  |
//! | 4-0   | unused           |                                                   |
//!
//! Every word decodes to a valid configuration; nothing is rejected.

use crate::channel::{ChannelMask, ChannelTable};
use crate::error::E3KError;
use modular_bitfield::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use strum_macros::Display;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bit layout of the control word. Fields are listed from the least
/// significant bit up.
#[bitfield(bytes = 2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlWord {
    #[skip]
    unused: B5,
    pub channel_mask: B6,
    pub rate_code: B2,
    pub transport_mode: B2,
    pub run_state: bool,
}

impl From<u16> for ControlWord {
    fn from(word: u16) -> Self {
        ControlWord::from_bytes(word.to_le_bytes())
    }
}

impl From<ControlWord> for u16 {
    fn from(word: ControlWord) -> Self {
        u16::from_le_bytes(word.into_bytes())
    }
}

/// Parse a control word written as decimal, `0x` hex or `0b` binary.
/// Underscores are allowed as digit separators.
pub fn parse_word(s: &str) -> Result<u16, E3KError> {
    let cleaned: String = s.trim().chars().filter(|c| *c != '_').collect();
    let parsed = if let Some(hex) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)
    } else if let Some(bin) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        u16::from_str_radix(bin, 2)
    } else {
        cleaned.parse::<u16>()
    };
    parsed.map_err(|e| E3KError::InvalidControlWord(format!("{:?}: {}", s, e)))
}

/// Transport selected by the control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum TransportMode {
    Wired = 0,
    Wireless = 1,
    /// Set aside for a network link the firmware never implemented
    Reserved = 2,

    #[num_enum(catch_all)]
    Unknown(u8),
}

/// The physical link a frame actually leaves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Link {
    #[strum(to_string = "wired")]
    Wired,
    #[strum(to_string = "wireless")]
    Wireless,
}

impl TransportMode {
    /// Resolve the mode to a link. Anything other than wireless goes out
    /// over the wired link.
    pub fn link(self) -> Link {
        match self {
            TransportMode::Wireless => Link::Wireless,
            TransportMode::Wired => Link::Wired,
            TransportMode::Reserved | TransportMode::Unknown(_) => Link::Wired,
        }
    }

    /// True when the mode is not one the device implements directly.
    pub fn is_fallback(self) -> bool {
        !matches!(self, TransportMode::Wired | TransportMode::Wireless)
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Wired => write!(f, "wired"),
            TransportMode::Wireless => write!(f, "wireless"),
            TransportMode::Reserved => write!(f, "reserved"),
            TransportMode::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}

impl FromStr for TransportMode {
    type Err = E3KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wired" | "serial" | "uart" => Ok(TransportMode::Wired),
            "wireless" | "bluetooth" | "bt" => Ok(TransportMode::Wireless),
            "reserved" | "wifi" => Ok(TransportMode::Reserved),
            other => other
                .parse::<u8>()
                .ok()
                .filter(|code| *code <= 3)
                .map(TransportMode::from_primitive)
                .ok_or_else(|| E3KError::InvalidTransport(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum SampleRate {
    #[strum(to_string = "10 Hz")]
    Hz10 = 0,
    #[strum(to_string = "100 Hz")]
    Hz100 = 1,
    #[strum(to_string = "500 Hz")]
    Hz500 = 2,
    #[strum(to_string = "1 kHz")]
    Hz1000 = 3,
}

impl SampleRate {
    /// Map a two-bit rate code. Only the low two bits are looked at, so
    /// every input has a rate.
    pub fn from_code(code: u8) -> Self {
        match code & 0b11 {
            0 => SampleRate::Hz10,
            1 => SampleRate::Hz100,
            2 => SampleRate::Hz500,
            _ => SampleRate::Hz1000,
        }
    }

    pub fn code(self) -> u8 {
        self.into()
    }

    /// Get the sample rate in samples per second
    pub fn as_hz(&self) -> u32 {
        match self {
            SampleRate::Hz10 => 10,
            SampleRate::Hz100 => 100,
            SampleRate::Hz500 => 500,
            SampleRate::Hz1000 => 1000,
        }
    }

    pub fn from_hz(hz: u32) -> Result<Self, E3KError> {
        match hz {
            10 => Ok(SampleRate::Hz10),
            100 => Ok(SampleRate::Hz100),
            500 => Ok(SampleRate::Hz500),
            1000 => Ok(SampleRate::Hz1000),
            other => Err(E3KError::UnsupportedRate(other)),
        }
    }

    /// Time between two sampling ticks
    pub fn period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.as_hz()))
    }
}

/// The decoded form of a control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceConfig {
    pub run_state: bool,
    pub transport: TransportMode,
    pub rate: SampleRate,
    pub channels: ChannelMask,
}

impl Default for DeviceConfig {
    /// Power-on state: stopped, wired, 100 Hz, no channels.
    fn default() -> Self {
        Self {
            run_state: false,
            transport: TransportMode::Wired,
            rate: SampleRate::Hz100,
            channels: ChannelMask::NONE,
        }
    }
}

impl From<ControlWord> for DeviceConfig {
    fn from(word: ControlWord) -> Self {
        Self {
            run_state: word.run_state(),
            transport: TransportMode::from_primitive(word.transport_mode()),
            rate: SampleRate::from_code(word.rate_code()),
            channels: ChannelMask::from_bits(word.channel_mask()),
        }
    }
}

impl From<DeviceConfig> for ControlWord {
    fn from(config: DeviceConfig) -> Self {
        let transport: u8 = config.transport.into();
        ControlWord::new()
            .with_run_state(config.run_state)
            .with_transport_mode(transport & 0b11)
            .with_rate_code(config.rate.code())
            .with_channel_mask(config.channels.bits())
    }
}

impl DeviceConfig {
    pub fn decode(word: u16) -> Self {
        ControlWord::from(word).into()
    }

    pub fn encode(&self) -> u16 {
        ControlWord::from(*self).into()
    }

    /// Decode `word` and apply its channel selection to `channels`.
    pub fn apply(word: u16, channels: &mut ChannelTable) -> Self {
        let config = Self::decode(word);
        channels.apply_mask(config.channels);
        debug!(
            word,
            run = config.run_state,
            transport = %config.transport,
            rate = %config.rate,
            channels = %config.channels,
            "Applied control word"
        );
        config
    }

    /// Link the frames of this configuration go out on
    pub fn link(&self) -> Link {
        self.transport.link()
    }
}

impl fmt::Display for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "State: {}, Transport: {}, Rate: {}, Channels: {}",
            if self.run_state { "running" } else { "stopped" },
            self.transport,
            self.rate,
            self.channels
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_positions_match_word_layout() {
        let word = ControlWord::from(0b1_01_10_101010_11111);
        assert!(word.run_state());
        assert_eq!(word.transport_mode(), 0b01);
        assert_eq!(word.rate_code(), 0b10);
        assert_eq!(word.channel_mask(), 0b101010);
    }

    #[test]
    fn parse_word_accepts_common_notations() {
        assert_eq!(parse_word("33760").unwrap(), 33760);
        assert_eq!(parse_word("0x83E0").unwrap(), 0x83E0);
        assert_eq!(parse_word("0b1_00_00_011111_00000").unwrap(), 0x83E0);
        assert!(matches!(parse_word("70000"), Err(E3KError::InvalidControlWord(_))));
        assert!(parse_word("0xZZ").is_err());
    }

    #[test]
    fn unused_bits_are_ignored() {
        assert_eq!(DeviceConfig::decode(0x001F), DeviceConfig::decode(0x0000));
    }

    #[test]
    fn rate_codes_map_to_hz() {
        let rates: Vec<u32> = (0..4u8).map(|code| SampleRate::from_code(code).as_hz()).collect();
        assert_eq!(rates, vec![10, 100, 500, 1000]);
        assert_eq!(SampleRate::Hz500.period(), Duration::from_millis(2));
        assert!(matches!(SampleRate::from_hz(250), Err(E3KError::UnsupportedRate(250))));
        assert!(SampleRate::try_from(4u8).is_err());
        assert_eq!(SampleRate::from_code(7), SampleRate::Hz1000);
    }

    #[test]
    fn transport_fallback() {
        assert_eq!(TransportMode::from_primitive(2).link(), Link::Wired);
        assert_eq!(TransportMode::from_primitive(3), TransportMode::Unknown(3));
        assert_eq!(TransportMode::from_primitive(3).link(), Link::Wired);
        assert!(TransportMode::Reserved.is_fallback());
        assert!(!TransportMode::Wireless.is_fallback());
        assert_eq!("bluetooth".parse::<TransportMode>().unwrap(), TransportMode::Wireless);
        assert!("ethernet".parse::<TransportMode>().is_err());
    }

    #[test]
    fn encode_inverts_decode() {
        let config = DeviceConfig {
            run_state: true,
            transport: TransportMode::Wireless,
            rate: SampleRate::Hz1000,
            channels: ChannelMask::ALL,
        };
        let word = config.encode();
        assert_eq!(word, 0b1_01_11_111111_00000);
        assert_eq!(DeviceConfig::decode(word), config);
    }
}
