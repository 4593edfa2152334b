//! Host side of the link: building commands and reading frames back.

use crate::channel::ChannelMask;
use crate::constants::{CHANNEL_COUNT, COMMAND_TERMINATOR};
use crate::control::DeviceConfig;
use crate::frame::{frame_length, unpack};
use bytes::{Buf, Bytes, BytesMut};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Command text for `word`: its decimal digits and a terminator.
pub fn command_bytes(word: u16) -> Bytes {
    let mut command = word.to_string().into_bytes();
    command.push(COMMAND_TERMINATOR);
    Bytes::from(command)
}

/// Command that stops streaming.
pub fn stop_command() -> Bytes {
    command_bytes(0)
}

/// Samples of one tick, placed back at their channel positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SampleSet {
    pub channels: [Option<u16>; CHANNEL_COUNT],
}

impl SampleSet {
    pub fn get(&self, channel: usize) -> Option<u16> {
        self.channels.get(channel).copied().flatten()
    }

    /// Convert a sample to volts for an ADC referenced to `vref`.
    pub fn volts(&self, channel: usize, vref: f64) -> Option<f64> {
        self.get(channel)
            .map(|raw| f64::from(raw) * vref / f64::from(crate::constants::SAMPLE_MAX))
    }
}

impl fmt::Display for SampleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, value) in self.channels.iter().enumerate() {
            if index > 0 {
                write!(f, " ")?;
            }
            match value {
                Some(value) => write!(f, "{:4}", value)?,
                None => write!(f, "   -")?,
            }
        }
        Ok(())
    }
}

/// Splits a received byte stream into frames and unpacks them.
///
/// Frames carry no delimiter, so the decoder must be told which channels the
/// device has active. Feed it bytes as they arrive and drain sample sets.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    channels: ChannelMask,
    buffer: BytesMut,
}

impl FrameDecoder {
    pub fn new(channels: ChannelMask) -> Self {
        Self {
            channels,
            buffer: BytesMut::new(),
        }
    }

    pub fn for_config(config: &DeviceConfig) -> Self {
        Self::new(config.channels)
    }

    pub fn channels(&self) -> ChannelMask {
        self.channels
    }

    pub fn frame_length(&self) -> usize {
        frame_length(self.channels.count())
    }

    /// Bytes buffered but not yet part of a complete frame
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Next complete frame, if enough bytes have arrived. Always `None` with
    /// no channels active, since such frames are empty.
    pub fn next_samples(&mut self) -> Option<SampleSet> {
        self.next_frame().map(|(_, set)| set)
    }

    /// Like `next_samples`, also handing back the raw frame bytes.
    pub fn next_frame(&mut self) -> Option<(Bytes, SampleSet)> {
        let len = self.frame_length();
        if len == 0 || self.buffer.len() < len {
            return None;
        }
        let frame = self.buffer.split_to(len).freeze();
        let values = unpack(&frame, self.channels.count()).ok()?;

        let mut set = SampleSet::default();
        for (channel, value) in self.channels.active_channels().zip(values) {
            set.channels[channel] = Some(value);
        }
        Some((frame, set))
    }

    /// Drop buffered bytes, e.g. after the channel selection changed.
    pub fn reset(&mut self, channels: ChannelMask) {
        self.channels = channels;
        self.buffer.advance(self.buffer.len());
    }
}

impl Iterator for FrameDecoder {
    type Item = SampleSet;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_samples()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_decimal_with_terminator() {
        assert_eq!(command_bytes(33760).as_ref(), b"33760\n");
        assert_eq!(stop_command().as_ref(), b"0\n");
    }

    #[test]
    fn decoder_waits_for_whole_frame() {
        let mut decoder = FrameDecoder::new(ChannelMask::from_bits(0b10_0100));
        decoder.push(&[0xAB, 0xCD]);
        assert_eq!(decoder.next_samples(), None);
        decoder.push(&[0xEF, 0x12]);

        let set = decoder.next_samples().unwrap();
        assert_eq!(set.get(0), Some(0xABC));
        assert_eq!(set.get(3), Some(0xDEF));
        assert_eq!(set.get(1), None);
        assert_eq!(decoder.pending(), 1);
    }

    #[test]
    fn no_channels_yields_nothing() {
        let mut decoder = FrameDecoder::new(ChannelMask::NONE);
        decoder.push(&[1, 2, 3]);
        assert_eq!(decoder.next(), None);
    }

    #[test]
    fn next_frame_returns_raw_bytes() {
        let mut decoder = FrameDecoder::new(ChannelMask::from_bits(0b00_0001));
        decoder.push(&[0x12, 0x30, 0x45]);
        let (raw, set) = decoder.next_frame().unwrap();
        assert_eq!(raw.as_ref(), &[0x12, 0x30]);
        assert_eq!(set.get(5), Some(0x123));
        assert_eq!(decoder.pending(), 1);
    }

    #[test]
    fn reset_drops_partial_frame_and_switches_mask() {
        let mut decoder = FrameDecoder::new(ChannelMask::ALL);
        decoder.push(&[0xFF, 0xF0, 0x00]);
        assert_eq!(decoder.next_samples(), None);

        decoder.reset(ChannelMask::from_bits(0b10_0000));
        assert_eq!(decoder.channels(), ChannelMask::from_bits(0b10_0000));
        assert_eq!(decoder.pending(), 0);
        assert_eq!(decoder.frame_length(), 2);

        decoder.push(&[0x80, 0x00]);
        assert_eq!(decoder.next_samples().unwrap().get(0), Some(0x800));
    }

    #[test]
    fn volts_scale_to_reference() {
        let set = SampleSet {
            channels: [Some(4095), Some(0), None, None, None, None],
        };
        assert!((set.volts(0, 3.3).unwrap() - 3.3).abs() < 1e-9);
        assert_eq!(set.volts(1, 3.3), Some(0.0));
        assert_eq!(set.volts(2, 3.3), None);
    }
}
