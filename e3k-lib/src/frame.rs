//! 12-bit sample packing.
//!
//! Two 12-bit samples fill exactly three bytes, so active channels are packed
//! in pairs:
//!
//! ```text
//!  sample a = AAAA_AAAA_aaaa      sample b = BBBB_bbbb_bbbb
//!
//!  byte 0    byte 1    byte 2
//!  AAAAAAAA  aaaaBBBB  bbbbbbbb
//! ```
//!
//! A frame with an odd number of active channels ends on a byte whose low
//! nibble is zero. Frames carry no header: the receiver has to know which
//! channels are active.

use crate::constants::{CHANNEL_COUNT, MAX_FRAME_LEN, SAMPLE_MASK};
use crate::error::E3KError;
use bytes::Bytes;
use std::fmt;
use tracing::trace;

/// Number of bytes a frame with `active` channels occupies, `ceil(12 * active / 8)`.
pub const fn frame_length(active: usize) -> usize {
    (3 * active + 1) / 2
}

/// One tick's worth of packed samples.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EncodedFrame {
    bytes: [u8; MAX_FRAME_LEN],
    len: usize,
    samples: usize,
}

impl EncodedFrame {
    pub const EMPTY: EncodedFrame = EncodedFrame {
        bytes: [0; MAX_FRAME_LEN],
        len: 0,
        samples: 0,
    };

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of samples packed into the frame
    pub fn sample_count(&self) -> usize {
        self.samples
    }
}

impl AsRef<[u8]> for EncodedFrame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<EncodedFrame> for Bytes {
    fn from(frame: EncodedFrame) -> Self {
        Bytes::copy_from_slice(frame.as_bytes())
    }
}

impl fmt::Debug for EncodedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedFrame")
            .field("samples", &self.samples)
            .field("bytes", &format_args!("{:02x?}", self.as_bytes()))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Next sample starts on a byte boundary
    A,
    /// Next sample starts in the low nibble of a half-filled byte
    B,
}

/// Packs active channel samples into frames.
#[derive(Debug, Clone)]
pub struct Packer {
    buffer: [u8; MAX_FRAME_LEN],
    cursor: usize,
    phase: Phase,
    samples: usize,
}

impl Default for Packer {
    fn default() -> Self {
        Self::new()
    }
}

impl Packer {
    pub fn new() -> Self {
        Self {
            buffer: [0; MAX_FRAME_LEN],
            cursor: 0,
            phase: Phase::A,
            samples: 0,
        }
    }

    fn reset(&mut self) {
        self.buffer.fill(0);
        self.cursor = 0;
        self.phase = Phase::A;
        self.samples = 0;
    }

    /// Bytes touched so far, counting a half-filled byte.
    fn written(&self) -> usize {
        match self.phase {
            Phase::A => self.cursor,
            Phase::B => self.cursor + 1,
        }
    }

    fn push(&mut self, sample: u16) {
        let sample = sample & SAMPLE_MASK;
        match self.phase {
            Phase::A => {
                self.buffer[self.cursor] = (sample >> 4) as u8;
                self.cursor += 1;
                self.buffer[self.cursor] |= ((sample & 0x0F) << 4) as u8;
                self.phase = Phase::B;
            }
            Phase::B => {
                self.buffer[self.cursor] |= ((sample >> 8) & 0x0F) as u8;
                self.cursor += 1;
                self.buffer[self.cursor] = (sample & 0xFF) as u8;
                self.cursor += 1;
                self.phase = Phase::A;
            }
        }
        self.samples += 1;
    }

    /// Pack `samples` in order. At most six samples are taken.
    pub fn pack<I>(&mut self, samples: I) -> EncodedFrame
    where
        I: IntoIterator<Item = u16>,
    {
        self.reset();
        for sample in samples.into_iter().take(CHANNEL_COUNT) {
            self.push(sample);
        }

        let len = self.written();
        debug_assert_eq!(len, frame_length(self.samples));

        let frame = EncodedFrame {
            bytes: self.buffer,
            len,
            samples: self.samples,
        };
        trace!(samples = frame.samples, len, "Packed frame");
        frame
    }
}

/// Unpack a frame produced for `active` channels back into 12-bit samples.
pub fn unpack(bytes: &[u8], active: usize) -> Result<Vec<u16>, E3KError> {
    if active > CHANNEL_COUNT {
        return Err(E3KError::TooManyChannels(active));
    }
    let expected = frame_length(active);
    if bytes.len() != expected {
        return Err(E3KError::InvalidFrameLength {
            active,
            expected,
            actual: bytes.len(),
        });
    }

    let mut samples = Vec::with_capacity(active);
    for chunk in bytes.chunks(3) {
        let high = u16::from(chunk[0]);
        let mid = u16::from(chunk[1]);
        samples.push(high << 4 | mid >> 4);
        if let Some(&low) = chunk.get(2) {
            samples.push((mid & 0x0F) << 8 | u16::from(low));
        }
    }
    Ok(samples)
}
