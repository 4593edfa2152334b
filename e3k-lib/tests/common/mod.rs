//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use bytes::Bytes;
#[allow(unused_imports)]
pub use e3k_lib::channel::{ChannelMask, ChannelTable};
#[allow(unused_imports)]
pub use e3k_lib::control::{ControlWord, DeviceConfig, Link, SampleRate, TransportMode};
#[allow(unused_imports)]
pub use e3k_lib::error::E3KError;
#[allow(unused_imports)]
pub use e3k_lib::frame::{Packer, frame_length, unpack};
#[allow(unused_imports)]
pub use e3k_lib::host::{FrameDecoder, SampleSet, command_bytes};
#[allow(unused_imports)]
pub use e3k_lib::transport::{ByteSink, ByteSource, Disconnected, Duplex};

/// Decode hex string to bytes for testing
#[allow(dead_code)]
pub fn hex_to_bytes(hex_data: &str) -> Bytes {
    Bytes::from(hex::decode(hex_data).expect("Failed to decode hex"))
}

/// Control word enabling all channels at 100 Hz over the wired link
#[allow(dead_code)]
pub const ALL_CHANNELS_WORD: u16 = 0b1_00_01_111111_00000;

/// Samples paired with `ALL_CHANNELS_FRAME`
#[allow(dead_code)]
pub const REFERENCE_SAMPLES: [u16; 6] = [4095, 0, 2048, 1, 4094, 17];

/// Frame the device sends for `REFERENCE_SAMPLES` with every channel active
#[allow(dead_code)]
pub const ALL_CHANNELS_FRAME: &str = "fff000800001ffe011";
