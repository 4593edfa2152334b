pub mod channel;
pub mod constants;
pub mod control;
pub mod device;
pub mod error;
pub mod frame;
pub mod host;
pub mod input;
pub mod transport;


// Re-export the E3K struct and the wire types for easy access
pub use channel::{ChannelMask, ChannelTable};
pub use control::{ControlWord, DeviceConfig, Link, SampleRate, TransportMode, parse_word};
pub use device::{Acquisition, E3K, TickReport};
pub use error::E3KError;
pub use frame::{EncodedFrame, Packer, frame_length, unpack};
pub use host::{FrameDecoder, SampleSet};
