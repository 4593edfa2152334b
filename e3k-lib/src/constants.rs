// Protocol constants for the E3K

/// Number of analog input channels
pub const CHANNEL_COUNT: usize = 6;

/// Mask selecting the 12 sample bits
pub const SAMPLE_MASK: u16 = 0x0FFF;

/// Largest sample the ADC can report
pub const SAMPLE_MAX: u16 = SAMPLE_MASK;

/// Size of a frame with all six channels active (9 bytes)
pub const MAX_FRAME_LEN: usize = 9;

/// Frame size per active channel count, as tabulated by the device firmware.
/// `frame::frame_length` computes the same values.
pub const FRAME_LENGTH_TABLE: [usize; CHANNEL_COUNT + 1] = [0, 2, 3, 5, 6, 8, 9];

/// All six channels active
pub const ALL_CHANNELS_MASK: u8 = 0b11_1111;

/// Byte appended after the decimal digits of a control word by the host
pub const COMMAND_TERMINATOR: u8 = b'\n';
