use std::io;
use thiserror::Error;

/// The primary error type for the `e3k-lib` library.
#[derive(Error, Debug)]
pub enum E3KError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Transport closed: {0}")]
    TransportClosed(&'static str),

    #[error("Invalid frame length for {active} active channels: expected {expected} bytes, got {actual}")]
    InvalidFrameLength {
        active: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Too many channels: {0} (the device has 6)")]
    TooManyChannels(usize),

    #[error("Invalid channel index {0}")]
    InvalidChannel(usize),

    #[error("Invalid channel list: {0}")]
    InvalidChannelList(String),

    #[error("Unsupported sample rate: {0} Hz")]
    UnsupportedRate(u32),

    #[error("Invalid transport mode: {0}")]
    InvalidTransport(String),

    #[error("Invalid control word: {0}")]
    InvalidControlWord(String),
}
