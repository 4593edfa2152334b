// src/error.rs

use std::io;
use thiserror::Error;

/// Errors raised by the emulator's transport tasks.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),
}
