use crate::control::{DeviceConfig, Link};
use crate::error::E3KError;
use crate::frame::EncodedFrame;
use bytes::{Buf, BytesMut};
use std::collections::VecDeque;
use std::io::Write;
use tracing::{debug, trace};

/// Outgoing half of a transport.
pub trait ByteSink {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), E3KError>;
}

/// Incoming half of a transport. Never blocks: `None` means nothing is
/// available right now.
pub trait ByteSource {
    fn read_byte(&mut self) -> Option<u8>;
}

impl ByteSink for Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), E3KError> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl ByteSink for BytesMut {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), E3KError> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl ByteSource for VecDeque<u8> {
    fn read_byte(&mut self) -> Option<u8> {
        self.pop_front()
    }
}

impl ByteSource for BytesMut {
    fn read_byte(&mut self) -> Option<u8> {
        self.has_remaining().then(|| self.get_u8())
    }
}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), E3KError> {
        (**self).write_bytes(bytes)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    fn read_byte(&mut self) -> Option<u8> {
        (**self).read_byte()
    }
}

/// Adapts any `std::io::Write` into a sink. Each frame is flushed.
#[derive(Debug)]
pub struct IoSink<W>(pub W);

impl<W: Write> ByteSink for IoSink<W> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), E3KError> {
        self.0.write_all(bytes)?;
        self.0.flush()?;
        Ok(())
    }
}

/// A transport with nothing attached: reads nothing, discards writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disconnected;

impl ByteSink for Disconnected {
    fn write_bytes(&mut self, _bytes: &[u8]) -> Result<(), E3KError> {
        Ok(())
    }
}

impl ByteSource for Disconnected {
    fn read_byte(&mut self) -> Option<u8> {
        None
    }
}

/// Pairs a source and a sink into one transport.
#[derive(Debug, Default)]
pub struct Duplex<R, W> {
    pub source: R,
    pub sink: W,
}

impl<R, W> Duplex<R, W> {
    pub fn new(source: R, sink: W) -> Self {
        Self { source, sink }
    }
}

impl<R: ByteSource, W> ByteSource for Duplex<R, W> {
    fn read_byte(&mut self) -> Option<u8> {
        self.source.read_byte()
    }
}

impl<R, W: ByteSink> ByteSink for Duplex<R, W> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), E3KError> {
        self.sink.write_bytes(bytes)
    }
}

/// Send `frame` over the link selected by `config`.
///
/// Nothing is written while the device is stopped. Transport modes the
/// device does not implement use the wired link. Returns the link written to.
pub fn dispatch<W, B>(
    config: &DeviceConfig,
    frame: &EncodedFrame,
    wired: &mut W,
    wireless: &mut B,
) -> Result<Option<Link>, E3KError>
where
    W: ByteSink + ?Sized,
    B: ByteSink + ?Sized,
{
    if !config.run_state {
        return Ok(None);
    }

    if config.transport.is_fallback() {
        debug!(mode = %config.transport, "Transport not implemented, using wired link");
    }

    let link = config.link();
    match link {
        Link::Wired => wired.write_bytes(frame.as_bytes())?,
        Link::Wireless => wireless.write_bytes(frame.as_bytes())?,
    }
    trace!(%link, len = frame.len(), "Dispatched frame");
    Ok(Some(link))
}
