//! Transports of the emulated device.
//!
//! The device core polls its transports without waiting, so socket and
//! stdin I/O runs on tasks that hand bytes over through queues. Outgoing
//! frames use a bounded queue and are dropped when the host falls behind.

use crate::error::Error;
use bytes::{Buf, Bytes, BytesMut};
use e3k_lib::E3KError;
use e3k_lib::transport::{ByteSink, ByteSource};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::mpsc::{Receiver, Sender, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, trace, warn};

const READ_CHUNK: usize = 64;

/// Frames buffered for the wireless host before new ones are dropped
pub const FRAME_QUEUE_DEPTH: usize = 256;

/// Bytes queued by an I/O task, read one at a time by the device.
#[derive(Debug)]
pub struct QueueSource {
    rx: UnboundedReceiver<Bytes>,
    pending: BytesMut,
    name: &'static str,
    closed: bool,
}

impl QueueSource {
    pub fn new(rx: UnboundedReceiver<Bytes>, name: &'static str) -> Self {
        Self {
            rx,
            pending: BytesMut::new(),
            name,
            closed: false,
        }
    }
}

impl ByteSource for QueueSource {
    fn read_byte(&mut self) -> Option<u8> {
        loop {
            if self.pending.has_remaining() {
                return Some(self.pending.get_u8());
            }
            match self.rx.try_recv() {
                Ok(chunk) => self.pending.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    if !self.closed {
                        debug!(link = self.name, "Control input closed");
                        self.closed = true;
                    }
                    return None;
                }
            }
        }
    }
}

/// Frames handed to an I/O task for writing. A full queue drops the frame.
#[derive(Debug)]
pub struct QueueSink {
    tx: Sender<Bytes>,
    name: &'static str,
    dropped: u64,
}

impl QueueSink {
    pub fn new(tx: Sender<Bytes>, name: &'static str) -> Self {
        Self { tx, name, dropped: 0 }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl ByteSink for QueueSink {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), E3KError> {
        if bytes.is_empty() {
            return Ok(());
        }
        match self.tx.try_send(Bytes::copy_from_slice(bytes)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                trace!(link = self.name, dropped = self.dropped, "Frame queue full, dropping frame");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(E3KError::TransportClosed(self.name)),
        }
    }
}

/// Forward everything arriving on stdin as wired control input.
pub async fn read_stdin(tx: UnboundedSender<Bytes>) -> Result<(), Error> {
    let mut stdin = tokio::io::stdin();
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    loop {
        buf.reserve(READ_CHUNK);
        if stdin.read_buf(&mut buf).await? == 0 {
            debug!("Wired input reached end of file");
            return Ok(());
        }
        tx.send(buf.split().freeze())
            .map_err(|_| Error::ChannelClosed("wired control"))?;
    }
}

/// Serve the wireless link: one host at a time, control words in, frames out.
/// Frames produced while no host is connected are dropped.
pub async fn serve_wireless(
    listener: Option<TcpListener>,
    mut frames: Receiver<Bytes>,
    control: UnboundedSender<Bytes>,
) -> Result<(), Error> {
    let Some(listener) = listener else {
        while frames.recv().await.is_some() {
            trace!("Wireless link disabled, dropping frame");
        }
        return Ok(());
    };

    info!(addr = %listener.local_addr()?, "Waiting for wireless host");
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                info!(%peer, "Wireless host connected");
                match serve_peer(stream, &mut frames, &control).await {
                    Ok(()) => info!(%peer, "Wireless host disconnected"),
                    Err(Error::ChannelClosed(what)) => return Err(Error::ChannelClosed(what)),
                    Err(e) => warn!(%peer, "Wireless host dropped: {}", e),
                }
            }
            frame = frames.recv() => {
                if frame.is_none() {
                    return Ok(());
                }
                trace!("No wireless host, dropping frame");
            }
        }
    }
}

async fn serve_peer(
    stream: TcpStream,
    frames: &mut Receiver<Bytes>,
    control: &UnboundedSender<Bytes>,
) -> Result<(), Error> {
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();
    let mut buf = BytesMut::with_capacity(READ_CHUNK);

    loop {
        buf.reserve(READ_CHUNK);
        tokio::select! {
            read = reader.read_buf(&mut buf) => {
                if read? == 0 {
                    return Ok(());
                }
                control
                    .send(buf.split().freeze())
                    .map_err(|_| Error::ChannelClosed("wireless control"))?;
            }
            frame = frames.recv() => match frame {
                Some(frame) => writer.write_all(&frame).await?,
                None => return Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{channel, unbounded_channel};

    #[test]
    fn queue_source_reads_across_chunks() {
        let (tx, rx) = unbounded_channel();
        let mut source = QueueSource::new(rx, "test");
        assert_eq!(source.read_byte(), None);

        tx.send(Bytes::from_static(b"12")).unwrap();
        tx.send(Bytes::from_static(b"3\n")).unwrap();
        let read: Vec<u8> = std::iter::from_fn(|| source.read_byte()).collect();
        assert_eq!(read, b"123\n");

        drop(tx);
        assert_eq!(source.read_byte(), None);
    }

    #[test]
    fn queue_sink_skips_empty_frames() {
        let (tx, mut rx) = channel(4);
        let mut sink = QueueSink::new(tx, "test");
        sink.write_bytes(&[]).unwrap();
        sink.write_bytes(&[0xAB, 0xC0]).unwrap();
        assert_eq!(rx.try_recv().unwrap().as_ref(), &[0xAB, 0xC0]);
        assert!(rx.try_recv().is_err());

        drop(rx);
        assert!(matches!(
            sink.write_bytes(&[1]),
            Err(E3KError::TransportClosed("test"))
        ));
    }

    #[test]
    fn queue_sink_drops_frames_when_full() {
        let (tx, mut rx) = channel(2);
        let mut sink = QueueSink::new(tx, "test");
        for frame in [[1u8], [2], [3], [4]] {
            sink.write_bytes(&frame).unwrap();
        }
        assert_eq!(sink.dropped(), 2);
        assert_eq!(rx.try_recv().unwrap().as_ref(), &[1]);
        assert_eq!(rx.try_recv().unwrap().as_ref(), &[2]);
        assert!(rx.try_recv().is_err());

        sink.write_bytes(&[5]).unwrap();
        assert_eq!(rx.try_recv().unwrap().as_ref(), &[5]);
    }
}
