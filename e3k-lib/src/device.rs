use crate::channel::ChannelTable;
use crate::constants::CHANNEL_COUNT;
use crate::control::{DeviceConfig, Link};
use crate::error::E3KError;
use crate::frame::{EncodedFrame, Packer};
use crate::input::ControlWordReader;
use crate::transport::{ByteSink, ByteSource, dispatch};
use tracing::{debug, info};

/// Source of raw ADC readings, one per channel.
pub trait Acquisition {
    fn acquire(&mut self) -> [u16; CHANNEL_COUNT];
}

impl<F> Acquisition for F
where
    F: FnMut() -> [u16; CHANNEL_COUNT],
{
    fn acquire(&mut self) -> [u16; CHANNEL_COUNT] {
        self()
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub frame: EncodedFrame,
    /// Link the frame was written to, `None` while stopped
    pub sent: Option<Link>,
    /// Whether a control word was applied this tick
    pub reconfigured: bool,
}

/// The E3K acquisition module.
///
/// Owns the configuration and channel state and drives both transports.
/// Everything happens inside [`E3K::tick`]; nothing blocks.
pub struct E3K<A, W, B> {
    config: DeviceConfig,
    channels: ChannelTable,
    packer: Packer,
    acquisition: A,
    wired: W,
    wireless: B,
    wired_reader: ControlWordReader,
    wireless_reader: ControlWordReader,
    ticks: u64,
}

impl<A, W, B> E3K<A, W, B>
where
    A: Acquisition,
    W: ByteSource + ByteSink,
    B: ByteSource + ByteSink,
{
    /// Create a device in its power-on state: stopped, wired, 100 Hz, no channels.
    pub fn new(acquisition: A, wired: W, wireless: B) -> Self {
        info!("E3K started");
        Self {
            config: DeviceConfig::default(),
            channels: ChannelTable::new(),
            packer: Packer::new(),
            acquisition,
            wired,
            wireless,
            wired_reader: ControlWordReader::new(),
            wireless_reader: ControlWordReader::new(),
            ticks: 0,
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn wired(&mut self) -> &mut W {
        &mut self.wired
    }

    pub fn wireless(&mut self) -> &mut B {
        &mut self.wireless
    }

    /// Decode `word` and make it the active configuration.
    pub fn apply_control_word(&mut self, word: u16) -> DeviceConfig {
        let previous = self.config;
        self.config = DeviceConfig::apply(word, &mut self.channels);
        if previous.run_state != self.config.run_state {
            info!(
                "Streaming {}",
                if self.config.run_state { "started" } else { "stopped" }
            );
        }
        if previous.rate != self.config.rate {
            debug!(rate = %self.config.rate, "Sample rate changed");
        }
        self.config
    }

    /// Check both transports for a complete control word, wired first.
    /// A word on the wireless side therefore overrides one on the wired side.
    fn poll_control(&mut self) -> bool {
        let mut applied = false;
        if let Some(word) = self.wired_reader.poll(&mut self.wired) {
            debug!(word, "Control word on wired link");
            self.apply_control_word(word);
            applied = true;
        }
        if let Some(word) = self.wireless_reader.poll(&mut self.wireless) {
            debug!(word, "Control word on wireless link");
            self.apply_control_word(word);
            applied = true;
        }
        applied
    }

    /// Run one sampling tick: take in control words, acquire, pack and send.
    pub fn tick(&mut self) -> Result<TickReport, E3KError> {
        let reconfigured = self.poll_control();

        let samples = self.acquisition.acquire();
        self.channels.store(samples);

        let frame = self.packer.pack(self.channels.active_values());
        let sent = dispatch(&self.config, &frame, &mut self.wired, &mut self.wireless)?;
        self.ticks += 1;

        Ok(TickReport {
            frame,
            sent,
            reconfigured,
        })
    }
}
