//! Synthetic ADC readings standing in for the analog front end.

use clap::ValueEnum;
use e3k_lib::Acquisition;
use e3k_lib::constants::{CHANNEL_COUNT, SAMPLE_MAX};
use std::f64::consts::TAU;

/// Ticks per period of the periodic waveforms
const PERIOD: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Waveform {
    /// Sawtooth sweeping the full 12-bit range
    Ramp,
    /// Sine centred on mid-scale
    Sine,
    /// Alternates between zero and full scale
    Square,
    /// Fixed level per channel
    Constant,
}

/// Generates one reading per channel per tick, each channel phase-shifted by
/// a sixth of a period.
#[derive(Debug, Clone)]
pub struct Generator {
    waveform: Waveform,
    step: u32,
}

impl Generator {
    pub fn new(waveform: Waveform) -> Self {
        Self { waveform, step: 0 }
    }

    fn sample(&self, channel: usize) -> u16 {
        let full = f64::from(SAMPLE_MAX);
        let offset = channel as u32 * PERIOD / CHANNEL_COUNT as u32;
        let position = (self.step + offset) % PERIOD;
        match self.waveform {
            Waveform::Ramp => (u32::from(SAMPLE_MAX) * position / (PERIOD - 1)) as u16,
            Waveform::Sine => {
                let angle = TAU * f64::from(position) / f64::from(PERIOD);
                (full / 2.0 * (1.0 + angle.sin())).round() as u16
            }
            Waveform::Square => {
                if position < PERIOD / 2 {
                    SAMPLE_MAX
                } else {
                    0
                }
            }
            Waveform::Constant => (full * (channel + 1) as f64 / (CHANNEL_COUNT + 1) as f64) as u16,
        }
    }
}

impl Acquisition for Generator {
    fn acquire(&mut self) -> [u16; CHANNEL_COUNT] {
        let samples = std::array::from_fn(|channel| self.sample(channel));
        self.step = (self.step + 1) % PERIOD;
        samples
    }
}
