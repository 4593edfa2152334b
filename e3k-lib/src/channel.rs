use crate::constants::{ALL_CHANNELS_MASK, CHANNEL_COUNT, SAMPLE_MASK};
use crate::error::E3KError;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The six-bit channel selection carried in a control word.
///
/// Channel 0 is the most significant of the six bits, channel 5 the least,
/// matching the order the host writes them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelMask(u8);

impl ChannelMask {
    pub const NONE: ChannelMask = ChannelMask(0);
    pub const ALL: ChannelMask = ChannelMask(ALL_CHANNELS_MASK);

    /// Build a mask from the raw six-bit field. Bits above the sixth are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        ChannelMask(bits & ALL_CHANNELS_MASK)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build a mask from a list of channel indices.
    pub fn from_channels(channels: &[usize]) -> Result<Self, E3KError> {
        let mut mask = ChannelMask::NONE;
        for &channel in channels {
            mask = mask.with(channel, true)?;
        }
        Ok(mask)
    }

    /// Build a mask from per-channel flags, channel 0 first.
    pub fn from_flags(flags: [bool; CHANNEL_COUNT]) -> Self {
        flags
            .iter()
            .enumerate()
            .fold(ChannelMask::NONE, |mask, (channel, &on)| {
                if on {
                    ChannelMask(mask.0 | Self::bit(channel))
                } else {
                    mask
                }
            })
    }

    const fn bit(channel: usize) -> u8 {
        1 << (CHANNEL_COUNT - 1 - channel)
    }

    pub fn with(self, channel: usize, active: bool) -> Result<Self, E3KError> {
        if channel >= CHANNEL_COUNT {
            return Err(E3KError::InvalidChannel(channel));
        }
        let bits = if active {
            self.0 | Self::bit(channel)
        } else {
            self.0 & !Self::bit(channel)
        };
        Ok(ChannelMask(bits))
    }

    /// Whether `channel` is selected. Out-of-range indices are never selected.
    pub fn is_active(self, channel: usize) -> bool {
        channel < CHANNEL_COUNT && self.0 & Self::bit(channel) != 0
    }

    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Active channel indices in ascending order.
    pub fn active_channels(self) -> impl Iterator<Item = usize> {
        (0..CHANNEL_COUNT).filter(move |&channel| self.is_active(channel))
    }
}

impl fmt::Display for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06b}", self.0)
    }
}

impl FromStr for ChannelMask {
    type Err = E3KError;

    /// Accepts `all`, `none`, or a comma separated list of channel indices.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(ChannelMask::ALL),
            "none" | "" => Ok(ChannelMask::NONE),
            list => {
                let channels = list
                    .split(',')
                    .map(|item| {
                        item.trim()
                            .parse::<usize>()
                            .map_err(|_| E3KError::InvalidChannelList(s.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                ChannelMask::from_channels(&channels)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Channel {
    pub active: bool,
    pub value: u16,
}

/// Activation flags and latest samples for the six inputs.
///
/// An inactive channel always holds a zero sample: deactivation clears the
/// cached value and acquisitions are only latched into active channels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelTable {
    channels: [Channel; CHANNEL_COUNT],
}

impl ChannelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a channel selection. Deactivated channels lose their cached sample.
    pub fn apply_mask(&mut self, mask: ChannelMask) {
        for (index, channel) in self.channels.iter_mut().enumerate() {
            channel.active = mask.is_active(index);
            if !channel.active {
                channel.value = 0;
            }
        }
    }

    /// Latch one acquisition. Values are cut to 12 bits; inactive channels
    /// discard theirs.
    pub fn store(&mut self, samples: [u16; CHANNEL_COUNT]) {
        for (channel, sample) in self.channels.iter_mut().zip(samples) {
            if channel.active {
                channel.value = sample & SAMPLE_MASK;
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.get(index).is_some_and(|channel| channel.active)
    }

    pub fn value(&self, index: usize) -> u16 {
        self.get(index).map_or(0, |channel| channel.value)
    }

    pub fn active_count(&self) -> usize {
        self.channels.iter().filter(|channel| channel.active).count()
    }

    pub fn mask(&self) -> ChannelMask {
        ChannelMask::from_flags(self.channels.map(|channel| channel.active))
    }

    /// Samples of the active channels in ascending channel order.
    pub fn active_values(&self) -> impl Iterator<Item = u16> + '_ {
        self.channels
            .iter()
            .filter(|channel| channel.active)
            .map(|channel| channel.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_bit_order_puts_channel_zero_first() {
        let mask = ChannelMask::from_bits(0b10_0000);
        assert!(mask.is_active(0));
        assert!(!mask.is_active(5));

        let mask = ChannelMask::from_bits(0b00_0001);
        assert!(mask.is_active(5));
        assert_eq!(mask.active_channels().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn mask_from_channels_rejects_out_of_range() {
        assert!(matches!(
            ChannelMask::from_channels(&[0, 6]),
            Err(E3KError::InvalidChannel(6))
        ));
        let mask = ChannelMask::from_channels(&[0, 2, 4]).unwrap();
        assert_eq!(mask.bits(), 0b10_1010);
        assert_eq!(mask.to_string(), "101010");
    }

    #[test]
    fn mask_parses_channel_lists() {
        assert_eq!("all".parse::<ChannelMask>().unwrap(), ChannelMask::ALL);
        assert_eq!("none".parse::<ChannelMask>().unwrap(), ChannelMask::NONE);
        assert_eq!("0, 5".parse::<ChannelMask>().unwrap().bits(), 0b10_0001);
        assert!("1,x".parse::<ChannelMask>().is_err());
        assert!(matches!("9".parse::<ChannelMask>(), Err(E3KError::InvalidChannel(9))));
    }

    #[test]
    fn store_ignores_inactive_channels() {
        let mut table = ChannelTable::new();
        table.apply_mask(ChannelMask::from_bits(0b10_0001));
        table.store([100, 200, 300, 400, 500, 0xF123]);

        assert_eq!(table.value(0), 100);
        assert_eq!(table.value(1), 0);
        assert_eq!(table.value(5), 0x123);
        assert_eq!(table.active_values().collect::<Vec<_>>(), vec![100, 0x123]);
        assert_eq!(table.active_count(), 2);
        assert_eq!(table.mask(), ChannelMask::from_bits(0b10_0001));
    }

    #[test]
    fn reactivated_channel_reads_zero_until_next_acquisition() {
        let mut table = ChannelTable::new();
        table.apply_mask(ChannelMask::ALL);
        table.store([1, 2, 3, 4, 5, 6]);

        table.apply_mask(ChannelMask::from_bits(0b01_1111));
        assert_eq!(table.value(0), 0);

        table.apply_mask(ChannelMask::ALL);
        assert!(table.is_active(0));
        assert_eq!(table.value(0), 0);
        assert_eq!(table.value(1), 2);

        table.store([7, 2, 3, 4, 5, 6]);
        assert_eq!(table.value(0), 7);
    }
}
