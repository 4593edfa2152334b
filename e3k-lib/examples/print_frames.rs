//! Print the frame the device sends for every channel selection, given a
//! fixed set of samples.
//!
//! Usage: cargo run --example print_frames [s0 s1 s2 s3 s4 s5]

use e3k_lib::{ChannelMask, ChannelTable, Packer, unpack};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<u16> = std::env::args()
        .skip(1)
        .map(|arg| arg.parse::<u16>())
        .collect::<Result<_, _>>()?;
    let samples: [u16; 6] = match args.len() {
        0 => [4095, 0, 2048, 1, 4094, 17],
        6 => [args[0], args[1], args[2], args[3], args[4], args[5]],
        n => return Err(format!("expected 6 samples, got {}", n).into()),
    };

    let mut packer = Packer::new();
    for bits in (0..=0b11_1111u8).rev() {
        let mask = ChannelMask::from_bits(bits);
        let mut table = ChannelTable::new();
        table.apply_mask(mask);
        table.store(samples);

        let frame = packer.pack(table.active_values());
        let decoded = unpack(frame.as_bytes(), mask.count())?;
        println!(
            "{} ({} ch, {} bytes): {:<18} -> {:?}",
            mask,
            mask.count(),
            frame.len(),
            hex::encode(frame.as_bytes()),
            decoded
        );
    }
    Ok(())
}
