//! Tests for frame layout and sizing

mod common;

use common::*;

#[test]
fn test_reference_frame_bytes() {
    let mut packer = Packer::new();
    let frame = packer.pack(REFERENCE_SAMPLES);

    assert_eq!(frame.len(), 9);
    assert_eq!(frame.as_bytes(), hex_to_bytes(ALL_CHANNELS_FRAME).as_ref());
    assert_eq!(frame.as_bytes()[0], 0xFF);
    assert_eq!(frame.as_bytes()[1], 0xF0);
    assert_eq!(frame.as_bytes()[2], 0x00);
}

#[test]
fn test_frame_length_sequence() {
    let lengths: Vec<usize> = (0..=6).map(frame_length).collect();
    assert_eq!(lengths, vec![0, 2, 3, 5, 6, 8, 9]);
}

#[test]
fn test_frame_length_follows_active_count() {
    let mut packer = Packer::new();
    for active in 0..=6 {
        let frame = packer.pack(REFERENCE_SAMPLES.iter().copied().take(active));
        assert_eq!(frame.len(), frame_length(active), "{} active channels", active);
        assert_eq!(frame.sample_count(), active);
    }
}

#[test]
fn test_only_active_channels_are_packed() {
    // Channels 1 and 4: phases follow the activation order, not the indices
    let mut table = ChannelTable::new();
    table.apply_mask(ChannelMask::from_channels(&[1, 4]).unwrap());
    table.store(REFERENCE_SAMPLES);

    let frame = Packer::new().pack(table.active_values());
    // channel 1 = 0x000, channel 4 = 0xFFE
    assert_eq!(frame.as_bytes(), &[0x00, 0x0F, 0xFE]);
}

#[test]
fn test_unpack_reference_frame() {
    let bytes = hex_to_bytes(ALL_CHANNELS_FRAME);
    let samples = unpack(&bytes, 6).expect("Failed to unpack frame");
    assert_eq!(samples, REFERENCE_SAMPLES.to_vec());
}

#[test]
fn test_unpack_length_mismatch() {
    let bytes = hex_to_bytes(ALL_CHANNELS_FRAME);
    match unpack(&bytes, 5) {
        Err(E3KError::InvalidFrameLength {
            active,
            expected,
            actual,
        }) => {
            assert_eq!(active, 5);
            assert_eq!(expected, 8);
            assert_eq!(actual, 9);
        }
        other => panic!("Expected InvalidFrameLength, got {:?}", other),
    }
}

#[test]
fn test_empty_frame() {
    let frame = Packer::new().pack(std::iter::empty());
    assert!(frame.is_empty());
    assert_eq!(Bytes::from(frame).len(), 0);
    assert_eq!(unpack(&[], 0).unwrap(), Vec::<u16>::new());
}
