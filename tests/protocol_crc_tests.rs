use telesource::protocol::{crc16, crc16_bytes, encode_packet, ProtocolVariant};

#[test]
fn test_reference_value() {
    assert_eq!(crc16(b"123456789"), 0x906E);
}

#[test]
fn test_frame_trailer_matches_payload_crc() {
    let frame = encode_packet(ProtocolVariant::Power, &[100.0, 200.0, 300.0, 400.0, 500.0], 0x5A);
    let payload = &frame[1..frame.len() - 2];
    assert_eq!(&frame[frame.len() - 2..], &crc16_bytes(payload));
}

#[test]
fn test_every_single_bit_flip_changes_crc() {
    let payload: Vec<u8> = vec![0x00, 0x64, 0x00, 0xC8, 0x01, 0x2C, 0x01, 0x90, 0x01, 0xF4, 0x5A];
    let reference = crc16(&payload);

    for byte in 0..payload.len() {
        for bit in 0..8 {
            let mut flipped = payload.clone();
            flipped[byte] ^= 1 << bit;
            assert_ne!(crc16(&flipped), reference, "flip of byte {} bit {} went unnoticed", byte, bit);
        }
    }
}
