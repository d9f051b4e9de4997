//! Telemetry wire protocol: framing, integrity check and packet assembly.

pub mod crc;
pub mod decoder;
pub mod packet;
pub mod variant;

pub use crc::{crc16, crc16_bytes};
pub use decoder::{DecodeError, DecoderConfig, DecoderStats, Discard, Feed, PacketDecoder};
pub use packet::{ReadState, TelemetryPacket};
pub use variant::{ProtocolVariant, SampleEncoding, MAX_CHANNELS, PAIR_THRESHOLD};

use variant::{MAGNITUDE_MASK, SIGN_BIT};

/// Build one wire frame: sync byte, big-endian channel words, status byte and
/// the checksum when the variant carries one.
///
/// Missing channels are sent as zero, extra values are ignored. Values are
/// rounded and clamped to the range the encoding can represent.
pub fn encode_packet(variant: ProtocolVariant, values: &[f64], status: u8) -> Vec<u8> {
    let mut payload = Vec::with_capacity(variant.payload_len());

    for ch in 0..variant.channels() {
        let value = values.get(ch).copied().unwrap_or(0.0);
        let word = match variant.encoding() {
            SampleEncoding::Unsigned16 => value.round().clamp(0.0, u16::MAX as f64) as u16,
            SampleEncoding::SignMagnitude10 => {
                let magnitude = (value.abs().round() as u16).min(MAGNITUDE_MASK);
                if value < 0.0 && magnitude != 0 {
                    SIGN_BIT | magnitude
                } else {
                    magnitude
                }
            }
        };
        payload.extend_from_slice(&word.to_be_bytes());
    }
    payload.push(status);

    let mut frame = Vec::with_capacity(variant.payload_len() + 1);
    frame.push(variant.sync_byte());
    frame.extend_from_slice(&payload);
    if variant.has_checksum() {
        frame.extend_from_slice(&crc16_bytes(&payload));
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_length_matches_variant() {
        for variant in [ProtocolVariant::Legacy, ProtocolVariant::Raw, ProtocolVariant::Power] {
            let frame = encode_packet(variant, &[], 0);
            assert_eq!(frame.len(), variant.payload_len() + 1);
            assert!(variant.is_sync(frame[0]));
        }
    }

    #[test]
    fn test_values_are_clamped() {
        let frame = encode_packet(ProtocolVariant::Raw, &[5000.0, -5000.0], 0);
        assert_eq!(&frame[1..3], &[0x03, 0xFF]);
        assert_eq!(&frame[3..5], &[0x07, 0xFF]);
    }
}
