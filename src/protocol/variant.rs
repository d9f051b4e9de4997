use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

/// Largest channel count carried by any variant.
pub const MAX_CHANNELS: usize = 8;

/// Gap under which two packets are considered one burst pair.
pub const PAIR_THRESHOLD: Duration = Duration::from_millis(150);

/// Historical wire formats. A decoder handles exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolVariant {
    /// 6 unsigned channels, status byte, no checksum.
    Legacy,
    /// 4 sign-magnitude channels, status byte, CRC-16.
    Raw,
    /// 5 unsigned band-power channels, status byte, CRC-16, sent in pairs.
    Power,
}

/// How one channel word is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    Unsigned16,
    /// Bit 10 is the sign, bits 0..=9 the magnitude.
    SignMagnitude10,
}

/// What the byte at a given payload position means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    High(usize),
    Low(usize),
    Status,
    CrcHigh,
    CrcLow,
}

pub const SIGN_BIT: u16 = 0x0400;
pub const MAGNITUDE_MASK: u16 = 0x03FF;

impl ProtocolVariant {
    pub fn sync_range(&self) -> RangeInclusive<u8> {
        match self {
            Self::Legacy => 0xA0..=0xAF,
            Self::Raw => 0xB0..=0xBF,
            Self::Power => 0xC0..=0xCF,
        }
    }

    pub fn is_sync(&self, byte: u8) -> bool {
        self.sync_range().contains(&byte)
    }

    pub fn channels(&self) -> usize {
        match self {
            Self::Legacy => 6,
            Self::Raw => 4,
            Self::Power => 5,
        }
    }

    pub fn encoding(&self) -> SampleEncoding {
        match self {
            Self::Raw => SampleEncoding::SignMagnitude10,
            Self::Legacy | Self::Power => SampleEncoding::Unsigned16,
        }
    }

    pub fn has_checksum(&self) -> bool {
        matches!(self, Self::Raw | Self::Power)
    }

    /// Interval between packet pairs for variants that burst two packets.
    pub fn paired_interval(&self) -> Option<Duration> {
        match self {
            Self::Power => Some(Duration::from_millis(400)),
            Self::Legacy | Self::Raw => None,
        }
    }

    /// Bytes following the sync byte, checksum included.
    pub fn payload_len(&self) -> usize {
        let crc = if self.has_checksum() { 2 } else { 0 };
        self.channels() * 2 + 1 + crc
    }

    /// Map a payload position (0 = first byte after sync) to its field.
    pub fn field_at(&self, pos: usize) -> Option<Field> {
        let data_len = self.channels() * 2;
        if pos < data_len {
            let channel = pos / 2;
            return Some(if pos % 2 == 0 { Field::High(channel) } else { Field::Low(channel) });
        }
        match (pos - data_len, self.has_checksum()) {
            (0, _) => Some(Field::Status),
            (1, true) => Some(Field::CrcHigh),
            (2, true) => Some(Field::CrcLow),
            _ => None,
        }
    }

    /// Default sync byte used when building frames.
    pub fn sync_byte(&self) -> u8 {
        *self.sync_range().start()
    }
}

impl std::fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Legacy => "legacy",
            Self::Raw => "raw",
            Self::Power => "power",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_lengths() {
        assert_eq!(ProtocolVariant::Legacy.payload_len(), 13);
        assert_eq!(ProtocolVariant::Raw.payload_len(), 11);
        assert_eq!(ProtocolVariant::Power.payload_len(), 13);
    }

    #[test]
    fn test_field_layout_power() {
        let v = ProtocolVariant::Power;
        assert_eq!(v.field_at(0), Some(Field::High(0)));
        assert_eq!(v.field_at(9), Some(Field::Low(4)));
        assert_eq!(v.field_at(10), Some(Field::Status));
        assert_eq!(v.field_at(11), Some(Field::CrcHigh));
        assert_eq!(v.field_at(12), Some(Field::CrcLow));
        assert_eq!(v.field_at(13), None);
    }

    #[test]
    fn test_legacy_has_no_crc_fields() {
        let v = ProtocolVariant::Legacy;
        assert_eq!(v.field_at(12), Some(Field::Status));
        assert_eq!(v.field_at(13), None);
    }

    #[test]
    fn test_variant_serde_names() {
        let v: ProtocolVariant = serde_json::from_str("\"power\"").unwrap();
        assert_eq!(v, ProtocolVariant::Power);
    }
}
