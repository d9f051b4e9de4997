/// Reflected CCITT polynomial.
pub const POLY: u16 = 0x8408;

/// CRC-16 over `bytes`, bit-reversed 0x8408 algorithm (init 0xFFFF, final
/// complement).
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in bytes {
        let mut data = byte;
        for _ in 0..8 {
            if (crc ^ data as u16) & 0x0001 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
            data >>= 1;
        }
    }
    !crc
}

/// Checksum bytes as they appear on the wire (high byte first).
pub fn crc16_bytes(bytes: &[u8]) -> [u8; 2] {
    crc16(bytes).to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(crc16(b"123456789"), 0x906E);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(crc16(&[]), 0x0000);
    }

    #[test]
    fn test_wire_order() {
        assert_eq!(crc16_bytes(b"123456789"), [0x90, 0x6E]);
    }
}
