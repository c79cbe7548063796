//! Header checksum.

/// Generator polynomial `x^8 + x^2 + x + 1`.
pub const CRC8_POLY: u8 = 0x07;

/// CRC-8 over `data`: polynomial 0x07, initial value 0, no reflection, no final XOR.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ CRC8_POLY;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}
