//! CRC-16 (Modbus) checksum
//!
//! Every RTU frame ends with a CRC-16 over all preceding bytes, reflected
//! polynomial `0xA001`, seed `0xFFFF`, transmitted low byte first.

/// Initial accumulator value
pub const CRC_SEED: u16 = 0xFFFF;

/// Reflected form of the 0x8005 polynomial
pub const CRC_POLY: u16 = 0xA001;

/// Feed one byte into the accumulator.
pub fn update(crc: u16, byte: u8) -> u16 {
    let mut crc = crc ^ byte as u16;
    for _ in 0..8 {
        if crc & 1 != 0 {
            crc = (crc >> 1) ^ CRC_POLY;
        } else {
            crc >>= 1;
        }
    }
    crc
}

/// CRC of a whole byte sequence.
pub fn compute(bytes: &[u8]) -> u16 {
    bytes.iter().fold(CRC_SEED, |crc, &b| update(crc, b))
}

/// Wire order of a checksum: `[low, high]`.
pub fn to_wire(crc: u16) -> [u8; 2] {
    crc.to_le_bytes()
}

/// Append the checksum of `frame` to itself.
pub fn append(frame: &mut Vec<u8>) {
    let crc = compute(frame);
    frame.extend_from_slice(&to_wire(crc));
}

/// Check the two trailing bytes of `frame` against the CRC of everything before them.
///
/// A frame needs at least one covered byte plus the trailer.
pub fn verify(frame: &[u8]) -> bool {
    if frame.len() < 3 {
        return false;
    }
    let (body, trailer) = frame.split_at(frame.len() - 2);
    let [lo, hi] = to_wire(compute(body));
    trailer[0] == lo && trailer[1] == hi
}
