//! Request frame encoding
//!
//! Read requests share one fixed layout:
//! - 1 byte: station address
//! - 1 byte: function code
//! - 2 bytes: first register/coil address (big-endian)
//! - 2 bytes: number of registers/coils (big-endian)
//! - 2 bytes: CRC-16, low byte first

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

use super::crc;

/// Length of a read request before the CRC
pub const READ_REQUEST_LEN: usize = 6;

/// Supported read function codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FunctionCode {
    /// Read coils (0x01)
    ReadCoils = 0x01,
    /// Read discrete inputs (0x02)
    ReadDiscreteInputs = 0x02,
    /// Read holding registers (0x03)
    ReadHoldingRegisters = 0x03,
    /// Read input registers (0x04)
    ReadInputRegisters = 0x04,
}

impl FunctionCode {
    /// The on-wire opcode
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Map an opcode back to a supported function
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::ReadCoils),
            0x02 => Some(Self::ReadDiscreteInputs),
            0x03 => Some(Self::ReadHoldingRegisters),
            0x04 => Some(Self::ReadInputRegisters),
            _ => None,
        }
    }
}

/// A read request addressed to one station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    /// Station (slave) address
    pub station: u8,
    /// Which table to read
    pub function: FunctionCode,
    /// First address
    pub start: u16,
    /// Number of items
    pub count: u16,
}

impl ReadRequest {
    /// Read `count` items of `function`'s table from `start`
    pub fn new(station: u8, function: FunctionCode, start: u16, count: u16) -> Self {
        Self {
            station,
            function,
            start,
            count,
        }
    }

    /// The six request bytes without CRC
    pub fn to_bytes(&self) -> [u8; READ_REQUEST_LEN] {
        let mut bytes = [0u8; READ_REQUEST_LEN];
        bytes[0] = self.station;
        bytes[1] = self.function.code();
        BigEndian::write_u16(&mut bytes[2..4], self.start);
        BigEndian::write_u16(&mut bytes[4..6], self.count);
        bytes
    }

    /// Full wire frame, CRC included
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(READ_REQUEST_LEN + 2);
        frame.extend_from_slice(&self.to_bytes());
        crc::append(&mut frame);
        frame
    }
}

/// Builder for arbitrary request packets
pub struct FrameBuilder {
    bytes: Vec<u8>,
}

impl FrameBuilder {
    /// Start a packet addressed to `station`
    pub fn new(station: u8) -> Self {
        Self {
            bytes: vec![station],
        }
    }

    /// Add the function code byte
    pub fn function(mut self, code: u8) -> Self {
        self.bytes.push(code);
        self
    }

    /// Add a single byte
    pub fn byte(mut self, b: u8) -> Self {
        self.bytes.push(b);
        self
    }

    /// Add a 16-bit value (big-endian)
    pub fn u16_be(mut self, value: u16) -> Self {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, value);
        self.bytes.extend_from_slice(&buf);
        self
    }

    /// Add raw bytes
    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(data);
        self
    }

    /// Finish the packet, optionally with the CRC trailer
    pub fn build(mut self, append_crc: bool) -> Vec<u8> {
        if append_crc {
            crc::append(&mut self.bytes);
        }
        self.bytes
    }
}

impl From<ReadRequest> for FrameBuilder {
    fn from(req: ReadRequest) -> Self {
        FrameBuilder::new(req.station)
            .function(req.function.code())
            .u16_be(req.start)
            .u16_be(req.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_holding_layout() {
        let req = ReadRequest::new(0x01, FunctionCode::ReadHoldingRegisters, 0x0000, 0x0002);
        assert_eq!(req.to_bytes(), [0x01, 0x03, 0x00, 0x00, 0x00, 0x02]);
        assert_eq!(
            req.encode(),
            vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B]
        );
    }

    #[test]
    fn test_start_and_count_are_big_endian() {
        let req = ReadRequest::new(0x11, FunctionCode::ReadInputRegisters, 0x1234, 0x00FF);
        assert_eq!(req.to_bytes(), [0x11, 0x04, 0x12, 0x34, 0x00, 0xFF]);
    }

    #[test]
    fn test_builder_matches_request() {
        let req = ReadRequest::new(7, FunctionCode::ReadCoils, 19, 37);
        let built = FrameBuilder::from(req).build(true);
        assert_eq!(built, req.encode());
    }

    #[test]
    fn test_builder_without_crc() {
        let packet = FrameBuilder::new(0x02)
            .function(0x02)
            .u16_be(0x00C4)
            .byte(0x00)
            .bytes(&[0x16])
            .build(false);
        assert_eq!(packet, vec![0x02, 0x02, 0x00, 0xC4, 0x00, 0x16]);
    }

    #[test]
    fn test_function_code_roundtrip() {
        for code in 1..=4u8 {
            let f = FunctionCode::from_u8(code).expect("supported code");
            assert_eq!(f.code(), code);
        }
        assert_eq!(FunctionCode::from_u8(0x05), None);
        assert_eq!(FunctionCode::from_u8(0x83), None);
    }
}
