//! Response frame location and validation
//!
//! A capture from the line may contain echo, noise or a partial frame ahead
//! of the real reply. The parser walks every byte equal to the expected
//! station address and accepts the first candidate that satisfies:
//!
//! 1. function byte `<= 0x04` (normal read response),
//! 2. declared byte count exactly fills the rest of the capture,
//! 3. CRC-16 over address..data matches the trailer.
//!
//! A rejected candidate only advances the search by one byte, so an address
//! value that reappears inside a payload can still be tried as a header.

use tracing::trace;

use super::{crc, FrameError, RECV_BUFFER_CAPACITY};

/// Highest function byte treated as a normal read response
const MAX_READ_FUNCTION: u8 = 0x04;

/// Function bytes above this mark an exception response
const EXCEPTION_FLAG: u8 = 0x80;

/// address + function + byte count
const HEADER_LEN: usize = 3;

/// CRC trailer
const CRC_LEN: usize = 2;

/// Fixed-capacity receive buffer
#[derive(Debug, Clone)]
pub struct ReceiveBuffer {
    bytes: [u8; RECV_BUFFER_CAPACITY],
    len: usize,
}

impl ReceiveBuffer {
    /// Empty buffer
    pub fn new() -> Self {
        Self {
            bytes: [0u8; RECV_BUFFER_CAPACITY],
            len: 0,
        }
    }

    /// Forget the previous capture. Old contents are overwritten, not zeroed.
    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Store one byte; returns `false` when the buffer is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.len >= RECV_BUFFER_CAPACITY {
            return false;
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        true
    }

    /// Bytes captured so far
    pub fn len(&self) -> usize {
        self.len
    }

    /// Nothing captured
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// No room for another byte
    pub fn is_full(&self) -> bool {
        self.len == RECV_BUFFER_CAPACITY
    }

    /// Maximum capture length
    pub fn capacity(&self) -> usize {
        RECV_BUFFER_CAPACITY
    }

    /// The captured bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl Default for ReceiveBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Position of a validated frame inside a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBounds {
    /// Index of the station address byte
    pub packet_start: usize,
    /// Index of the first data byte
    pub data_start: usize,
    /// One past the last data byte (= index of the CRC low byte)
    pub data_end: usize,
}

impl FrameBounds {
    /// Data region of `capture`
    pub fn data<'a>(&self, capture: &'a [u8]) -> &'a [u8] {
        &capture[self.data_start..self.data_end]
    }

    /// Whole frame including address and CRC
    pub fn frame<'a>(&self, capture: &'a [u8]) -> &'a [u8] {
        &capture[self.packet_start..self.data_end + CRC_LEN]
    }

    /// Function code byte of the frame
    pub fn function(&self, capture: &[u8]) -> u8 {
        capture[self.packet_start + 1]
    }

    /// Byte count declared by the frame
    pub fn data_len(&self) -> usize {
        self.data_end - self.data_start
    }
}

/// Find the first valid response for `station` in `capture`.
///
/// When no candidate survives, the error of the last rejected candidate is
/// returned, or `HeaderNotFound` if the address never appeared.
pub fn parse(capture: &[u8], station: u8) -> Result<FrameBounds, FrameError> {
    let len = capture.len();
    let mut cursor = 0;
    let mut last_error: Option<FrameError> = None;

    while let Some(offset) = capture[cursor.min(len)..].iter().position(|&b| b == station) {
        let header = cursor + offset;
        cursor = header + 1;

        match check_candidate(capture, header) {
            Ok(bounds) => {
                trace!(header, data_len = bounds.data_len(), "frame accepted");
                return Ok(bounds);
            }
            Err(e) => {
                trace!(header, error = %e, "candidate rejected");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or(FrameError::HeaderNotFound))
}

fn check_candidate(capture: &[u8], header: usize) -> Result<FrameBounds, FrameError> {
    let len = capture.len();
    let function = *capture.get(header + 1).ok_or(FrameError::Malformed)?;

    if function > EXCEPTION_FLAG {
        return Err(FrameError::ExceptionResponse);
    }
    if function > MAX_READ_FUNCTION {
        return Err(FrameError::NoData);
    }

    let byte_count = *capture.get(header + 2).ok_or(FrameError::Malformed)? as usize;
    if header + HEADER_LEN + byte_count + CRC_LEN != len {
        return Err(FrameError::Malformed);
    }

    let data_start = header + HEADER_LEN;
    let data_end = data_start + byte_count;
    let [lo, hi] = crc::to_wire(crc::compute(&capture[header..data_end]));
    if capture[data_end] != lo || capture[data_end + 1] != hi {
        return Err(FrameError::CrcMismatch);
    }

    Ok(FrameBounds {
        packet_start: header,
        data_start,
        data_end,
    })
}
