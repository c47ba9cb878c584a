//! Protocol errors

use thiserror::Error;

/// Outcome of a single receive cycle that did not yield a valid frame.
///
/// Exactly one of these is recorded per `recv` call. A successful receive is
/// represented by `Ok`, so there is no "none" variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Nothing arrived before the first-byte timeout
    #[error("Timeout: no response from station")]
    Timeout,

    /// The station address never appeared in the capture
    #[error("Cannot find header of packet")]
    HeaderNotFound,

    /// Byte count and captured length disagree, or the frame is cut short
    #[error("Damaged packet: byte count does not match captured length")]
    Malformed,

    /// Trailer does not match the computed CRC
    #[error("CRC incorrect")]
    CrcMismatch,

    /// Function byte above 0x80
    #[error("Exception response")]
    ExceptionResponse,

    /// Function byte is not a read response
    #[error("No data from this packet")]
    NoData,

    /// More bytes arrived than the receive buffer holds
    #[error("Receive buffer overflow: more than {capacity} bytes captured")]
    Overflow {
        /// Buffer size in bytes
        capacity: usize,
    },

    /// The data region is too short for the requested value
    #[error("Data region too short: need {needed} bytes, got {available}")]
    DataTooShort {
        /// Bytes the value needs
        needed: usize,
        /// Bytes in the data region
        available: usize,
    },

    /// The serial line failed during the transaction
    #[error("Serial I/O error: {0}")]
    Io(String),
}

impl FrameError {
    /// Numeric error code, 0 being reserved for "no error".
    pub fn code(&self) -> u8 {
        match self {
            FrameError::Timeout => 1,
            FrameError::HeaderNotFound => 2,
            FrameError::Malformed => 3,
            FrameError::CrcMismatch => 4,
            FrameError::ExceptionResponse => 5,
            FrameError::NoData => 6,
            FrameError::Overflow { .. } => 7,
            FrameError::DataTooShort { .. } => 8,
            FrameError::Io(_) => 9,
        }
    }

    /// Short upper-case report, as printed on a diagnostic console.
    pub fn report(&self) -> &'static str {
        match self {
            FrameError::Timeout => "TIMEOUT",
            FrameError::HeaderNotFound => "CANNOT FIND HEADER OF PACKET",
            FrameError::Malformed => "DAMAGED PACKET",
            FrameError::CrcMismatch => "CRC INCORRECT",
            FrameError::ExceptionResponse => "EXCEPTION RESPONSE",
            FrameError::NoData => "NO DATA FROM THIS PACKET",
            FrameError::Overflow { .. } => "RECEIVE BUFFER OVERFLOW",
            FrameError::DataTooShort { .. } => "DATA TOO SHORT",
            FrameError::Io(_) => "SERIAL I/O ERROR",
        }
    }
}

impl From<std::io::Error> for FrameError {
    fn from(e: std::io::Error) -> Self {
        FrameError::Io(e.to_string())
    }
}

/// Errors raised by the transport and configuration layers
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Error reported by the serial driver
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// The named port does not exist
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Rejected link settings or unreadable config file
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A thread panicked while holding the bus
    #[error("Bus lock poisoned by a panicked transaction")]
    BusPoisoned,

    /// A transaction failed at the frame level
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Read/write failure on the line
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serialport::Error> for ProtocolError {
    fn from(e: serialport::Error) -> Self {
        match e.kind() {
            serialport::ErrorKind::NoDevice => ProtocolError::PortNotFound(e.description),
            _ => ProtocolError::SerialError(e.to_string()),
        }
    }
}
