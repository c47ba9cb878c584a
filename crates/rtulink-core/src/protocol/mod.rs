//! Modbus RTU master protocol
//!
//! Request framing, half-duplex transmission, response capture and
//! validation over a serial line.
//!
//! Response frame: `[address][function][byte_count][data...][crc_lo][crc_hi]`

pub mod crc;
mod error;
pub mod frame;
mod master;
pub mod parser;
pub mod serial;
pub mod transport;
pub mod values;

pub use error::{FrameError, ProtocolError};
pub use frame::{FrameBuilder, FunctionCode, ReadRequest};
pub use master::{guard_interval, LinkStats, RecvTimeouts, RtuMaster};
pub use parser::{FrameBounds, ReceiveBuffer};
pub use serial::{clear_buffers, configure_port, list_ports, open_port, PortInfo};
pub use transport::{AutoDirection, DirectionControl, RtsDirection, SerialChannel, SerialLine};
pub use values::{Value, ValueKind};

/// Default baud rate of RTU field devices
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Wait for the first response byte, in milliseconds
pub const FIRST_BYTE_TIMEOUT_MS: u64 = 3000;

/// Silence after the last byte that ends a response, in milliseconds
pub const INTER_BYTE_TIMEOUT_MS: u64 = 500;

/// Receive buffer size
pub const RECV_BUFFER_CAPACITY: usize = 128;
