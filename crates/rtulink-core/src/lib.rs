//! # rtulink Core Library
//!
//! Master side of Modbus RTU over a half-duplex (RS-485) serial line.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - CRC-16 (Modbus) computation and verification
//! - Read request framing (coils, discrete inputs, holding and input registers)
//! - Response capture with first-byte and inter-byte timeouts
//! - Response location and validation in a noisy capture
//! - Typed access to the data region (byte, integer, float, text)
//!
//! ## Example
//!
//! ```rust,ignore
//! use rtulink_core::{config::LinkConfig, protocol::RtuMaster};
//!
//! let mut master = RtuMaster::open(LinkConfig::for_port("/dev/ttyUSB0", 9600))?;
//!
//! // Two holding registers from station 1
//! master.send_read_holding(0x01, 0x0000, 2)?;
//! match master.recv_integer(0x01) {
//!     Ok(value) => println!("value: {}", value),
//!     Err(e) => println!("read failed: {}", e.report()),
//! }
//! ```

pub mod bus;
pub mod config;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bus::SharedBus;
    pub use crate::config::{DirectionMode, LinkConfig};
    pub use crate::protocol::{
        FrameError, FunctionCode, ProtocolError, ReadRequest, RtuMaster, Value, ValueKind,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
