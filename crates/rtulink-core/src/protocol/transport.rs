//! Byte-level transport abstraction
//!
//! The master only needs a duplex byte stream with a queryable input queue
//! and a driver-enable output for the RS-485 transceiver. Both are traits so
//! the framing code can run against a real port or a test double.

use serialport::SerialPort;
use std::io::{self, Read, Write};

use tracing::warn;

use crate::config::DirectionMode;

/// Duplex byte stream of a serial line
pub trait SerialLine: Send {
    /// Number of received bytes waiting to be read
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read one byte. Only called after `bytes_available` reported data.
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Write all bytes to the line
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Discard any pending input
    fn clear_input(&mut self) -> io::Result<()> {
        while self.bytes_available()? > 0 {
            self.read_byte()?;
        }
        Ok(())
    }

    /// Configured bit rate
    fn baud_rate(&self) -> u32;
}

/// Driver-enable output of a half-duplex transceiver
pub trait DirectionControl: Send {
    /// `true` while transmitting, `false` to listen
    fn set_transmit(&mut self, transmit: bool) -> io::Result<()>;
}

/// Transceivers that switch direction on their own
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoDirection;

impl DirectionControl for AutoDirection {
    fn set_transmit(&mut self, _transmit: bool) -> io::Result<()> {
        Ok(())
    }
}

/// Driver enable wired to the port's RTS line
pub struct RtsDirection {
    port: Box<dyn SerialPort>,
    inverted: bool,
}

impl RtsDirection {
    /// `port` is usually a `try_clone` of the data handle
    pub fn new(port: Box<dyn SerialPort>, inverted: bool) -> Self {
        Self { port, inverted }
    }
}

impl DirectionControl for RtsDirection {
    fn set_transmit(&mut self, transmit: bool) -> io::Result<()> {
        self.port
            .write_request_to_send(transmit != self.inverted)
            .map_err(io::Error::other)
    }
}

/// Build the direction control for `mode` from the open data port
pub fn direction_for(
    mode: DirectionMode,
    port: &dyn SerialPort,
) -> io::Result<Box<dyn DirectionControl>> {
    match mode {
        DirectionMode::Auto => Ok(Box::new(AutoDirection)),
        DirectionMode::Rts | DirectionMode::RtsInverted => {
            let handle = port.try_clone().map_err(io::Error::other)?;
            let mut rts = RtsDirection::new(handle, mode == DirectionMode::RtsInverted);
            // start in receive mode
            rts.set_transmit(false)?;
            Ok(Box::new(rts))
        }
    }
}

/// Write `bytes` and block until the driver has sent them.
///
/// `flush` on a serial port drains the transmit queue (tcdrain on Unix),
/// so the driver-enable line may be released as soon as this returns.
pub fn write_drained<W: Write + ?Sized>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    out.write_all(bytes)?;
    out.flush()
}

/// `serialport`-backed serial line
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    baud_rate: u32,
}

impl SerialChannel {
    /// Wrap an opened and configured port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        let baud_rate = port.baud_rate().unwrap_or_else(|e| {
            warn!("cannot query baud rate ({}), assuming {}", e, super::DEFAULT_BAUD_RATE);
            super::DEFAULT_BAUD_RATE
        });
        Self { port, baud_rate }
    }

    /// Underlying port handle
    pub fn port(&self) -> &dyn SerialPort {
        self.port.as_ref()
    }
}

impl SerialLine for SerialChannel {
    fn bytes_available(&mut self) -> io::Result<usize> {
        self.port
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(io::Error::other)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.port.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        write_drained(self.port.as_mut(), bytes)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::other)
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}
