//! RTU master
//!
//! Owns the serial line for one request/response cycle at a time:
//! transmit with driver-enable and guard timing, capture until the line
//! goes quiet, then locate and validate the response.

use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{
    crc,
    parser::{self, FrameBounds, ReceiveBuffer},
    serial::open_port,
    transport::{direction_for, DirectionControl, SerialChannel, SerialLine},
    values::{self, Value, ValueKind},
    FrameError, FunctionCode, ProtocolError, ReadRequest, DEFAULT_BAUD_RATE,
};
use crate::config::LinkConfig;

/// Silence kept before and after a transmission: `240000 / baud` ms.
///
/// A zero baud rate falls back to the default rate.
pub fn guard_interval(baud_rate: u32) -> Duration {
    let baud = if baud_rate == 0 {
        DEFAULT_BAUD_RATE
    } else {
        baud_rate
    };
    Duration::from_millis(240_000 / baud as u64)
}

/// Receive deadlines for one `recv` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvTimeouts {
    /// Maximum wait for the first byte
    pub first_byte: Duration,
    /// Silence that ends the capture
    pub inter_byte: Duration,
}

impl RecvTimeouts {
    /// Timeouts configured for `config`'s link
    pub fn from_config(config: &LinkConfig) -> Self {
        Self {
            first_byte: config.first_byte_timeout(),
            inter_byte: config.inter_byte_timeout(),
        }
    }
}

/// Cumulative link counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Frames written to the line
    pub tx_frames: u64,
    /// Bytes written, CRC included
    pub tx_bytes: u64,
    /// Valid responses received
    pub rx_frames: u64,
    /// Bytes captured, valid or not
    pub rx_bytes: u64,
    /// Receives that saw no byte at all
    pub timeouts: u64,
    /// Candidates rejected only for their CRC
    pub crc_errors: u64,
    /// Every other failed transaction
    pub other_errors: u64,
}

/// Modbus RTU master on a half-duplex line
pub struct RtuMaster {
    line: Box<dyn SerialLine>,
    direction: Box<dyn DirectionControl>,
    config: LinkConfig,
    buffer: ReceiveBuffer,
    /// Set only while the last receive succeeded
    bounds: Option<FrameBounds>,
    last_error: Option<FrameError>,
    stats: LinkStats,
}

impl RtuMaster {
    /// Wrap an existing line and direction control
    pub fn new(
        line: Box<dyn SerialLine>,
        direction: Box<dyn DirectionControl>,
        config: LinkConfig,
    ) -> Self {
        Self {
            line,
            direction,
            config,
            buffer: ReceiveBuffer::new(),
            bounds: None,
            last_error: None,
            stats: LinkStats::default(),
        }
    }

    /// Open the serial port described by `config`
    pub fn open(config: LinkConfig) -> Result<Self, ProtocolError> {
        let port = open_port(&config)?;
        let direction = direction_for(config.direction, port.as_ref())?;
        let line = SerialChannel::new(port);
        Ok(Self::new(Box::new(line), direction, config))
    }

    /// Link settings in use
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Counters since the master was created
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Guard interval in effect for this line
    pub fn guard(&self) -> Duration {
        match self.config.guard_interval_ms {
            Some(ms) => Duration::from_millis(ms),
            None => guard_interval(self.line.baud_rate()),
        }
    }

    // ---- transmit ----

    /// Transmit `packet`, optionally followed by its CRC.
    ///
    /// The driver-enable line is held for the guard interval on both sides of
    /// the write and is released even when the write fails.
    pub fn send(&mut self, packet: &[u8], append_crc: bool) -> Result<(), ProtocolError> {
        let mut frame = packet.to_vec();
        if append_crc {
            crc::append(&mut frame);
        }
        let guard = self.guard();

        if let Err(e) = self.line.clear_input() {
            warn!("could not clear stale input: {}", e);
        }

        debug!("tx {} bytes: {:02X?}", frame.len(), frame);
        self.direction.set_transmit(true)?;
        thread::sleep(guard);
        let written = self.line.write_all(&frame);
        thread::sleep(guard);
        let released = self.direction.set_transmit(false);
        written?;
        released?;

        self.stats.tx_frames = self.stats.tx_frames.saturating_add(1);
        self.stats.tx_bytes = self.stats.tx_bytes.saturating_add(frame.len() as u64);
        Ok(())
    }

    /// Transmit a read request
    pub fn send_read(&mut self, request: &ReadRequest) -> Result<(), ProtocolError> {
        self.send(&request.to_bytes(), true)
    }

    /// Request `count` coils from `start` (function 0x01)
    pub fn send_read_coils(&mut self, station: u8, start: u16, count: u16) -> Result<(), ProtocolError> {
        self.send_read(&ReadRequest::new(station, FunctionCode::ReadCoils, start, count))
    }

    /// Request `count` discrete inputs from `start` (function 0x02)
    pub fn send_read_discrete(&mut self, station: u8, start: u16, count: u16) -> Result<(), ProtocolError> {
        self.send_read(&ReadRequest::new(
            station,
            FunctionCode::ReadDiscreteInputs,
            start,
            count,
        ))
    }

    /// Request `count` holding registers from `start` (function 0x03)
    pub fn send_read_holding(&mut self, station: u8, start: u16, count: u16) -> Result<(), ProtocolError> {
        self.send_read(&ReadRequest::new(
            station,
            FunctionCode::ReadHoldingRegisters,
            start,
            count,
        ))
    }

    /// Request `count` input registers from `start` (function 0x04)
    pub fn send_read_input(&mut self, station: u8, start: u16, count: u16) -> Result<(), ProtocolError> {
        self.send_read(&ReadRequest::new(
            station,
            FunctionCode::ReadInputRegisters,
            start,
            count,
        ))
    }

    // ---- receive ----

    /// Capture and validate a response from `station` using the configured timeouts
    pub fn recv(&mut self, station: u8) -> Result<FrameBounds, FrameError> {
        let timeouts = RecvTimeouts::from_config(&self.config);
        self.recv_with(station, timeouts)
    }

    /// Capture and validate a response from `station`.
    ///
    /// Blocks for at most `first_byte` when nothing arrives, otherwise until
    /// the line has been silent for `inter_byte`.
    pub fn recv_with(&mut self, station: u8, timeouts: RecvTimeouts) -> Result<FrameBounds, FrameError> {
        self.buffer.reset();
        self.bounds = None;
        self.last_error = None;

        let result = self
            .capture(timeouts)
            .and_then(|()| parser::parse(self.buffer.as_slice(), station));

        self.stats.rx_bytes = self.stats.rx_bytes.saturating_add(self.buffer.len() as u64);
        match &result {
            Ok(bounds) => {
                debug!(
                    "rx frame from station {}: {:02X?}",
                    station,
                    bounds.frame(self.buffer.as_slice())
                );
                self.stats.rx_frames = self.stats.rx_frames.saturating_add(1);
                self.bounds = Some(*bounds);
            }
            Err(e) => {
                debug!(
                    "rx from station {} failed ({}), captured {:02X?}",
                    station,
                    e,
                    self.buffer.as_slice()
                );
                let counter = match e {
                    FrameError::Timeout => &mut self.stats.timeouts,
                    FrameError::CrcMismatch => &mut self.stats.crc_errors,
                    _ => &mut self.stats.other_errors,
                };
                *counter = counter.saturating_add(1);
                self.last_error = Some(e.clone());
            }
        }
        result
    }

    /// Fill the buffer until the line goes quiet
    fn capture(&mut self, timeouts: RecvTimeouts) -> Result<(), FrameError> {
        if !self.wait_for_data(timeouts.first_byte)? {
            return Err(FrameError::Timeout);
        }

        loop {
            while self.line.bytes_available()? > 0 {
                let byte = self.line.read_byte()?;
                if !self.buffer.push(byte) {
                    warn!(
                        "receive buffer full ({} bytes), dropping rest of response",
                        self.buffer.capacity()
                    );
                    if let Err(e) = self.line.clear_input() {
                        warn!("could not discard overflow: {}", e);
                    }
                    return Err(FrameError::Overflow {
                        capacity: self.buffer.capacity(),
                    });
                }
            }
            if !self.wait_for_data(timeouts.inter_byte)? {
                return Ok(());
            }
        }
    }

    /// Poll until input is queued or `timeout` elapses
    fn wait_for_data(&mut self, timeout: Duration) -> Result<bool, FrameError> {
        let start = Instant::now();
        loop {
            if self.line.bytes_available()? > 0 {
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            thread::sleep(self.config.poll_interval());
        }
    }

    // ---- state of the last transaction ----

    /// Error of the last receive or decode, `None` after a success
    pub fn last_error(&self) -> Option<&FrameError> {
        self.last_error.as_ref()
    }

    /// Numeric code of the last transaction (0 = no error)
    pub fn error_code(&self) -> u8 {
        self.last_error.as_ref().map_or(0, FrameError::code)
    }

    /// Text report of the last transaction
    pub fn error_report(&self) -> &'static str {
        self.last_error.as_ref().map_or("NONE", FrameError::report)
    }

    /// Number of bytes captured by the last receive
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Raw bytes captured by the last receive
    pub fn captured(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Bounds of the last valid frame
    pub fn bounds(&self) -> Option<FrameBounds> {
        self.bounds
    }

    /// Data region of the last valid frame
    pub fn data(&self) -> Option<&[u8]> {
        self.bounds.map(|b| b.data(self.buffer.as_slice()))
    }

    /// Whole last valid frame, address through CRC
    pub fn frame(&self) -> Option<&[u8]> {
        self.bounds.map(|b| b.frame(self.buffer.as_slice()))
    }

    /// Record a failure that happened outside `recv_with`.
    ///
    /// The previous frame stops being visible so that `data()` and `frame()`
    /// never outlive the transaction that produced them.
    fn fail(&mut self, error: FrameError) -> FrameError {
        debug!("transaction failed: {}", error);
        self.bounds = None;
        self.stats.other_errors = self.stats.other_errors.saturating_add(1);
        self.last_error = Some(error.clone());
        error
    }

    fn settle<T>(&mut self, result: Result<T, FrameError>) -> Result<T, FrameError> {
        result.map_err(|e| self.fail(e))
    }

    /// Transmit `request` for `read`/`query`; a transport failure ends the
    /// transaction with `FrameError::Io` and an empty capture.
    fn send_for_reply(&mut self, request: &ReadRequest) -> Result<(), FrameError> {
        self.send_read(request).map_err(|e| {
            self.buffer.reset();
            self.fail(FrameError::Io(e.to_string()))
        })
    }

    // ---- typed accessors ----

    fn recv_data(&mut self, station: u8) -> Result<&[u8], FrameError> {
        let bounds = self.recv(station)?;
        Ok(bounds.data(self.buffer.as_slice()))
    }

    /// Receive and return the first data byte
    pub fn recv_byte(&mut self, station: u8) -> Result<u8, FrameError> {
        let result = values::first_byte(self.recv_data(station)?);
        self.settle(result)
    }

    /// Receive and fold all data bytes big-endian into an integer
    pub fn recv_integer(&mut self, station: u8) -> Result<i64, FrameError> {
        Ok(values::fold_integer(self.recv_data(station)?))
    }

    /// Receive and reinterpret four data bytes as `f32` (native byte order)
    pub fn recv_float(&mut self, station: u8) -> Result<f32, FrameError> {
        let result = values::native_f32(self.recv_data(station)?);
        self.settle(result)
    }

    /// Receive and return the data bytes as text
    pub fn recv_text(&mut self, station: u8) -> Result<String, FrameError> {
        Ok(values::latin1_text(self.recv_data(station)?))
    }

    /// Receive and decode as `kind`
    pub fn recv_value(&mut self, station: u8, kind: ValueKind) -> Result<Value, FrameError> {
        let result = Value::decode(kind, self.recv_data(station)?);
        self.settle(result)
    }

    /// Send `request` and return the data region of the reply
    pub fn read(&mut self, request: &ReadRequest) -> Result<Vec<u8>, FrameError> {
        self.send_for_reply(request)?;
        self.recv_data(request.station).map(<[u8]>::to_vec)
    }

    /// Send `request` and decode the reply as `kind`
    pub fn query(&mut self, request: &ReadRequest, kind: ValueKind) -> Result<Value, FrameError> {
        self.send_for_reply(request)?;
        self.recv_value(request.station, kind)
    }
}
