//! Link configuration
//!
//! Serial line settings and receive timing, loadable from a JSON file.
//! Every field has a default so partial files are accepted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::protocol::{
    ProtocolError, DEFAULT_BAUD_RATE, FIRST_BYTE_TIMEOUT_MS, INTER_BYTE_TIMEOUT_MS,
};

/// Parity setting of the serial line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    /// No parity bit
    #[default]
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

impl From<Parity> for serialport::Parity {
    fn from(p: Parity) -> Self {
        match p {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
        }
    }
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StopBits {
    /// One stop bit
    #[default]
    #[serde(rename = "1")]
    One,
    /// Two stop bits
    #[serde(rename = "2")]
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(s: StopBits) -> Self {
        match s {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// How the RS-485 transceiver's driver-enable line is operated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DirectionMode {
    /// Transceiver switches direction by itself
    #[default]
    Auto,
    /// RTS high while transmitting
    Rts,
    /// RTS low while transmitting
    RtsInverted,
}

/// Serial link configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial port name (e.g. "/dev/ttyUSB0" or "COM3")
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits per character (5..=8)
    pub data_bits: u8,
    /// Parity
    pub parity: Parity,
    /// Stop bits
    pub stop_bits: StopBits,
    /// Wait for the first response byte, in milliseconds
    pub first_byte_timeout_ms: u64,
    /// Line silence that ends a response, in milliseconds
    pub inter_byte_timeout_ms: u64,
    /// Sleep between polls of the input queue, in milliseconds
    pub poll_interval_ms: u64,
    /// Fixed guard interval around transmissions; derived from the baud rate when unset
    pub guard_interval_ms: Option<u64>,
    /// Direction control
    pub direction: DirectionMode,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: StopBits::One,
            first_byte_timeout_ms: FIRST_BYTE_TIMEOUT_MS,
            inter_byte_timeout_ms: INTER_BYTE_TIMEOUT_MS,
            poll_interval_ms: 1,
            guard_interval_ms: None,
            direction: DirectionMode::Auto,
        }
    }
}

impl LinkConfig {
    /// Default settings for the given port
    pub fn for_port(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Self::default()
        }
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self, ProtocolError> {
        let content = fs::read_to_string(path)?;
        let config: LinkConfig = serde_json::from_str(&content)
            .map_err(|e| ProtocolError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), ProtocolError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ProtocolError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the link cannot run with
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.baud_rate == 0 {
            return Err(ProtocolError::Config("baud_rate must be non-zero".into()));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(ProtocolError::Config(format!(
                "data_bits must be 5..=8, got {}",
                self.data_bits
            )));
        }
        if self.inter_byte_timeout_ms == 0 {
            return Err(ProtocolError::Config(
                "inter_byte_timeout_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// `first_byte_timeout_ms` as a duration
    pub fn first_byte_timeout(&self) -> Duration {
        Duration::from_millis(self.first_byte_timeout_ms)
    }

    /// `inter_byte_timeout_ms` as a duration
    pub fn inter_byte_timeout(&self) -> Duration {
        Duration::from_millis(self.inter_byte_timeout_ms)
    }

    /// `poll_interval_ms` as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub(crate) fn serial_data_bits(&self) -> serialport::DataBits {
        match self.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            _ => serialport::DataBits::Eight,
        }
    }
}
