//! Serial port handling
//!
//! Port discovery and opening for RS-485 adapters.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use std::time::Duration;

use tracing::{debug, warn};

use super::ProtocolError;
use crate::config::LinkConfig;

/// Blocking read timeout of the port handle. Reads are only issued after
/// `bytes_to_read` reports data, so this just bounds a stalled driver.
const PORT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Manufacturer name (if available)
    pub manufacturer: Option<String>,

    /// Product name (if available)
    pub product: Option<String>,
}

impl PortInfo {
    fn bare(name: String) -> Self {
        Self {
            name,
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
        }
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb) => Self {
                name: info.port_name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                manufacturer: usb.manufacturer,
                product: usb.product,
            },
            _ => Self::bare(info.port_name),
        }
    }
}

/// Sort key: USB-serial bridges (ttyUSB*, where most RS-485 dongles
/// enumerate) first, then ttyACM*, then on-board UARTs (ttyS*, ttyAMA*),
/// then everything else by name. Numeric suffixes sort numerically.
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    let prefixes = ["ttyUSB", "ttyACM", "ttyS", "ttyAMA"];
    for (rank, prefix) in prefixes.iter().enumerate() {
        if let Some(rest) = basename.strip_prefix(prefix) {
            if let Ok(num) = rest.parse::<usize>() {
                return (rank.min(2) as u8, num, basename.to_string());
            }
        }
    }
    (3, 0, basename.to_string())
}

/// List serial ports, adding /dev entries the enumeration API missed
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    match serialport::available_ports() {
        Ok(ports) => {
            for info in ports {
                let p = PortInfo::from(info);
                map.entry(p.name.clone()).or_insert(p);
            }
        }
        Err(e) => warn!("serial port enumeration failed: {}", e),
    }

    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyUSB") || fname.starts_with("ttyACM") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone())
                        .or_insert_with(|| PortInfo::bare(full));
                }
            }
        }
    }

    let mut v: Vec<PortInfo> = map.into_values().collect();
    v.sort_by_key(|p| port_sort_key(&p.name));
    v
}

/// Open and configure the port named in `config`
pub fn open_port(config: &LinkConfig) -> Result<Box<dyn SerialPort>, ProtocolError> {
    if config.port_name.is_empty() {
        return Err(ProtocolError::Config("no serial port given".into()));
    }
    config.validate()?;

    debug!(
        port = %config.port_name,
        baud = config.baud_rate,
        "opening serial port"
    );
    let mut port = serialport::new(&config.port_name, config.baud_rate)
        .timeout(PORT_READ_TIMEOUT)
        .open()?;
    configure_port(port.as_mut(), config)?;
    clear_buffers(port.as_mut())?;
    Ok(port)
}

/// Apply framing settings from `config`; flow control is always off
pub fn configure_port(port: &mut dyn SerialPort, config: &LinkConfig) -> Result<(), ProtocolError> {
    port.set_data_bits(config.serial_data_bits())?;
    port.set_parity(config.parity.into())?;
    port.set_stop_bits(config.stop_bits.into())?;
    port.set_flow_control(serialport::FlowControl::None)?;
    Ok(())
}

/// Clear both directions of the port buffers
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.clear(serialport::ClearBuffer::All)?;
    Ok(())
}
