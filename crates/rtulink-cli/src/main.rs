//! rtulink command-line poller
//!
//! Lists serial ports or performs one Modbus RTU read and prints the result.
//!
//! Usage:
//!   rtulink ports
//!   rtulink read --port /dev/ttyUSB0 --station 1 --kind holding --start 0 --count 2 --as int

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rtulink_core::config::{DirectionMode, LinkConfig};
use rtulink_core::protocol::{list_ports, FunctionCode, ReadRequest, RtuMaster, ValueKind};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Modbus RTU master for RS-485 serial lines
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Log protocol traffic (repeat for parser traces)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available serial ports
    Ports,
    /// Read from one station and print the value
    Read(ReadArgs),
    /// Print the effective link configuration as JSON
    ShowConfig(LinkArgs),
}

#[derive(Args, Debug)]
struct LinkArgs {
    /// JSON link configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Drive RTS as the transceiver's driver-enable line
    #[arg(long, value_enum)]
    direction: Option<Direction>,

    /// Wait for the first response byte (ms)
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Args, Debug)]
struct ReadArgs {
    #[command(flatten)]
    link: LinkArgs,

    /// Station address
    #[arg(short, long)]
    station: u8,

    /// Table to read
    #[arg(short, long, value_enum, default_value = "holding")]
    kind: Table,

    /// First register / coil address
    #[arg(long, default_value_t = 0)]
    start: u16,

    /// Number of registers / coils
    #[arg(short, long, default_value_t = 1)]
    count: u16,

    /// How to present the data
    #[arg(long = "as", value_enum, default_value = "raw")]
    format: Format,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Table {
    Coils,
    Discrete,
    Holding,
    Input,
}

impl From<Table> for FunctionCode {
    fn from(t: Table) -> Self {
        match t {
            Table::Coils => FunctionCode::ReadCoils,
            Table::Discrete => FunctionCode::ReadDiscreteInputs,
            Table::Holding => FunctionCode::ReadHoldingRegisters,
            Table::Input => FunctionCode::ReadInputRegisters,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Raw,
    Byte,
    Int,
    Float,
    Text,
}

impl From<Format> for ValueKind {
    fn from(f: Format) -> Self {
        match f {
            Format::Raw => ValueKind::Raw,
            Format::Byte => ValueKind::Byte,
            Format::Int => ValueKind::Integer,
            Format::Float => ValueKind::Float,
            Format::Text => ValueKind::Text,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Direction {
    Auto,
    Rts,
    RtsInverted,
}

impl From<Direction> for DirectionMode {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Auto => DirectionMode::Auto,
            Direction::Rts => DirectionMode::Rts,
            Direction::RtsInverted => DirectionMode::RtsInverted,
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "rtulink_core=debug,info",
        _ => "rtulink_core=trace,debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file (or defaults) with command-line overrides applied
fn link_config(args: &LinkArgs) -> Result<LinkConfig> {
    let mut config = match &args.config {
        Some(path) => LinkConfig::load(path)
            .with_context(|| format!("loading link configuration {}", path.display()))?,
        None => LinkConfig::default(),
    };
    if let Some(port) = &args.port {
        config.port_name = port.clone();
    }
    if let Some(baud) = args.baud {
        config.baud_rate = baud;
    }
    if let Some(direction) = args.direction {
        config.direction = direction.into();
    }
    if let Some(timeout) = args.timeout {
        config.first_byte_timeout_ms = timeout;
    }
    config.validate()?;
    Ok(config)
}

fn run_ports() {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No serial ports found");
        return;
    }
    for port in ports {
        match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => println!(
                "{}  [{:04x}:{:04x}] {}",
                port.name,
                vid,
                pid,
                port.product.as_deref().unwrap_or("")
            ),
            _ => println!("{}", port.name),
        }
    }
}

fn run_read(args: &ReadArgs) -> Result<()> {
    let config = link_config(&args.link)?;
    if config.port_name.is_empty() {
        bail!("no serial port given (use --port or a config file)");
    }

    let request = ReadRequest::new(args.station, args.kind.into(), args.start, args.count);
    info!(
        "{} @ {} baud: station {} {:?} start={} count={}",
        config.port_name, config.baud_rate, request.station, request.function, request.start, request.count
    );

    let mut master = RtuMaster::open(config)
        .context("opening serial port (check that it exists and you are in the dialout group)")?;
    debug!("guard interval {}ms", master.guard().as_millis());

    match master.query(&request, args.format.into()) {
        Ok(value) => {
            println!("{}", value);
            Ok(())
        }
        Err(e) => {
            if !master.captured().is_empty() {
                debug!("captured {:02X?}", master.captured());
            }
            bail!("{} ({})", e.report(), e)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Ports => run_ports(),
        Command::Read(args) => run_read(args)?,
        Command::ShowConfig(args) => {
            let config = link_config(args)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
