//! # Host Serial Port
//!
//! Opens the link to the host computer.
//!
//! This module handles:
//! - Opening the configured serial device at 115,200 baud (8N1)
//! - Auto-detecting common USB serial device paths
//! - Falling back to stdin/stdout for local use

use tokio::io::{ReadHalf, WriteHalf};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use super::{HostLink, LineLink};
use crate::config::HostConfig;
use crate::error::{BridgeError, Result};

/// Default host baud rate
pub const HOST_BAUD_RATE: u32 = 115_200;

/// `port` value selecting stdin/stdout
pub const PORT_STDIO: &str = "stdio";

/// `port` value selecting device auto-detection
pub const PORT_AUTO: &str = "auto";

/// Default device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters (CP210x, CH340)
    "/dev/ttyACM0", // USB CDC devices
];

/// Line link over the host serial port
pub type SerialLink = LineLink<WriteHalf<SerialStream>>;

/// Open the host link described by the configuration
///
/// # Returns
///
/// * `Result<Box<dyn HostLink>>` - Serial or stdio link
///
/// # Errors
///
/// Returns error if no serial device could be opened
pub fn open_host_link(config: &HostConfig) -> Result<Box<dyn HostLink>> {
    match config.port.as_str() {
        PORT_STDIO => {
            info!("Using stdin/stdout as host link");
            Ok(Box::new(LineLink::new(
                tokio::io::stdin(),
                tokio::io::stdout(),
                config.line_buffer,
            )))
        }
        PORT_AUTO => Ok(Box::new(open_serial_with_paths(
            DEFAULT_DEVICE_PATHS,
            config.baud_rate,
            config.line_buffer,
        )?)),
        port => Ok(Box::new(open_serial_with_paths(
            &[port],
            config.baud_rate,
            config.line_buffer,
        )?)),
    }
}

/// Open the first serial device that succeeds
///
/// # Arguments
///
/// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
/// * `baud_rate` - Line speed
/// * `line_buffer` - Buffered input lines
///
/// # Returns
///
/// * `Result<SerialLink>` - Connected link or error
pub fn open_serial_with_paths(paths: &[&str], baud_rate: u32, line_buffer: usize) -> Result<SerialLink> {
    for path in paths {
        debug!("Trying to open serial port: {}", path);

        match open_port(path, baud_rate) {
            Ok(port) => {
                info!("Opened host serial port {} at {} baud", path, baud_rate);
                let (reader, writer): (ReadHalf<SerialStream>, WriteHalf<SerialStream>) =
                    tokio::io::split(port);
                return Ok(LineLink::new(reader, writer, line_buffer));
            }
            Err(e) => {
                warn!("Failed to open {}: {}", path, e);
                continue;
            }
        }
    }

    Err(BridgeError::SerialPortNotFound(paths.join(", ")))
}

/// Open a specific serial port with 8N1 settings
fn open_port(path: &str, baud_rate: u32) -> Result<SerialStream> {
    let port = tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| BridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

    Ok(port)
}
