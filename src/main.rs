//! # Sub-GHz Bridge
//!
//! Relay file-transfer packets between a host computer and a sub-GHz radio.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first argument, else `config/default.toml`)
//!    - Set up logging to stderr, or to a daily log file
//!    - Open the host link and bring the radio up
//!
//! 2. **Main Loop**
//!    - Run the gateway until Ctrl+C
//!
//! 3. **Radio Failure**
//!    - Report `<ERROR|RADIO_INIT_CODE:n>` to the host and halt until Ctrl+C
//!
//! Logs never go to stdout, which carries the protocol when `port = "stdio"`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use subghz_bridge::config::{Config, LoggingConfig};
use subghz_bridge::gateway::Gateway;
use subghz_bridge::host::serial::open_host_link;
use subghz_bridge::radio::udp::UdpRadio;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Log file name prefix inside `log_dir`
const LOG_FILE_PREFIX: &str = "subghz-bridge.log";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path(std::env::args().nth(1));
    let config = match &config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    let _guard = init_logging(&config.logging)?;

    info!("Sub-GHz Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    let host = open_host_link(&config.host).context("Failed to open host link")?;
    let radio = UdpRadio::new(&config.simulation);
    let mut gateway = Gateway::from_config(radio, host, &config);

    if let Err(e) = gateway.start().await {
        error!("{}; halting until Ctrl+C", e);
        tokio::signal::ctrl_c().await?;
        return Err(e.into());
    }

    info!("Press Ctrl+C to exit");

    tokio::select! {
        _ = gateway.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}

/// Pick the configuration file to load, if any
fn config_path(arg: Option<String>) -> Option<PathBuf> {
    match arg {
        Some(path) => Some(PathBuf::from(path)),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            default.exists().then(|| default.to_path_buf())
        }
    }
}

/// Install the tracing subscriber
///
/// `RUST_LOG` directives take precedence over the configured level. The
/// returned guard must be held for the file writer to flush.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid log filter")?;

    if config.log_dir.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    }

    let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(Some(guard))
}
