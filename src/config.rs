//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{BridgeError, Result};
use crate::host::serial::HOST_BAUD_RATE;
use crate::queue::OverflowPolicy;
use crate::radio::{self, RadioSettings};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub radio: RadioConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Host link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HostConfig {
    /// Serial device path, `"auto"` or `"stdio"`
    #[serde(default = "default_host_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Buffered, unread input lines
    #[serde(default = "default_line_buffer")]
    pub line_buffer: usize,

    /// Sleep between idle loop iterations
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Radio configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RadioConfig {
    #[serde(default = "default_frequency_mhz")]
    pub frequency_mhz: f32,

    #[serde(default = "default_bit_rate_kbps")]
    pub bit_rate_kbps: f32,

    #[serde(default = "default_rx_bandwidth_khz")]
    pub rx_bandwidth_khz: f32,

    #[serde(default = "default_frequency_deviation_khz")]
    pub frequency_deviation_khz: f32,

    #[serde(default = "default_output_power_dbm")]
    pub output_power_dbm: i8,

    #[serde(default = "default_tx_timeout_ms")]
    pub tx_timeout_ms: u64,

    #[serde(default = "default_rx_timeout_ms")]
    pub rx_timeout_ms: u64,

    /// Ignore `<SET|..>` commands whose frequency is not a well-formed number
    #[serde(default)]
    pub strict_frequency: bool,
}

/// Outbound queue configuration
#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,

    #[serde(default)]
    pub overflow: OverflowPolicy,

    /// Retries per payload before it is dropped; absent means unbounded
    #[serde(default)]
    pub max_retries: Option<u32>,
}

/// Simulated air interface configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Local UDP address of this radio
    #[serde(default = "default_sim_bind")]
    pub bind: String,

    /// UDP addresses of the other radios
    #[serde(default = "default_sim_peers")]
    pub peers: Vec<String>,

    /// Probability (0.0-1.0) that a transmission fails
    #[serde(default)]
    pub packet_loss: f32,

    #[serde(default = "default_max_payload_len")]
    pub max_payload_len: usize,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files; empty logs to stderr
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_host_port() -> String { "auto".to_string() }
fn default_baud_rate() -> u32 { HOST_BAUD_RATE }
fn default_line_buffer() -> usize { 64 }
fn default_poll_interval_ms() -> u64 { 5 }

fn default_frequency_mhz() -> f32 { RadioSettings::default().frequency_mhz }
fn default_bit_rate_kbps() -> f32 { RadioSettings::default().bit_rate_kbps }
fn default_rx_bandwidth_khz() -> f32 { RadioSettings::default().rx_bandwidth_khz }
fn default_frequency_deviation_khz() -> f32 { RadioSettings::default().frequency_deviation_khz }
fn default_output_power_dbm() -> i8 { RadioSettings::default().output_power_dbm }
fn default_tx_timeout_ms() -> u64 { 1000 }
fn default_rx_timeout_ms() -> u64 { 500 }

fn default_queue_capacity() -> usize { 50 }

fn default_sim_bind() -> String { "127.0.0.1:47000".to_string() }
fn default_sim_peers() -> Vec<String> { vec!["127.0.0.1:47001".to_string()] }
fn default_max_payload_len() -> usize { 255 }

fn default_log_level() -> String { "info".to_string() }

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            port: default_host_port(),
            baud_rate: default_baud_rate(),
            line_buffer: default_line_buffer(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            frequency_mhz: default_frequency_mhz(),
            bit_rate_kbps: default_bit_rate_kbps(),
            rx_bandwidth_khz: default_rx_bandwidth_khz(),
            frequency_deviation_khz: default_frequency_deviation_khz(),
            output_power_dbm: default_output_power_dbm(),
            tx_timeout_ms: default_tx_timeout_ms(),
            rx_timeout_ms: default_rx_timeout_ms(),
            strict_frequency: false,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
            overflow: OverflowPolicy::default(),
            max_retries: None,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            bind: default_sim_bind(),
            peers: default_sim_peers(),
            packet_loss: 0.0,
            max_payload_len: default_max_payload_len(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

impl RadioConfig {
    /// Modem settings to bring the radio up with
    pub fn settings(&self) -> RadioSettings {
        RadioSettings {
            frequency_mhz: self.frequency_mhz,
            bit_rate_kbps: self.bit_rate_kbps,
            rx_bandwidth_khz: self.rx_bandwidth_khz,
            frequency_deviation_khz: self.frequency_deviation_khz,
            output_power_dbm: self.output_power_dbm,
        }
    }

    pub fn tx_timeout(&self) -> Duration {
        Duration::from_millis(self.tx_timeout_ms)
    }

    pub fn rx_timeout(&self) -> Duration {
        Duration::from_millis(self.rx_timeout_ms)
    }
}

fn invalid(message: impl std::fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use subghz_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Host link
        if self.host.port.is_empty() {
            return Err(invalid("host port cannot be empty"));
        }

        if ![9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600].contains(&self.host.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600",
            ));
        }

        if self.host.line_buffer == 0 || self.host.line_buffer > 4096 {
            return Err(invalid("line_buffer must be between 1 and 4096"));
        }

        if self.host.poll_interval_ms == 0 || self.host.poll_interval_ms > 1000 {
            return Err(invalid("poll_interval_ms must be between 1 and 1000"));
        }

        // Radio modem settings use the driver's own limits
        self.radio.settings().validate()?;

        if self.radio.tx_timeout_ms == 0 || self.radio.tx_timeout_ms > 60000 {
            return Err(invalid("tx_timeout_ms must be between 1 and 60000"));
        }

        if self.radio.rx_timeout_ms == 0 || self.radio.rx_timeout_ms > 60000 {
            return Err(invalid("rx_timeout_ms must be between 1 and 60000"));
        }

        // Queue
        if self.queue.capacity == 0 || self.queue.capacity > 10000 {
            return Err(invalid("queue capacity must be between 1 and 10000"));
        }

        // Simulation
        if self.simulation.bind.is_empty() {
            return Err(invalid("simulation bind address cannot be empty"));
        }

        if !(0.0..=1.0).contains(&self.simulation.packet_loss) {
            return Err(invalid("packet_loss must be between 0.0 and 1.0"));
        }

        if self.simulation.max_payload_len == 0
            || self.simulation.max_payload_len > radio::CC1101_MAX_PACKET_LENGTH
        {
            return Err(invalid(format!(
                "max_payload_len must be between 1 and {}",
                radio::CC1101_MAX_PACKET_LENGTH
            )));
        }

        // Logging
        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("log level must be one of: trace, debug, info, warn, error"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[host]
port = "/dev/ttyUSB1"

[radio]
frequency_mhz = 433.92
strict_frequency = true

[queue]
capacity = 10
overflow = "drop_oldest"
max_retries = 3

[simulation]
bind = "0.0.0.0:47010"
peers = ["192.168.1.20:47010"]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.host.port, "/dev/ttyUSB1");
        assert_eq!(config.host.baud_rate, 115200);
        assert_eq!(config.radio.frequency_mhz, 433.92);
        assert!(config.radio.strict_frequency);
        assert_eq!(config.queue.capacity, 10);
        assert_eq!(config.queue.overflow, OverflowPolicy::DropOldest);
        assert_eq!(config.queue.max_retries, Some(3));
        assert_eq!(config.simulation.peers, vec!["192.168.1.20:47010"]);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        use tempfile::NamedTempFile;

        let temp_file = NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.radio.frequency_mhz, 868.0);
        assert_eq!(config.queue.capacity, 50);
        assert_eq!(config.queue.max_retries, None);
    }

    #[test]
    fn test_partial_sections_fill_missing_fields() {
        let config: Config = toml::from_str(
            r#"
[radio]
output_power_dbm = 5

[logging]
log_dir = "/var/log/bridge"
"#,
        )
        .unwrap();

        assert_eq!(config.radio.output_power_dbm, 5);
        assert_eq!(config.radio.frequency_mhz, 868.0);
        assert_eq!(config.radio.bit_rate_kbps, 1.2);
        assert_eq!(config.radio.tx_timeout_ms, 1000);
        assert!(!config.radio.strict_frequency);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.log_dir, "/var/log/bridge");
        assert_eq!(config.host.baud_rate, HOST_BAUD_RATE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        match Config::load("/nonexistent/bridge.toml") {
            Err(BridgeError::Io(_)) => {}
            other => panic!("Expected Io error, got: {:?}", other),
        }
    }

    #[test]
    fn test_load_invalid_toml() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[queue]\ncapacity = \"many\"\n").unwrap();
        temp_file.flush().unwrap();

        match Config::load(temp_file.path()) {
            Err(BridgeError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    #[test]
    fn test_empty_host_port() {
        let mut config = Config::default();
        config.host.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.host.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &[9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600] {
            let mut config = Config::default();
            config.host.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_line_buffer_zero() {
        let mut config = Config::default();
        config.host.line_buffer = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_out_of_range() {
        let mut config = Config::default();
        config.host.poll_interval_ms = 0;
        assert!(config.validate().is_err());
        config.host.poll_interval_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frequency_outside_bands() {
        let mut config = Config::default();
        config.radio.frequency_mhz = 2400.0;
        match config.validate() {
            Err(BridgeError::Radio(e)) => assert_eq!(e, radio::RadioError::INVALID_FREQUENCY),
            other => panic!("Expected Radio error, got: {:?}", other),
        }
    }

    #[test]
    fn test_output_power_not_supported() {
        let mut config = Config::default();
        config.radio.output_power_dbm = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeouts_out_of_range() {
        let mut config = Config::default();
        config.radio.tx_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.radio.rx_timeout_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_queue_capacity_zero() {
        let mut config = Config::default();
        config.queue.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_packet_loss_out_of_range() {
        let mut config = Config::default();
        config.simulation.packet_loss = 1.5;
        assert!(config.validate().is_err());
        config.simulation.packet_loss = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_payload_len_too_large() {
        let mut config = Config::default();
        config.simulation.max_payload_len = 256;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_durations() {
        let config = Config::default();
        assert_eq!(config.radio.tx_timeout(), Duration::from_millis(1000));
        assert_eq!(config.radio.rx_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_host_port(), "auto");
        assert_eq!(default_baud_rate(), 115200);
        assert_eq!(default_baud_rate(), HOST_BAUD_RATE);
        assert_eq!(default_frequency_mhz(), 868.0);
        assert_eq!(default_output_power_dbm(), 10);
        assert_eq!(default_line_buffer(), 64);
        assert_eq!(default_poll_interval_ms(), 5);
        assert_eq!(default_tx_timeout_ms(), 1000);
        assert_eq!(default_rx_timeout_ms(), 500);
        assert_eq!(default_queue_capacity(), 50);
        assert_eq!(default_sim_bind(), "127.0.0.1:47000");
        assert_eq!(default_sim_peers(), vec!["127.0.0.1:47001"]);
        assert_eq!(default_max_payload_len(), 255);
        assert_eq!(default_log_level(), "info");
    }
}
