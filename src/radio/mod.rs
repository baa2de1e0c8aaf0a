//! # Radio Module
//!
//! Capability interface of the sub-GHz transceiver the bridge drives.
//!
//! This module handles:
//! - The async [`Radio`] trait (begin, set frequency, transmit, receive)
//! - Driver status codes as [`RadioError`]
//! - CC1101 modem settings and their supported ranges
//! - A UDP-backed simulated air interface ([`udp::UdpRadio`])

pub mod udp;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// CC1101 hardware FIFO-limited packet length
pub const CC1101_MAX_PACKET_LENGTH: usize = 255;

/// CC1101 supported frequency bands in MHz (inclusive)
pub const CC1101_BANDS_MHZ: &[(f32, f32)] = &[(300.0, 348.0), (387.0, 464.0), (779.0, 928.0)];

/// Supported output power levels in dBm
pub const CC1101_OUTPUT_POWER_LEVELS: &[i8] = &[-30, -20, -15, -10, 0, 5, 7, 10];

/// Radio driver status code
///
/// Uses the CC1101 driver numbering: negative values are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{} (code {})", describe(.0), .0)]
pub struct RadioError(pub i16);

impl RadioError {
    pub const CHIP_NOT_FOUND: Self = Self(-2);
    pub const PACKET_TOO_LONG: Self = Self(-4);
    pub const TX_TIMEOUT: Self = Self(-5);
    pub const INVALID_FREQUENCY: Self = Self(-12);
    pub const INVALID_OUTPUT_POWER: Self = Self(-13);
    pub const INVALID_BIT_RATE: Self = Self(-101);
    pub const INVALID_RX_BANDWIDTH: Self = Self(-102);
    pub const INVALID_FREQUENCY_DEVIATION: Self = Self(-103);

    /// Numeric status code reported to the host
    pub fn code(&self) -> i16 {
        self.0
    }
}

fn describe(code: &i16) -> &'static str {
    match *code {
        -2 => "chip not found",
        -4 => "packet too long",
        -5 => "transmit timeout",
        -12 => "invalid frequency",
        -13 => "invalid output power",
        -101 => "invalid bit rate",
        -102 => "invalid receiver bandwidth",
        -103 => "invalid frequency deviation",
        _ => "radio failure",
    }
}

/// Modem settings applied when the radio is brought up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadioSettings {
    /// Carrier frequency in MHz
    pub frequency_mhz: f32,

    /// Bit rate in kbps
    pub bit_rate_kbps: f32,

    /// Receiver bandwidth in kHz
    pub rx_bandwidth_khz: f32,

    /// FSK frequency deviation in kHz
    pub frequency_deviation_khz: f32,

    /// Output power in dBm
    pub output_power_dbm: i8,
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            frequency_mhz: 868.0,
            bit_rate_kbps: 1.2,
            rx_bandwidth_khz: 58.0,
            frequency_deviation_khz: 5.0,
            output_power_dbm: 10,
        }
    }
}

impl RadioSettings {
    /// Check every setting against the CC1101 limits
    ///
    /// # Errors
    ///
    /// Returns the driver status code of the first out-of-range setting
    pub fn validate(&self) -> Result<(), RadioError> {
        if !is_supported_frequency(self.frequency_mhz) {
            return Err(RadioError::INVALID_FREQUENCY);
        }

        if !(0.025..=600.0).contains(&self.bit_rate_kbps) {
            return Err(RadioError::INVALID_BIT_RATE);
        }

        if !(58.0..=812.0).contains(&self.rx_bandwidth_khz) {
            return Err(RadioError::INVALID_RX_BANDWIDTH);
        }

        if !(1.587..=380.8).contains(&self.frequency_deviation_khz) {
            return Err(RadioError::INVALID_FREQUENCY_DEVIATION);
        }

        if !CC1101_OUTPUT_POWER_LEVELS.contains(&self.output_power_dbm) {
            return Err(RadioError::INVALID_OUTPUT_POWER);
        }

        Ok(())
    }
}

/// Whether `frequency_mhz` falls inside one of the CC1101 bands
pub fn is_supported_frequency(frequency_mhz: f32) -> bool {
    CC1101_BANDS_MHZ
        .iter()
        .any(|&(low, high)| (low..=high).contains(&frequency_mhz))
}

/// Sub-GHz transceiver capability
///
/// Transmit and receive take an explicit timeout; the gateway loop never
/// blocks longer than the timeout it passes in.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Radio: Send {
    /// Initialize the transceiver with the given modem settings
    async fn begin(&mut self, settings: &RadioSettings) -> Result<(), RadioError>;

    /// Retune to a new carrier frequency
    async fn set_frequency(&mut self, frequency_mhz: f32) -> Result<(), RadioError>;

    /// Transmit one payload
    async fn transmit(&mut self, payload: &str, timeout: Duration) -> Result<(), RadioError>;

    /// Wait up to `timeout` for one payload; `Ok(None)` if nothing arrived
    async fn receive(&mut self, timeout: Duration) -> Result<Option<String>, RadioError>;
}
