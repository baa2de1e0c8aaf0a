//! # Gateway
//!
//! The protocol engine: applies host commands, drives the radio in the
//! current mode and reports everything back to the host as status lines.
//!
//! ## Loop
//!
//! Each iteration of [`Gateway::step`] does, in order:
//!
//! 1. A non-blocking check for one host line, applied if present
//! 2. Exactly one radio operation:
//!    - [`Mode::Tx`]: attempt to transmit the head of the outbound queue
//!    - [`Mode::Rx`]: attempt one reception and decode what arrives
//!
//! ## Error Policy
//!
//! Nothing in here aborts the loop. Transmit failures are retried, bad
//! packets are dropped, and unrecognized lines are ignored. The only fatal
//! condition is a radio that fails to start, reported by [`Gateway::start`].

use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::host::HostLink;
use crate::protocol::{packet, Command, HostMessage};
use crate::queue::{Enqueued, OutboundQueue, TxOutcome};
use crate::radio::{Radio, RadioSettings};

/// Radio operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Drain the outbound queue
    #[default]
    Tx,
    /// Listen for inbound packets
    Rx,
}

/// Mode and frequency state mutated by host commands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadioState {
    pub mode: Mode,
    pub frequency_mhz: f32,
}

impl Default for RadioState {
    fn default() -> Self {
        Self {
            mode: Mode::Tx,
            frequency_mhz: RadioSettings::default().frequency_mhz,
        }
    }
}

/// What happened to one received payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxOutcome {
    /// Valid packet forwarded to the host
    Forwarded,
    /// Payload could not be decoded
    Malformed(packet::DecodeError),
    /// Declared checksum did not match the data
    ChecksumMismatch,
}

/// Loop timing and parsing options
#[derive(Debug, Clone, Copy)]
pub struct GatewayOptions {
    pub tx_timeout: Duration,
    pub rx_timeout: Duration,
    pub poll_interval: Duration,
    pub strict_frequency: bool,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            tx_timeout: Duration::from_millis(1000),
            rx_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(5),
            strict_frequency: false,
        }
    }
}

/// Serial-to-radio protocol engine
pub struct Gateway<R, H> {
    radio: R,
    host: H,
    queue: OutboundQueue,
    state: RadioState,
    settings: RadioSettings,
    options: GatewayOptions,
}

impl<R, H> std::fmt::Debug for Gateway<R, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("state", &self.state)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl<R: Radio, H: HostLink> Gateway<R, H> {
    /// Build a gateway from configuration
    pub fn from_config(radio: R, host: H, config: &Config) -> Self {
        let queue = OutboundQueue::new(
            config.queue.capacity,
            config.queue.overflow,
            config.queue.max_retries,
        );
        let options = GatewayOptions {
            tx_timeout: config.radio.tx_timeout(),
            rx_timeout: config.radio.rx_timeout(),
            poll_interval: Duration::from_millis(config.host.poll_interval_ms),
            strict_frequency: config.radio.strict_frequency,
        };

        Self::new(radio, host, queue, config.radio.settings(), options)
    }

    /// Build a gateway from its parts
    pub fn new(
        radio: R,
        host: H,
        queue: OutboundQueue,
        settings: RadioSettings,
        options: GatewayOptions,
    ) -> Self {
        Self {
            radio,
            host,
            queue,
            state: RadioState {
                mode: Mode::Tx,
                frequency_mhz: settings.frequency_mhz,
            },
            settings,
            options,
        }
    }

    /// Current mode and frequency
    pub fn state(&self) -> &RadioState {
        &self.state
    }

    /// Outbound queue
    pub fn queue(&self) -> &OutboundQueue {
        &self.queue
    }

    /// Bring the radio up
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::RadioInit` with the driver status code after
    /// reporting `<ERROR|RADIO_INIT_CODE:n>` to the host. The gateway must
    /// not be run after this.
    pub async fn start(&mut self) -> Result<()> {
        let settings = RadioSettings {
            frequency_mhz: self.state.frequency_mhz,
            ..self.settings
        };

        match self.radio.begin(&settings).await {
            Ok(()) => {
                info!(
                    "Radio started at {} MHz ({} kbps, {} kHz deviation, {} dBm)",
                    settings.frequency_mhz,
                    settings.bit_rate_kbps,
                    settings.frequency_deviation_khz,
                    settings.output_power_dbm
                );
                Ok(())
            }
            Err(e) => {
                error!("Radio failed to initialize: {}", e);
                self.emit(HostMessage::RadioInitFailed(e.code())).await;
                Err(BridgeError::RadioInit(e.code()))
            }
        }
    }

    /// Interpret one host line
    pub async fn handle_line(&mut self, line: &str) {
        let command = Command::parse(line);
        debug!("Host command: {:?}", command);
        self.apply(command).await;
    }

    /// Apply a parsed command
    pub async fn apply(&mut self, command: Command) {
        match command {
            Command::SetFrequency {
                frequency_mhz,
                exact,
            } => {
                if self.options.strict_frequency && !exact {
                    debug!("Ignoring malformed frequency command");
                    return;
                }

                self.state.frequency_mhz = frequency_mhz;
                if let Err(e) = self.radio.set_frequency(frequency_mhz).await {
                    warn!("Radio rejected frequency {} MHz: {}", frequency_mhz, e);
                }
                self.emit(HostMessage::FrequencySet).await;
            }
            Command::EnterTxMode => {
                self.state.mode = Mode::Tx;
                self.emit(HostMessage::TxMode).await;
            }
            Command::EnterRxMode => {
                self.state.mode = Mode::Rx;
                self.emit(HostMessage::RxMode).await;
            }
            Command::RxReadyQuery => {
                self.emit(HostMessage::RxReady).await;
            }
            Command::FileStart {
                filename,
                total,
                size,
            } => {
                info!("File transfer announced: {} ({} packets, {} bytes)", filename, total, size);
                self.emit(HostMessage::FileStart { filename, total }).await;
            }
            Command::Data { payload } => {
                if let Enqueued::DisplacedOldest(oldest) = self.queue.enqueue(payload) {
                    debug!("Displaced {} byte payload from the queue head", oldest.len());
                }
            }
            Command::Unrecognized => {
                trace!("Ignoring unrecognized host line");
            }
        }
    }

    /// Attempt one transmission from the outbound queue
    pub async fn try_transmit_one(&mut self) -> TxOutcome {
        let outcome = self
            .queue
            .try_transmit_one(&mut self.radio, self.options.tx_timeout)
            .await;

        match outcome {
            TxOutcome::Idle => {}
            TxOutcome::Success => self.emit(HostMessage::TxSuccess).await,
            TxOutcome::Retried | TxOutcome::Dropped => self.emit(HostMessage::TxFail).await,
        }

        outcome
    }

    /// Attempt one reception; `None` if nothing was received
    pub async fn try_receive_one(&mut self) -> Option<RxOutcome> {
        match self.radio.receive(self.options.rx_timeout).await {
            Ok(Some(raw)) => Some(self.on_received(&raw).await),
            Ok(None) => None,
            Err(e) => {
                debug!("Receive failed: {}", e);
                None
            }
        }
    }

    /// Decode, validate and forward one received payload
    pub async fn on_received(&mut self, raw: &str) -> RxOutcome {
        let packet = match packet::decode(raw) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("Dropping undecodable packet: {}", e);
                self.emit(HostMessage::JsonError(e.to_string())).await;
                return RxOutcome::Malformed(e);
            }
        };

        if !packet.checksum_valid() {
            debug!(
                "Dropping packet {}/{} of {}: checksum mismatch",
                packet.header.seq, packet.header.total, packet.header.filename
            );
            self.emit(HostMessage::ChecksumError).await;
            return RxOutcome::ChecksumMismatch;
        }

        debug!(
            "Received {} packet {}/{} of {}",
            packet.header.packet_type, packet.header.seq, packet.header.total, packet.header.filename
        );
        self.emit(HostMessage::Data(packet.to_json())).await;
        RxOutcome::Forwarded
    }

    /// Run one loop iteration
    ///
    /// # Returns
    ///
    /// * `bool` - Whether the iteration did any work
    pub async fn step(&mut self) -> bool {
        let mut busy = false;

        if let Some(line) = self.host.read_line() {
            self.handle_line(&line).await;
            busy = true;
        }

        match self.state.mode {
            Mode::Tx => {
                if self.try_transmit_one().await != TxOutcome::Idle {
                    busy = true;
                }
            }
            Mode::Rx => {
                if self.try_receive_one().await.is_some() {
                    busy = true;
                }
            }
        }

        busy
    }

    /// Run the loop forever
    ///
    /// Sleeps `poll_interval` after iterations that did nothing.
    pub async fn run(&mut self) {
        info!("Gateway running in {:?} mode at {} MHz", self.state.mode, self.state.frequency_mhz);

        loop {
            if !self.step().await {
                tokio::time::sleep(self.options.poll_interval).await;
            }
        }
    }

    async fn emit(&mut self, message: HostMessage) {
        let line = message.to_string();
        trace!("-> host: {}", line);

        if let Err(e) = self.host.write_line(&line).await {
            warn!("Failed to write to host: {}", e);
        }
    }
}
