//! # Simulated Air Interface
//!
//! [`UdpRadio`] stands in for the CC1101 when no RF hardware is attached.
//! Every transmission becomes one UDP datagram sent to each configured peer:
//!
//! ```text
//! [frequency kHz: u32 BE][payload bytes]
//! ```
//!
//! A receiver only hears datagrams tagged with the frequency it is tuned to,
//! so two bridges must agree on `<SET|..>` just like real radios.

use async_trait::async_trait;
use bytes::{Buf, BufMut, BytesMut};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

use super::{Radio, RadioError, RadioSettings};
use crate::config::SimulationConfig;

/// Size of the frequency tag in front of every datagram
const FREQUENCY_TAG_LEN: usize = 4;

/// Receive buffer size (tag + largest payload)
const RECV_BUFFER_LEN: usize = FREQUENCY_TAG_LEN + super::CC1101_MAX_PACKET_LENGTH;

/// Simulated sub-GHz radio over UDP
pub struct UdpRadio {
    /// Socket, present once `begin` succeeded
    socket: Option<UdpSocket>,
    /// Local address to bind
    bind_addr: String,
    /// Addresses that "hear" our transmissions
    peers: Vec<SocketAddr>,
    /// Peer addresses as configured, resolved in `begin`
    peer_names: Vec<String>,
    /// Tuned frequency in kHz
    frequency_khz: u32,
    /// Probability that a transmission fails
    packet_loss: f32,
    /// Largest accepted payload in bytes
    max_payload_len: usize,
}

impl std::fmt::Debug for UdpRadio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpRadio")
            .field("bind_addr", &self.bind_addr)
            .field("peers", &self.peers)
            .field("frequency_khz", &self.frequency_khz)
            .finish_non_exhaustive()
    }
}

impl UdpRadio {
    /// Create an unstarted radio from the simulation settings
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            socket: None,
            bind_addr: config.bind.clone(),
            peers: Vec::new(),
            peer_names: config.peers.clone(),
            frequency_khz: 0,
            packet_loss: config.packet_loss,
            max_payload_len: config.max_payload_len,
        }
    }

    /// Local address of the bound socket, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Add a peer that will hear our transmissions
    pub fn add_peer(&mut self, peer: SocketAddr) {
        if !self.peers.contains(&peer) {
            self.peers.push(peer);
        }
    }

    fn socket(&self) -> Result<&UdpSocket, RadioError> {
        self.socket.as_ref().ok_or(RadioError::CHIP_NOT_FOUND)
    }

    /// Build the datagram for one payload
    fn encode_frame(&self, payload: &[u8]) -> BytesMut {
        let mut frame = BytesMut::with_capacity(FREQUENCY_TAG_LEN + payload.len());
        frame.put_u32(self.frequency_khz);
        frame.put_slice(payload);
        frame
    }
}

fn to_khz(frequency_mhz: f32) -> u32 {
    (frequency_mhz * 1000.0).round() as u32
}

#[async_trait]
impl Radio for UdpRadio {
    async fn begin(&mut self, settings: &RadioSettings) -> Result<(), RadioError> {
        settings.validate()?;

        let socket = UdpSocket::bind(self.bind_addr.as_str()).await.map_err(|e| {
            warn!("Failed to bind simulated radio to {}: {}", self.bind_addr, e);
            RadioError::CHIP_NOT_FOUND
        })?;

        for name in &self.peer_names {
            match name.parse::<SocketAddr>() {
                Ok(addr) if !self.peers.contains(&addr) => self.peers.push(addr),
                Ok(_) => {}
                Err(e) => warn!("Ignoring invalid peer address {}: {}", name, e),
            }
        }

        self.frequency_khz = to_khz(settings.frequency_mhz);
        debug!(
            "Simulated radio bound to {:?} at {} kHz with {} peer(s)",
            socket.local_addr().ok(),
            self.frequency_khz,
            self.peers.len()
        );
        self.socket = Some(socket);
        Ok(())
    }

    async fn set_frequency(&mut self, frequency_mhz: f32) -> Result<(), RadioError> {
        if !super::is_supported_frequency(frequency_mhz) {
            return Err(RadioError::INVALID_FREQUENCY);
        }

        self.frequency_khz = to_khz(frequency_mhz);
        debug!("Simulated radio tuned to {} kHz", self.frequency_khz);
        Ok(())
    }

    async fn transmit(&mut self, payload: &str, timeout: Duration) -> Result<(), RadioError> {
        let socket = self.socket()?;

        if payload.len() > self.max_payload_len {
            return Err(RadioError::PACKET_TOO_LONG);
        }

        if self.packet_loss > 0.0 && rand::random::<f32>() < self.packet_loss {
            debug!("Simulated transmission loss");
            return Err(RadioError::TX_TIMEOUT);
        }

        let frame = self.encode_frame(payload.as_bytes());

        for &peer in &self.peers {
            trace!("Sending {} byte datagram to {}", frame.len(), peer);

            match tokio::time::timeout(timeout, socket.send_to(&frame, peer)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    debug!("Datagram to {} failed: {}", peer, e);
                    return Err(RadioError::TX_TIMEOUT);
                }
                Err(_) => return Err(RadioError::TX_TIMEOUT),
            }
        }

        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Option<String>, RadioError> {
        let socket = self.socket()?;
        let mut buf = [0u8; RECV_BUFFER_LEN];

        let (n, src) = match tokio::time::timeout(timeout, socket.recv_from(&mut buf)).await {
            Ok(Ok(received)) => received,
            Ok(Err(e)) => {
                debug!("Simulated receive failed: {}", e);
                return Ok(None);
            }
            Err(_) => return Ok(None),
        };

        if n < FREQUENCY_TAG_LEN {
            trace!("Ignoring runt datagram ({} bytes) from {}", n, src);
            return Ok(None);
        }

        let mut frame = &buf[..n];
        let frequency_khz = frame.get_u32();
        if frequency_khz != self.frequency_khz {
            trace!(
                "Ignoring datagram from {} on {} kHz (tuned to {} kHz)",
                src,
                frequency_khz,
                self.frequency_khz
            );
            return Ok(None);
        }

        Ok(Some(String::from_utf8_lossy(frame).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_config() -> SimulationConfig {
        SimulationConfig {
            bind: "127.0.0.1:0".to_string(),
            peers: Vec::new(),
            packet_loss: 0.0,
            max_payload_len: 64,
        }
    }

    async fn started_pair() -> (UdpRadio, UdpRadio) {
        let settings = RadioSettings::default();
        let mut a = UdpRadio::new(&loopback_config());
        let mut b = UdpRadio::new(&loopback_config());
        a.begin(&settings).await.unwrap();
        b.begin(&settings).await.unwrap();
        a.add_peer(b.local_addr().unwrap());
        b.add_peer(a.local_addr().unwrap());
        (a, b)
    }

    #[test]
    fn test_frequency_conversion() {
        assert_eq!(to_khz(868.0), 868_000);
        assert_eq!(to_khz(433.92), 433_920);
    }

    #[tokio::test]
    async fn test_transmit_before_begin_fails() {
        let mut radio = UdpRadio::new(&loopback_config());
        let result = radio.transmit("abc", Duration::from_millis(10)).await;
        assert_eq!(result, Err(RadioError::CHIP_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_begin_rejects_invalid_settings() {
        let mut radio = UdpRadio::new(&loopback_config());
        let settings = RadioSettings {
            frequency_mhz: 100.0,
            ..RadioSettings::default()
        };
        assert_eq!(radio.begin(&settings).await, Err(RadioError::INVALID_FREQUENCY));
        assert!(radio.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_begin_with_unbindable_address_reports_chip_not_found() {
        let mut config = loopback_config();
        config.bind = "not-an-address".to_string();
        let mut radio = UdpRadio::new(&config);
        assert_eq!(
            radio.begin(&RadioSettings::default()).await,
            Err(RadioError::CHIP_NOT_FOUND)
        );
    }

    #[tokio::test]
    async fn test_payload_crosses_the_air() {
        let (mut a, mut b) = started_pair().await;

        a.transmit("hello", Duration::from_millis(100)).await.unwrap();
        let received = b.receive(Duration::from_millis(500)).await.unwrap();
        assert_eq!(received, Some("hello".to_string()));
    }

    #[tokio::test]
    async fn test_receive_times_out_quietly() {
        let (_a, mut b) = started_pair().await;
        let received = b.receive(Duration::from_millis(20)).await.unwrap();
        assert_eq!(received, None);
    }

    #[tokio::test]
    async fn test_different_frequency_is_not_heard() {
        let (mut a, mut b) = started_pair().await;
        a.set_frequency(433.92).await.unwrap();

        a.transmit("hello", Duration::from_millis(100)).await.unwrap();
        let received = b.receive(Duration::from_millis(200)).await.unwrap();
        assert_eq!(received, None);
    }

    #[tokio::test]
    async fn test_set_frequency_outside_bands() {
        let (mut a, _b) = started_pair().await;
        assert_eq!(a.set_frequency(0.0).await, Err(RadioError::INVALID_FREQUENCY));
    }

    #[tokio::test]
    async fn test_oversized_payload_is_rejected() {
        let (mut a, _b) = started_pair().await;
        let payload = "x".repeat(65);
        assert_eq!(
            a.transmit(&payload, Duration::from_millis(100)).await,
            Err(RadioError::PACKET_TOO_LONG)
        );
    }

    #[tokio::test]
    async fn test_total_packet_loss_fails_every_transmission() {
        let mut config = loopback_config();
        config.packet_loss = 1.0;
        let mut radio = UdpRadio::new(&config);
        radio.begin(&RadioSettings::default()).await.unwrap();

        for _ in 0..5 {
            assert_eq!(
                radio.transmit("abc", Duration::from_millis(10)).await,
                Err(RadioError::TX_TIMEOUT)
            );
        }
    }
}
