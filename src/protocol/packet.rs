//! # Inbound Packet Decoder
//!
//! Decodes received over-the-air payloads into a [`Packet`].
//!
//! A payload is a JSON object with the keys `type`, `seq`, `total`,
//! `filename`, `checksum`, `data_len` and `data`. The `checksum` field is the
//! hex form of [`checksum`](super::checksum::checksum) over `data`.

use serde_json::{Deserializer, Map, Value};
use thiserror::Error;
use tracing::debug;

use super::checksum::{checksum, checksum_matches};

/// Maximum stored length of the `type` field
pub const PACKET_TYPE_MAX_LEN: usize = 7;

/// Maximum stored length of the `filename` field
pub const PACKET_FILENAME_MAX_LEN: usize = 31;

/// Stored length of the `checksum` field
pub const PACKET_CHECKSUM_LEN: usize = 2;

/// Reasons a received payload could not be decoded
///
/// The `Display` form is a short code that is safe to embed in an
/// `<ERROR|JSON:...>` host line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Payload was empty or whitespace
    #[error("EmptyInput")]
    EmptyInput,

    /// Payload ended in the middle of a document
    #[error("IncompleteInput")]
    IncompleteInput,

    /// Payload is not valid JSON
    #[error("InvalidInput")]
    InvalidInput,

    /// Payload is valid JSON but not an object
    #[error("NotAnObject")]
    NotAnObject,

    /// A required key is absent
    #[error("MissingField:{0}")]
    MissingField(&'static str),

    /// A required key has the wrong type or is out of range
    #[error("InvalidField:{0}")]
    InvalidField(&'static str),
}

/// Header fields of a received packet
///
/// String fields are bounded copies: longer values are silently truncated
/// to the fixed maximum lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketHeader {
    /// Packet type tag (e.g. `START`, `DATA`), at most 7 characters
    pub packet_type: String,

    /// Sequence number
    pub seq: u16,

    /// Total packet count of the transfer
    pub total: u16,

    /// File name, at most 31 characters
    pub filename: String,

    /// Declared checksum, at most 2 characters
    pub checksum: String,

    /// Declared payload length in bytes
    pub data_len: usize,
}

/// A decoded packet: bounded header, data field and the full parsed document
#[derive(Debug, Clone)]
pub struct Packet {
    pub header: PacketHeader,
    pub data: String,
    document: Value,
}

impl Packet {
    /// Whether the declared checksum matches the checksum of `data`
    pub fn checksum_valid(&self) -> bool {
        checksum_matches(&self.header.checksum, checksum(self.data.as_bytes()))
    }

    /// Re-serialize the complete parsed document, input key order kept
    pub fn to_json(&self) -> String {
        self.document.to_string()
    }
}

/// Decode a raw received payload
///
/// # Arguments
///
/// * `raw` - Payload text as delivered by the radio
///
/// # Returns
///
/// * `Result<Packet, DecodeError>` - Decoded packet, or why it was rejected
///
/// # Errors
///
/// Returns error if:
/// - The payload is empty, truncated or not JSON
/// - The document is not an object
/// - A required key is missing or has the wrong type
///
/// # Examples
///
/// ```
/// use subghz_bridge::protocol::packet::decode;
///
/// let raw = r#"{"type":"DATA","seq":1,"total":1,"filename":"a.txt","checksum":"14","data_len":5,"data":"hello"}"#;
/// let packet = decode(raw).unwrap();
/// assert_eq!(packet.header.seq, 1);
/// assert!(packet.checksum_valid());
/// ```
pub fn decode(raw: &str) -> Result<Packet, DecodeError> {
    if raw.trim().is_empty() {
        return Err(DecodeError::EmptyInput);
    }

    // Only the first complete value counts; radio padding after it is ignored
    let document: Value = match Deserializer::from_str(raw).into_iter::<Value>().next() {
        Some(Ok(document)) => document,
        Some(Err(e)) if e.is_eof() => return Err(DecodeError::IncompleteInput),
        Some(Err(_)) => return Err(DecodeError::InvalidInput),
        None => return Err(DecodeError::EmptyInput),
    };

    let object = document.as_object().ok_or(DecodeError::NotAnObject)?;

    let header = PacketHeader {
        packet_type: bounded(str_field(object, "type")?, PACKET_TYPE_MAX_LEN),
        seq: u16_field(object, "seq")?,
        total: u16_field(object, "total")?,
        filename: bounded(str_field(object, "filename")?, PACKET_FILENAME_MAX_LEN),
        checksum: bounded(str_field(object, "checksum")?, PACKET_CHECKSUM_LEN),
        data_len: usize_field(object, "data_len")?,
    };
    let data = str_field(object, "data")?.to_string();

    if header.data_len != data.len() {
        debug!(
            "Packet {}/{} declares data_len {} but carries {} bytes",
            header.seq,
            header.total,
            header.data_len,
            data.len()
        );
    }

    Ok(Packet {
        header,
        data,
        document,
    })
}

/// Copy at most `max_chars` characters of `value`
fn bounded(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

fn field<'a>(object: &'a Map<String, Value>, key: &'static str) -> Result<&'a Value, DecodeError> {
    object.get(key).ok_or(DecodeError::MissingField(key))
}

fn str_field<'a>(object: &'a Map<String, Value>, key: &'static str) -> Result<&'a str, DecodeError> {
    field(object, key)?
        .as_str()
        .ok_or(DecodeError::InvalidField(key))
}

fn u16_field(object: &Map<String, Value>, key: &'static str) -> Result<u16, DecodeError> {
    field(object, key)?
        .as_u64()
        .and_then(|v| u16::try_from(v).ok())
        .ok_or(DecodeError::InvalidField(key))
}

fn usize_field(object: &Map<String, Value>, key: &'static str) -> Result<usize, DecodeError> {
    field(object, key)?
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or(DecodeError::InvalidField(key))
}
