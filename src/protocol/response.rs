//! # Host Output Lines
//!
//! Every line the bridge writes back to the host.

use std::fmt;

/// A status, data or error line sent to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    /// `<STATUS|FREQ_SET>`
    FrequencySet,

    /// `<STATUS|TX_MODE>`
    TxMode,

    /// `<STATUS|RX_MODE>`
    RxMode,

    /// `<STATUS|RX_READY>`
    RxReady,

    /// `<STATUS|FILE_START|<name>|<total>>`
    FileStart { filename: String, total: i32 },

    /// `<STATUS|TX_SUCCESS>`
    TxSuccess,

    /// `<STATUS|TX_FAIL>`
    TxFail,

    /// `<STATUS|CHECKSUM_ERR>`
    ChecksumError,

    /// `<DATA|<serialized-packet>>`
    Data(String),

    /// `<ERROR|RADIO_INIT_CODE:<n>>`
    RadioInitFailed(i16),

    /// `<ERROR|JSON:<message>>`
    JsonError(String),
}

impl fmt::Display for HostMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostMessage::FrequencySet => write!(f, "<STATUS|FREQ_SET>"),
            HostMessage::TxMode => write!(f, "<STATUS|TX_MODE>"),
            HostMessage::RxMode => write!(f, "<STATUS|RX_MODE>"),
            HostMessage::RxReady => write!(f, "<STATUS|RX_READY>"),
            HostMessage::FileStart { filename, total } => {
                write!(f, "<STATUS|FILE_START|{}|{}>", filename, total)
            }
            HostMessage::TxSuccess => write!(f, "<STATUS|TX_SUCCESS>"),
            HostMessage::TxFail => write!(f, "<STATUS|TX_FAIL>"),
            HostMessage::ChecksumError => write!(f, "<STATUS|CHECKSUM_ERR>"),
            HostMessage::Data(serialized) => write!(f, "<DATA|{}>", serialized),
            HostMessage::RadioInitFailed(code) => write!(f, "<ERROR|RADIO_INIT_CODE:{}>", code),
            HostMessage::JsonError(message) => write!(f, "<ERROR|JSON:{}>", message),
        }
    }
}
