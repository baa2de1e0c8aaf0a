//! # Host/Air Protocol Module
//!
//! Line protocol spoken with the host and the packet format carried over the air.
//!
//! This module handles:
//! - Host command parsing (`<SET|..>`, `<TXMODE>`, `<DATA|..>`, ...)
//! - Host status/data/error line formatting
//! - Inbound packet decoding with bounded header fields
//! - Additive 8-bit payload checksum

pub mod checksum;
pub mod command;
pub mod packet;
pub mod response;

pub use command::Command;
pub use packet::{DecodeError, Packet, PacketHeader};
pub use response::HostMessage;
