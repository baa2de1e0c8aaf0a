//! # Sub-GHz Bridge Library
//!
//! Bridge a host computer to a CC1101-class sub-GHz radio over a line-based
//! serial protocol.
//!
//! The host sends bracketed commands (`<SET|868.0,x>`, `<DATA|...>`, ...) and
//! receives status lines back. Outbound payloads are queued and retried;
//! inbound packets are JSON documents validated with an additive checksum
//! before being forwarded to the host.

pub mod config;
pub mod error;
pub mod gateway;
pub mod host;
pub mod protocol;
pub mod queue;
pub mod radio;
