//! # Payload Checksum
//!
//! Additive 8-bit checksum carried in the `checksum` field of every
//! over-the-air packet.
//!
//! **Algorithm**: running sum of all payload bytes, wrapping at 256
//! **Initial Value**: 0x00
//! **Wire form**: hex text, at most 2 digits

/// Calculate the additive checksum of a payload
///
/// The sum is reduced modulo 256 after every byte, so the result is
/// identical to a C `uint8_t` accumulator regardless of payload length.
///
/// # Arguments
///
/// * `payload` - Bytes to checksum (the packet's `data` field)
///
/// # Returns
///
/// * `u8` - Calculated checksum
///
/// # Examples
///
/// ```
/// use subghz_bridge::protocol::checksum::checksum;
///
/// assert_eq!(checksum(b""), 0x00);
/// assert_eq!(checksum(b"abc"), 0x26);
/// ```
pub fn checksum(payload: &[u8]) -> u8 {
    let mut sum: u8 = 0;

    for &byte in payload {
        sum = sum.wrapping_add(byte);
    }

    sum
}

/// Format a checksum the way senders put it on the wire (2 lowercase hex digits)
pub fn format_checksum(sum: u8) -> String {
    format!("{:02x}", sum)
}

/// Compare a declared checksum field against a computed checksum
///
/// The declared field must be one or two hex digits in either case. The
/// unpadded form (`"a"` for 0x0A) is accepted because Arduino-style
/// senders print hex without leading zeros.
///
/// # Arguments
///
/// * `declared` - Checksum text from the packet header (already truncated)
/// * `computed` - Checksum calculated over the received data
///
/// # Returns
///
/// * `bool` - `true` if the declared value equals `computed`
pub fn checksum_matches(declared: &str, computed: u8) -> bool {
    if declared.is_empty() || declared.len() > 2 {
        return false;
    }

    if !declared.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }

    match u8::from_str_radix(declared, 16) {
        Ok(value) => value == computed,
        Err(_) => false,
    }
}
