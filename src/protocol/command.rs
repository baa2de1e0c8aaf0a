//! # Host Command Parser
//!
//! Turns one line of host input into a [`Command`].
//!
//! Commands are recognized strictly by prefix, first match wins, in this order:
//!
//! ```text
//! <SET|<freq>,...>              set operating frequency (MHz)
//! <TXMODE>                      switch to transmit mode
//! <RXMODE>                      switch to receive mode
//! <RX_READY>                    readiness query
//! <FILE|<name>|<total>|<size>>  announce a file transfer
//! <DATA|<payload>>              queue a payload for transmission
//! ```
//!
//! Anything else is [`Command::Unrecognized`]. Numeric arguments use lenient
//! leading-prefix conversion: text that is not a number reads as zero.

/// Frequency command prefix
pub const PREFIX_SET: &str = "<SET|";

/// Transmit mode command
pub const PREFIX_TXMODE: &str = "<TXMODE>";

/// Receive mode command
pub const PREFIX_RXMODE: &str = "<RXMODE>";

/// Readiness query
pub const PREFIX_RX_READY: &str = "<RX_READY>";

/// File announcement prefix
pub const PREFIX_FILE: &str = "<FILE|";

/// Data payload prefix
pub const PREFIX_DATA: &str = "<DATA|";

/// A parsed host command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `<SET|<freq>,...>`
    SetFrequency {
        /// Parsed frequency in MHz (0.0 if the field is not numeric)
        frequency_mhz: f32,
        /// Whether the whole field was a well-formed number
        exact: bool,
    },

    /// `<TXMODE>`
    EnterTxMode,

    /// `<RXMODE>`
    EnterRxMode,

    /// `<RX_READY>`
    RxReadyQuery,

    /// `<FILE|<name>|<total>|<size>>`
    FileStart {
        filename: String,
        total: i32,
        size: i32,
    },

    /// `<DATA|<payload>>`
    Data {
        payload: String,
    },

    /// Any line matching no known prefix
    Unrecognized,
}

impl Command {
    /// Parse a single line of host input
    ///
    /// # Arguments
    ///
    /// * `line` - One line of input without its trailing newline
    ///
    /// # Returns
    ///
    /// * `Command` - The recognized command, or `Command::Unrecognized`
    ///
    /// # Examples
    ///
    /// ```
    /// use subghz_bridge::protocol::command::Command;
    ///
    /// assert_eq!(Command::parse("<TXMODE>"), Command::EnterTxMode);
    /// assert_eq!(
    ///     Command::parse("<DATA|abc>"),
    ///     Command::Data { payload: "abc".to_string() }
    /// );
    /// assert_eq!(Command::parse("hello world"), Command::Unrecognized);
    /// ```
    pub fn parse(line: &str) -> Self {
        if let Some(rest) = line.strip_prefix(PREFIX_SET) {
            parse_set_frequency(rest)
        } else if line.starts_with(PREFIX_TXMODE) {
            Command::EnterTxMode
        } else if line.starts_with(PREFIX_RXMODE) {
            Command::EnterRxMode
        } else if line.starts_with(PREFIX_RX_READY) {
            Command::RxReadyQuery
        } else if let Some(rest) = line.strip_prefix(PREFIX_FILE) {
            parse_file_start(rest)
        } else if let Some(rest) = line.strip_prefix(PREFIX_DATA) {
            Command::Data {
                payload: until_close(rest).to_string(),
            }
        } else {
            Command::Unrecognized
        }
    }
}

/// Text up to (not including) the first `>`, or all of it
fn until_close(text: &str) -> &str {
    match text.find('>') {
        Some(end) => &text[..end],
        None => text,
    }
}

fn parse_set_frequency(rest: &str) -> Command {
    let field = match rest.find(',') {
        Some(end) => &rest[..end],
        None => rest.strip_suffix('>').unwrap_or(rest),
    };

    let (frequency_mhz, exact) = lenient_float(field);
    Command::SetFrequency {
        frequency_mhz,
        exact,
    }
}

fn parse_file_start(rest: &str) -> Command {
    let fields: Vec<&str> = until_close(rest).split('|').collect();

    let filename = fields[0].to_string();
    let total = fields.get(1).map(|f| lenient_int(f)).unwrap_or(0);
    // Size always comes from the last field, even when that is also the total
    let size = if fields.len() >= 2 {
        fields.last().map(|f| lenient_int(f)).unwrap_or(0)
    } else {
        0
    };

    Command::FileStart {
        filename,
        total,
        size,
    }
}

/// Length of the leading run of ASCII digits
fn digit_run(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Length of an optional leading sign
fn sign_len(bytes: &[u8]) -> usize {
    match bytes.first() {
        Some(b'+') | Some(b'-') => 1,
        _ => 0,
    }
}

/// Convert the leading integer of `text`, C `atol` style
///
/// Leading whitespace and a sign are accepted; conversion stops at the first
/// non-digit. No digits yields 0. Out-of-range values saturate.
pub fn lenient_int(text: &str) -> i32 {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();

    let sign = sign_len(bytes);
    let digits = digit_run(&bytes[sign..]);
    if digits == 0 {
        return 0;
    }

    let number = &trimmed[..sign + digits];
    match number.parse::<i64>() {
        Ok(value) => value.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        Err(_) if number.starts_with('-') => i32::MIN,
        Err(_) => i32::MAX,
    }
}

/// Convert the leading decimal number of `text`, C `atof` style
///
/// # Returns
///
/// * `(f32, bool)` - The converted value (0.0 if there is no number) and
///   whether the entire field, ignoring surrounding whitespace, was consumed
pub fn lenient_float(text: &str) -> (f32, bool) {
    let trimmed = text.trim();
    let bytes = trimmed.as_bytes();

    let mut end = sign_len(bytes);
    let int_digits = digit_run(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digit_run(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return (0.0, false);
    }

    // Exponent only counts if at least one digit follows it
    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let exp_start = end + 1;
        let exp_sign = sign_len(&bytes[exp_start..]);
        let exp_digits = digit_run(&bytes[exp_start + exp_sign..]);
        if exp_digits > 0 {
            end = exp_start + exp_sign + exp_digits;
        }
    }

    let value = trimmed[..end].parse::<f32>().unwrap_or(0.0);
    (value, end == trimmed.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_frequency() {
        assert_eq!(
            Command::parse("<SET|433.92,x>"),
            Command::SetFrequency {
                frequency_mhz: 433.92,
                exact: true
            }
        );
    }

    #[test]
    fn test_parse_set_frequency_without_comma() {
        assert_eq!(
            Command::parse("<SET|915>"),
            Command::SetFrequency {
                frequency_mhz: 915.0,
                exact: true
            }
        );
    }

    #[test]
    fn test_parse_set_frequency_non_numeric_reads_zero() {
        assert_eq!(
            Command::parse("<SET|abc,1>"),
            Command::SetFrequency {
                frequency_mhz: 0.0,
                exact: false
            }
        );
    }

    #[test]
    fn test_parse_set_frequency_trailing_garbage() {
        match Command::parse("<SET|868.3MHz,0>") {
            Command::SetFrequency {
                frequency_mhz,
                exact,
            } => {
                assert!((frequency_mhz - 868.3).abs() < 0.001);
                assert!(!exact);
            }
            other => panic!("Expected SetFrequency, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_mode_commands() {
        assert_eq!(Command::parse("<TXMODE>"), Command::EnterTxMode);
        assert_eq!(Command::parse("<RXMODE>"), Command::EnterRxMode);
        assert_eq!(Command::parse("<RX_READY>"), Command::RxReadyQuery);
    }

    #[test]
    fn test_parse_matches_by_prefix_only() {
        // Trailing text after a complete command is ignored
        assert_eq!(Command::parse("<TXMODE>junk"), Command::EnterTxMode);
        // Commands are case-sensitive
        assert_eq!(Command::parse("<txmode>"), Command::Unrecognized);
        // Leading whitespace defeats the prefix
        assert_eq!(Command::parse(" <TXMODE>"), Command::Unrecognized);
    }

    #[test]
    fn test_parse_file_start() {
        assert_eq!(
            Command::parse("<FILE|photo.jpg|12|4096>"),
            Command::FileStart {
                filename: "photo.jpg".to_string(),
                total: 12,
                size: 4096,
            }
        );
    }

    #[test]
    fn test_parse_file_start_missing_fields() {
        assert_eq!(
            Command::parse("<FILE|notes.txt>"),
            Command::FileStart {
                filename: "notes.txt".to_string(),
                total: 0,
                size: 0,
            }
        );
        assert_eq!(
            Command::parse("<FILE|a|x|y>"),
            Command::FileStart {
                filename: "a".to_string(),
                total: 0,
                size: 0,
            }
        );
    }

    #[test]
    fn test_parse_file_start_two_fields() {
        assert_eq!(
            Command::parse("<FILE|a.bin|3>"),
            Command::FileStart {
                filename: "a.bin".to_string(),
                total: 3,
                size: 3,
            }
        );
    }

    #[test]
    fn test_parse_file_start_extra_fields_use_last_for_size() {
        assert_eq!(
            Command::parse("<FILE|a.bin|3|ignored|512>"),
            Command::FileStart {
                filename: "a.bin".to_string(),
                total: 3,
                size: 512,
            }
        );
    }

    #[test]
    fn test_file_end_is_unrecognized() {
        assert_eq!(Command::parse("<FILE_END|photo.jpg>"), Command::Unrecognized);
    }

    #[test]
    fn test_parse_data_stops_at_first_close() {
        assert_eq!(
            Command::parse("<DATA|abc>"),
            Command::Data {
                payload: "abc".to_string()
            }
        );
        assert_eq!(
            Command::parse("<DATA|a>b>"),
            Command::Data {
                payload: "a".to_string()
            }
        );
        assert_eq!(
            Command::parse("<DATA|unterminated"),
            Command::Data {
                payload: "unterminated".to_string()
            }
        );
        assert_eq!(
            Command::parse("<DATA|>"),
            Command::Data {
                payload: String::new()
            }
        );
    }

    #[test]
    fn test_parse_unrecognized() {
        assert_eq!(Command::parse("hello world"), Command::Unrecognized);
        assert_eq!(Command::parse(""), Command::Unrecognized);
        assert_eq!(Command::parse("<SET"), Command::Unrecognized);
    }

    #[test]
    fn test_lenient_int() {
        assert_eq!(lenient_int("42"), 42);
        assert_eq!(lenient_int("  -7xyz"), -7);
        assert_eq!(lenient_int("+3"), 3);
        assert_eq!(lenient_int("abc"), 0);
        assert_eq!(lenient_int(""), 0);
        assert_eq!(lenient_int("99999999999"), i32::MAX);
    }

    #[test]
    fn test_lenient_float() {
        assert_eq!(lenient_float("433.92"), (433.92, true));
        assert_eq!(lenient_float(" 868 "), (868.0, true));
        assert_eq!(lenient_float(".5"), (0.5, true));
        assert_eq!(lenient_float("8.68e2"), (868.0, true));
        assert_eq!(lenient_float("1e"), (1.0, false));
        assert_eq!(lenient_float("-"), (0.0, false));
        assert_eq!(lenient_float("."), (0.0, false));
        assert_eq!(lenient_float(""), (0.0, false));
    }
}
