//! Line decode/encode for SCPI-style instruments.
//!
//! Every command goes out terminated by `\n`. Responses are complete at the
//! first `\n`; some instruments send `\r\n`, so a trailing `\r` is dropped
//! from the decoded text.

/// The newline byte that terminates every command and response.
pub const TERMINATOR: u8 = b'\n';

/// Result of attempting to decode one response line from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    /// A complete line was decoded.
    Line {
        /// Line text without the terminator or a trailing carriage return.
        text: String,
        /// Number of bytes consumed from the input buffer.
        consumed: usize,
    },

    /// A complete line was found but it is not valid UTF-8. Carries the
    /// number of bytes to discard.
    Error(usize),

    /// The buffer does not yet contain a complete line. More data is needed.
    Incomplete,
}

/// Decode one `\n`-terminated line from a byte buffer.
///
/// Returns the first complete line found, or [`DecodeResult::Incomplete`]
/// if no terminator is present yet. Bytes after the terminator are left
/// for the next call.
pub fn decode_line(buf: &[u8]) -> DecodeResult {
    let term_pos = match buf.iter().position(|&b| b == TERMINATOR) {
        Some(pos) => pos,
        None => return DecodeResult::Incomplete,
    };

    let consumed = term_pos + 1;
    let body = match buf[..term_pos].last() {
        Some(b'\r') => &buf[..term_pos - 1],
        _ => &buf[..term_pos],
    };

    match std::str::from_utf8(body) {
        Ok(text) => DecodeResult::Line {
            text: text.to_string(),
            consumed,
        },
        Err(_) => DecodeResult::Error(consumed),
    }
}

/// Encode a command for the wire: the text followed by [`TERMINATOR`].
///
/// A terminator already present at the end of `command` is not doubled.
///
/// ```
/// use benchlib_scpi::protocol::encode_command;
///
/// assert_eq!(encode_command("*IDN?"), b"*IDN?\n");
/// assert_eq!(encode_command("OUTP ON\n"), b"OUTP ON\n");
/// ```
pub fn encode_command(command: &str) -> Vec<u8> {
    let trimmed = command.trim_end_matches(['\r', '\n']);
    let mut out = Vec::with_capacity(trimmed.len() + 1);
    out.extend_from_slice(trimmed.as_bytes());
    out.push(TERMINATOR);
    out
}

/// Whether `command` expects a response line.
///
/// ```
/// use benchlib_scpi::protocol::is_query;
///
/// assert!(is_query("MEAS:VOLT?"));
/// assert!(is_query("C1:PAVA? PKPK"));
/// assert!(!is_query("*RST"));
/// ```
pub fn is_query(command: &str) -> bool {
    command.contains('?')
}
