//! SCPI line framing and command helpers shared by benchlib transports and
//! drivers.
//!
//! SCPI-style instruments speak newline-terminated ASCII. A command that
//! contains `?` expects exactly one response line; anything else is
//! fire-and-forget.
//!
//! # Architecture
//!
//! - [`protocol`]: decode/encode for `\n`-terminated lines
//! - [`format`]: numeric and keyword formatting for command arguments

pub mod format;
pub mod protocol;

pub use format::{format_value, on_off, parse_bool, parse_hex_register};
pub use protocol::{decode_line, encode_command, is_query, DecodeResult, TERMINATOR};
