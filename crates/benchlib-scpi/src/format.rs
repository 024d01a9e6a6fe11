//! Formatting and parsing of SCPI argument values.

/// Format a numeric argument the way it goes on the wire.
///
/// Integral values drop the fractional part, everything else uses the
/// shortest representation that round-trips.
///
/// ```
/// use benchlib_scpi::format_value;
///
/// assert_eq!(format_value(5.0), "5");
/// assert_eq!(format_value(0.25), "0.25");
/// assert_eq!(format_value(-1.5), "-1.5");
/// ```
pub fn format_value(value: f64) -> String {
    format!("{value}")
}

/// `"ON"` or `"OFF"`.
pub fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

/// Parse a boolean reply.
///
/// Accepts `1`/`0` and `ON`/`OFF` in any case, ignoring surrounding
/// whitespace. Anything else is `None`.
pub fn parse_bool(reply: &str) -> Option<bool> {
    let reply = reply.trim();
    if reply == "1" || reply.eq_ignore_ascii_case("ON") {
        Some(true)
    } else if reply == "0" || reply.eq_ignore_ascii_case("OFF") {
        Some(false)
    } else {
        None
    }
}

/// Parse a hexadecimal status register reply such as `0x0010`.
///
/// The `0x` prefix is optional.
pub fn parse_hex_register(reply: &str) -> Option<u32> {
    let reply = reply.trim();
    let digits = reply
        .strip_prefix("0x")
        .or_else(|| reply.strip_prefix("0X"))
        .unwrap_or(reply);
    u32::from_str_radix(digits, 16).ok()
}
