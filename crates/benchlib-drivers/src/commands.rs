//! Command builders and reply parsers shared by several drivers.
//!
//! All functions are pure: they build command strings or interpret reply
//! text without performing any I/O. The drivers send the commands through
//! their [`Instrument`](benchlib_core::Instrument).
//!
//! Three command dialects are covered:
//!
//! - the SCPI electronic-load subset shared by the Siglent SDL and the
//!   Keithley 2380 (`FUNC`, `CURR`, `POW`, `RES`, `VOLT`, `MEAS:...?`);
//! - the LeCroy-style scope dialect spoken by both the Siglent SDS and the
//!   LeCroy HDO (`C<n>:TRA`, `C<n>:VDIV`, `TDIV`, `C<n>:PAVA?`);
//! - the `CONF` function selection of SCPI multimeters.

use benchlib_core::{ChannelId, Error, HDiv, LoadMode, MeasureType, Result, Stats, VDiv};
use benchlib_scpi::{format_value, on_off};

/// Error for a measurement an instrument cannot make.
pub fn unsupported_measurement(model: &str, kind: MeasureType) -> Error {
    Error::InvalidParameter(format!("{model} cannot measure {kind}"))
}

// ---------------------------------------------------------------
// Electronic load
// ---------------------------------------------------------------

/// SCPI keyword of a load regulation mode, as used by `FUNC` and the level
/// commands.
pub fn load_mode_keyword(mode: LoadMode) -> &'static str {
    match mode {
        LoadMode::ConstantCurrent => "CURR",
        LoadMode::ConstantPower => "POW",
        LoadMode::ConstantResistance => "RES",
        LoadMode::ConstantVoltage => "VOLT",
    }
}

/// `FUNC <mode>`.
pub fn cmd_load_mode(mode: LoadMode) -> String {
    format!("FUNC {}", load_mode_keyword(mode))
}

/// `<mode> <value>`: the level of the given mode.
pub fn cmd_load_level(mode: LoadMode, value: f64) -> String {
    format!("{} {}", load_mode_keyword(mode), format_value(value))
}

/// `<mode>?`: read back the level of the given mode.
pub fn cmd_read_load_level(mode: LoadMode) -> String {
    format!("{}?", load_mode_keyword(mode))
}

/// Interpret a `FUNC?` reply.
///
/// Loads answer with abbreviations of varying length (`CURR`, `CURRENT`,
/// `POW`, `RESISTANCE`), so the reply is matched by keyword prefix.
pub fn parse_load_mode(reply: &str) -> Result<LoadMode> {
    let reply = reply.trim().to_uppercase();
    if reply.contains("CUR") {
        Ok(LoadMode::ConstantCurrent)
    } else if reply.contains("POW") {
        Ok(LoadMode::ConstantPower)
    } else if reply.contains("RES") {
        Ok(LoadMode::ConstantResistance)
    } else if reply.contains("VOLT") {
        Ok(LoadMode::ConstantVoltage)
    } else {
        Err(Error::Protocol(format!("unrecognised load mode {reply:?}")))
    }
}

/// `MEAS:<quantity>?` for the DC quantities a load reads back.
pub fn cmd_load_measure(model: &str, kind: MeasureType) -> Result<&'static str> {
    match kind {
        MeasureType::Voltage => Ok("MEAS:VOLT?"),
        MeasureType::Current => Ok("MEAS:CURR?"),
        MeasureType::Power => Ok("MEAS:POW?"),
        other => Err(unsupported_measurement(model, other)),
    }
}

/// Slew rate in A/us from a rate in A/ms.
pub fn amps_per_us(amps_per_ms: f64) -> f64 {
    amps_per_ms / 1000.0
}

/// Slew rate in A/ms from a rate in A/us.
pub fn amps_per_ms(amps_per_us: f64) -> f64 {
    amps_per_us * 1000.0
}

// ---------------------------------------------------------------
// Oscilloscope
// ---------------------------------------------------------------

/// `C<n>:TRA ON|OFF`.
pub fn cmd_trace(channel: ChannelId, visible: bool) -> String {
    format!("C{}:TRA {}", channel.number(), on_off(visible))
}

/// `C<n>:OFST <volts>`.
pub fn cmd_vertical_offset(channel: ChannelId, volts: f64) -> String {
    format!("C{}:OFST {}", channel.number(), format_value(volts))
}

/// `C<n>:VDIV <scale>`.
pub fn cmd_vertical_scale(channel: ChannelId, scale: VDiv) -> String {
    format!("C{}:VDIV {}", channel.number(), scale.as_scpi())
}

/// `TDIV <scale>`.
pub fn cmd_horizontal_scale(scale: HDiv) -> String {
    format!("TDIV {}", scale.as_scpi())
}

/// `C<n>:PAVA? <stat>`.
pub fn cmd_parameter_value(channel: ChannelId, stat: Stats) -> String {
    format!("C{}:PAVA? {}", channel.number(), stat.keyword())
}

// ---------------------------------------------------------------
// SCPI multimeter
// ---------------------------------------------------------------

/// `CONF:...` command selecting a measurement function, with autorange.
pub fn cmd_meter_configure(model: &str, kind: MeasureType) -> Result<&'static str> {
    match kind {
        MeasureType::Voltage => Ok("CONF:VOLT:DC AUTO"),
        MeasureType::VoltageAc => Ok("CONF:VOLT:AC AUTO"),
        MeasureType::Current => Ok("CONF:CURR:DC AUTO"),
        MeasureType::CurrentAc => Ok("CONF:CURR:AC AUTO"),
        MeasureType::Resistance => Ok("CONF:RES AUTO"),
        MeasureType::Resistance4W => Ok("CONF:FRES AUTO"),
        MeasureType::Capacitance => Ok("CONF:CAP AUTO"),
        MeasureType::Frequency => Ok("CONF:FREQ"),
        other => Err(unsupported_measurement(model, other)),
    }
}

/// Interpret a `CONF?` reply such as `"VOLT:AC 2.000000E+00,1.000000E-06"`.
pub fn parse_meter_configuration(reply: &str) -> Result<MeasureType> {
    let function = reply
        .trim()
        .trim_matches('"')
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_uppercase();

    match function.as_str() {
        "VOLT:AC" => Ok(MeasureType::VoltageAc),
        "VOLT" | "VOLT:DC" => Ok(MeasureType::Voltage),
        "CURR:AC" => Ok(MeasureType::CurrentAc),
        "CURR" | "CURR:DC" => Ok(MeasureType::Current),
        "RES" => Ok(MeasureType::Resistance),
        "FRES" => Ok(MeasureType::Resistance4W),
        "CAP" => Ok(MeasureType::Capacitance),
        "FREQ" => Ok(MeasureType::Frequency),
        _ => Err(Error::Protocol(format!(
            "unrecognised meter configuration {reply:?}"
        ))),
    }
}
