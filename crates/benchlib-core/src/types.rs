//! Core types used throughout benchlib.
//!
//! These types provide a vendor-agnostic vocabulary for bench instruments:
//! which category an instrument belongs to, which channel a call targets,
//! what a meter or load should measure, and how a scope is scaled.

use std::fmt;
use std::str::FromStr;

/// High-level instrument contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Programmable DC power supply.
    PowerSupply,
    /// Electronic load.
    Load,
    /// Oscilloscope.
    Scope,
    /// Digital multimeter.
    Meter,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::PowerSupply => "Power Supply",
            Category::Load => "Electronic Load",
            Category::Scope => "Oscilloscope",
            Category::Meter => "Digital Multimeter",
        };
        write!(f, "{s}")
    }
}

/// Error returned when a string cannot be parsed into a [`Category`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCategoryError(String);

impl fmt::Display for ParseCategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown instrument category: {}", self.0)
    }
}

impl std::error::Error for ParseCategoryError {}

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().replace([' ', '_', '-'], "").as_str() {
            "PSU" | "POWERSUPPLY" => Ok(Category::PowerSupply),
            "LOAD" | "ELOAD" | "ELECTRONICLOAD" => Ok(Category::Load),
            "SCOPE" | "OSCILLOSCOPE" => Ok(Category::Scope),
            "DMM" | "METER" | "MULTIMETER" | "DIGITALMULTIMETER" => Ok(Category::Meter),
            _ => Err(ParseCategoryError(s.to_string())),
        }
    }
}

/// Instrument channel identifier.
///
/// Channels are numbered from 1 as printed on the front panel. The
/// numeric value is what most SCPI dialects embed in their commands
/// (`CH1:VOLT`, `C2:TRA ON`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u8);

impl ChannelId {
    pub const CH1: ChannelId = ChannelId(1);
    pub const CH2: ChannelId = ChannelId(2);
    pub const CH3: ChannelId = ChannelId(3);
    pub const CH4: ChannelId = ChannelId(4);
    pub const CH5: ChannelId = ChannelId(5);
    pub const CH6: ChannelId = ChannelId(6);
    pub const CH7: ChannelId = ChannelId(7);
    pub const CH8: ChannelId = ChannelId(8);

    /// Create a channel from its front-panel number.
    ///
    /// Returns `None` for 0, which no instrument uses.
    pub fn new(number: u8) -> Option<Self> {
        (number > 0).then_some(ChannelId(number))
    }

    /// Return the front-panel channel number.
    pub fn number(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{}", self.0)
    }
}

/// How the instrument is physically reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportKind {
    Gpib,
    Usb,
    /// LAN instrument; the locator is a bare host that gets wrapped.
    Ethernet,
    Rs232,
    /// A fully-formed locator that is used as given.
    #[default]
    Raw,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportKind::Gpib => "GPIB",
            TransportKind::Usb => "USB",
            TransportKind::Ethernet => "ETHERNET",
            TransportKind::Rs232 => "RS232",
            TransportKind::Raw => "RAW",
        };
        write!(f, "{s}")
    }
}

/// Error returned when a string cannot be parsed into a [`TransportKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTransportKindError(String);

impl fmt::Display for ParseTransportKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown transport kind: {}", self.0)
    }
}

impl std::error::Error for ParseTransportKindError {}

impl FromStr for TransportKind {
    type Err = ParseTransportKindError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GPIB" => Ok(TransportKind::Gpib),
            "USB" => Ok(TransportKind::Usb),
            "ETHERNET" | "LAN" | "TCPIP" => Ok(TransportKind::Ethernet),
            "RS232" | "SERIAL" => Ok(TransportKind::Rs232),
            "RAW" => Ok(TransportKind::Raw),
            _ => Err(ParseTransportKindError(s.to_string())),
        }
    }
}

/// Direction of a single command exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadWrite {
    /// Send the command and read one response line.
    Read,
    /// Send the command without reading.
    Write,
    /// Decide from the command text: anything containing `?` is a query.
    #[default]
    Auto,
}

impl ReadWrite {
    /// Resolve [`ReadWrite::Auto`] against the command text.
    ///
    /// ```
    /// use benchlib_core::ReadWrite;
    ///
    /// assert_eq!(ReadWrite::Auto.resolve("MEAS:VOLT?"), ReadWrite::Read);
    /// assert_eq!(ReadWrite::Auto.resolve("OUTP ON"), ReadWrite::Write);
    /// assert_eq!(ReadWrite::Write.resolve("*OPC?"), ReadWrite::Write);
    /// ```
    pub fn resolve(self, command: &str) -> ReadWrite {
        match self {
            ReadWrite::Auto if command.contains('?') => ReadWrite::Read,
            ReadWrite::Auto => ReadWrite::Write,
            explicit => explicit,
        }
    }
}

/// On/off state of an output or feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    On,
    Off,
}

impl State {
    /// Whether the state is [`State::On`].
    pub fn is_on(&self) -> bool {
        matches!(self, State::On)
    }

    /// The opposite state.
    pub fn toggled(&self) -> State {
        match self {
            State::On => State::Off,
            State::Off => State::On,
        }
    }
}

impl From<bool> for State {
    fn from(on: bool) -> Self {
        if on {
            State::On
        } else {
            State::Off
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::On => write!(f, "ON"),
            State::Off => write!(f, "OFF"),
        }
    }
}

/// Quantity to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasureType {
    /// DC voltage.
    Voltage,
    /// DC current.
    Current,
    /// DC power.
    Power,
    VoltageAc,
    CurrentAc,
    PowerAc,
    /// Two-wire resistance.
    Resistance,
    /// Four-wire resistance.
    Resistance4W,
    Capacitance,
    Frequency,
}

impl MeasureType {
    /// SI unit symbol for readings of this type.
    pub fn unit(&self) -> &'static str {
        match self {
            MeasureType::Voltage => "V",
            MeasureType::Current => "A",
            MeasureType::Power | MeasureType::PowerAc => "W",
            MeasureType::VoltageAc => "Vrms",
            MeasureType::CurrentAc => "Arms",
            MeasureType::Resistance | MeasureType::Resistance4W => "Ohm",
            MeasureType::Capacitance => "F",
            MeasureType::Frequency => "Hz",
        }
    }
}

impl fmt::Display for MeasureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MeasureType::Voltage => "VOLTAGE",
            MeasureType::Current => "CURRENT",
            MeasureType::Power => "POWER",
            MeasureType::VoltageAc => "VOLTAGE_AC",
            MeasureType::CurrentAc => "CURRENT_AC",
            MeasureType::PowerAc => "POWER_AC",
            MeasureType::Resistance => "RESISTANCE",
            MeasureType::Resistance4W => "RESISTANCE_4W",
            MeasureType::Capacitance => "CAPACITANCE",
            MeasureType::Frequency => "FREQUENCY",
        };
        write!(f, "{s}")
    }
}

/// Regulation mode of an electronic load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadMode {
    /// Constant current (CC). Level in amps.
    ConstantCurrent,
    /// Constant power (CP). Level in watts.
    ConstantPower,
    /// Constant resistance (CR). Level in ohms.
    ConstantResistance,
    /// Constant voltage (CV). Level in volts.
    ConstantVoltage,
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadMode::ConstantCurrent => "CC",
            LoadMode::ConstantPower => "CP",
            LoadMode::ConstantResistance => "CR",
            LoadMode::ConstantVoltage => "CV",
        };
        write!(f, "{s}")
    }
}

/// Current slew rate request for an electronic load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlewRate {
    /// The fastest rate the device supports.
    Fastest,
    /// The slowest rate the device supports.
    Slowest,
    /// A specific rate in amps per millisecond.
    Custom(f64),
}

/// Oscilloscope vertical scale (volts per division).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VDiv {
    Uv500,
    Mv1,
    Mv2,
    Mv5,
    Mv10,
    Mv20,
    Mv50,
    Mv100,
    Mv200,
    Mv500,
    V1,
    V2,
    V5,
    V10,
}

impl VDiv {
    /// Scale in SCPI numeric notation, as sent to the instrument.
    pub fn as_scpi(&self) -> &'static str {
        match self {
            VDiv::Uv500 => "500e-6",
            VDiv::Mv1 => "1e-3",
            VDiv::Mv2 => "2e-3",
            VDiv::Mv5 => "5e-3",
            VDiv::Mv10 => "10e-3",
            VDiv::Mv20 => "20e-3",
            VDiv::Mv50 => "50e-3",
            VDiv::Mv100 => "100e-3",
            VDiv::Mv200 => "200e-3",
            VDiv::Mv500 => "500e-3",
            VDiv::V1 => "1",
            VDiv::V2 => "2",
            VDiv::V5 => "5",
            VDiv::V10 => "10",
        }
    }

    /// Scale in volts per division.
    pub fn volts(&self) -> f64 {
        self.as_scpi().parse().unwrap_or_default()
    }
}

impl fmt::Display for VDiv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_scpi())
    }
}

/// Oscilloscope horizontal scale (seconds per division).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HDiv {
    Ns1,
    Ns2,
    Ns5,
    Ns10,
    Ns20,
    Ns50,
    Ns100,
    Ns200,
    Ns500,
    Us1,
    Us2,
    Us5,
    Us10,
    Us20,
    Us50,
    Us100,
    Us200,
    Us500,
    Ms1,
    Ms2,
    Ms5,
    Ms10,
    Ms20,
    Ms50,
    Ms100,
    Ms200,
    Ms500,
    S1,
    S2,
    S5,
    S10,
    S20,
    S50,
}

impl HDiv {
    /// Scale in SCPI numeric notation, as sent to the instrument.
    pub fn as_scpi(&self) -> &'static str {
        match self {
            HDiv::Ns1 => "1e-9",
            HDiv::Ns2 => "2e-9",
            HDiv::Ns5 => "5e-9",
            HDiv::Ns10 => "10e-9",
            HDiv::Ns20 => "20e-9",
            HDiv::Ns50 => "50e-9",
            HDiv::Ns100 => "100e-9",
            HDiv::Ns200 => "200e-9",
            HDiv::Ns500 => "500e-9",
            HDiv::Us1 => "1e-6",
            HDiv::Us2 => "2e-6",
            HDiv::Us5 => "5e-6",
            HDiv::Us10 => "10e-6",
            HDiv::Us20 => "20e-6",
            HDiv::Us50 => "50e-6",
            HDiv::Us100 => "100e-6",
            HDiv::Us200 => "200e-6",
            HDiv::Us500 => "500e-6",
            HDiv::Ms1 => "1e-3",
            HDiv::Ms2 => "2e-3",
            HDiv::Ms5 => "5e-3",
            HDiv::Ms10 => "10e-3",
            HDiv::Ms20 => "20e-3",
            HDiv::Ms50 => "50e-3",
            HDiv::Ms100 => "100e-3",
            HDiv::Ms200 => "200e-3",
            HDiv::Ms500 => "500e-3",
            HDiv::S1 => "1",
            HDiv::S2 => "2",
            HDiv::S5 => "5",
            HDiv::S10 => "10",
            HDiv::S20 => "20",
            HDiv::S50 => "50",
        }
    }

    /// Scale in seconds per division.
    pub fn seconds(&self) -> f64 {
        self.as_scpi().parse().unwrap_or_default()
    }
}

impl fmt::Display for HDiv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_scpi())
    }
}

/// Waveform statistic an oscilloscope can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stats {
    PeakToPeak,
    Max,
    Min,
    Amplitude,
    Top,
    Base,
    Mean,
    Rms,
    Period,
    Frequency,
    RiseTime,
    FallTime,
    DutyCycle,
    WidthAtLevel,
}

impl Stats {
    /// Parameter keyword used by `PAVA?`-style queries.
    pub fn keyword(&self) -> &'static str {
        match self {
            Stats::PeakToPeak => "PKPK",
            Stats::Max => "MAX",
            Stats::Min => "MIN",
            Stats::Amplitude => "AMPL",
            Stats::Top => "TOP",
            Stats::Base => "BASE",
            Stats::Mean => "MEAN",
            Stats::Rms => "RMS",
            Stats::Period => "PER",
            Stats::Frequency => "FREQ",
            Stats::RiseTime => "RISE",
            Stats::FallTime => "FALL",
            Stats::DutyCycle => "DUTY",
            Stats::WidthAtLevel => "WIDLV",
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// Outcome of an optional feature.
///
/// Drivers that do not implement remote sense, over-voltage protection,
/// slew control and the like report [`Support::Unsupported`] instead of
/// failing, and callers decide whether that matters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Support<T> {
    /// The feature ran; carries its result.
    Supported(T),
    /// The instrument has no such feature.
    Unsupported,
}

impl<T> Support<T> {
    pub fn is_supported(&self) -> bool {
        matches!(self, Support::Supported(_))
    }

    /// Convert into an `Option`, discarding the unsupported case.
    pub fn supported(self) -> Option<T> {
        match self {
            Support::Supported(v) => Some(v),
            Support::Unsupported => None,
        }
    }
}
