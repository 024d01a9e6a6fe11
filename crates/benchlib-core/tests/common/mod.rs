//! Minimal SCPI drivers and fixtures shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;

use benchlib_core::*;
use benchlib_test_harness::{backends_with, MockBackend, MockTransport};

pub const PSU: InstrumentDescriptor = InstrumentDescriptor {
    category: Category::PowerSupply,
    manufacturer: "Acme",
    model: "PS2",
    id_command: "*IDN?",
    channels: &[ChannelId::CH1, ChannelId::CH2],
};

pub const LOAD: InstrumentDescriptor = InstrumentDescriptor {
    category: Category::Load,
    manufacturer: "Acme",
    model: "EL2",
    id_command: "*IDN?",
    channels: &[ChannelId::CH1, ChannelId::CH2],
};

pub const SCOPE: InstrumentDescriptor = InstrumentDescriptor {
    category: Category::Scope,
    manufacturer: "Acme",
    model: "SC4",
    id_command: "*IDN?",
    channels: &[ChannelId::CH1, ChannelId::CH2, ChannelId::CH3, ChannelId::CH4],
};

pub const METER: InstrumentDescriptor = InstrumentDescriptor {
    category: Category::Meter,
    manufacturer: "Acme",
    model: "DM1",
    id_command: "ID?",
    channels: &[ChannelId::CH1],
};

/// Open a connection over `mock` and wrap it as `descriptor`'s instrument.
pub async fn instrument_on(mock: &MockTransport, descriptor: InstrumentDescriptor) -> Instrument {
    let backend = MockBackend::with_transport("mock", mock.clone());
    let connection = Connection::open(
        EndpointSpec::new("TCPIP::bench::INSTR", TransportKind::Raw),
        backends_with(&backend),
        RetryPolicy::default(),
    )
    .await
    .unwrap();
    Instrument::new(connection, descriptor.name(), descriptor)
}

pub fn registry() -> Registry {
    let mut reg = Registry::new();
    reg.register("acme_ps2", PSU, DriverFactory::PowerSupply(acme_psu))
        .unwrap();
    reg.register("acme_el2", LOAD, DriverFactory::Load(acme_load))
        .unwrap();
    reg.register("acme_sc4", SCOPE, DriverFactory::Scope(acme_scope))
        .unwrap();
    reg.register("acme_dm1", METER, DriverFactory::Meter(acme_meter))
        .unwrap();
    reg
}

pub fn acme_psu() -> Box<dyn PowerSupplyDriver> {
    Box::new(AcmePsu)
}

pub fn acme_load() -> Box<dyn LoadDriver> {
    Box::new(AcmeLoad)
}

pub fn acme_scope() -> Box<dyn ScopeDriver> {
    Box::new(AcmeScope)
}

pub fn acme_meter() -> Box<dyn MeterDriver> {
    Box::new(AcmeMeter)
}

fn n(channel: ChannelId) -> u8 {
    channel.number()
}

pub struct AcmePsu;

#[async_trait]
impl PowerSupplyDriver for AcmePsu {
    fn operation_wait(&self) -> OperationWait {
        OperationWait::None
    }

    async fn reset(&self, io: &mut Instrument) -> Result<()> {
        io.write("*RST").await
    }

    async fn enable_output(&self, io: &mut Instrument, ch: ChannelId) -> Result<()> {
        io.write(&format!("OUTP{},ON", n(ch))).await
    }

    async fn disable_output(&self, io: &mut Instrument, ch: ChannelId) -> Result<()> {
        io.write(&format!("OUTP{},OFF", n(ch))).await
    }

    async fn get_output_state(&self, io: &mut Instrument, ch: ChannelId) -> Result<State> {
        let r = io.query(&format!("OUTP{}?", n(ch))).await?;
        Ok(State::from(r == "1"))
    }

    async fn set_voltage(&self, io: &mut Instrument, ch: ChannelId, v: f64) -> Result<()> {
        io.write(&format!("VOLT{},{v}", n(ch))).await
    }

    async fn get_voltage(&self, io: &mut Instrument, ch: ChannelId) -> Result<f64> {
        io.query_number(&format!("VOLT{}?", n(ch))).await
    }

    async fn set_current(&self, io: &mut Instrument, ch: ChannelId, a: f64) -> Result<()> {
        io.write(&format!("CURR{},{a}", n(ch))).await
    }

    async fn get_current(&self, io: &mut Instrument, ch: ChannelId) -> Result<f64> {
        io.query_number(&format!("CURR{}?", n(ch))).await
    }

    async fn measure(&self, io: &mut Instrument, ch: ChannelId, kind: MeasureType) -> Result<f64> {
        let q = match kind {
            MeasureType::Voltage => "VOLT",
            MeasureType::Current => "CURR",
            MeasureType::Power => "POW",
            other => return Err(Error::InvalidParameter(format!("cannot measure {other}"))),
        };
        io.query_number(&format!("MEAS{}:{q}?", n(ch))).await
    }
}

/// Same as [`AcmePsu`] but with OVP, OCP and remote sense.
pub struct AcmeProtectedPsu;

#[async_trait]
impl PowerSupplyDriver for AcmeProtectedPsu {
    fn operation_wait(&self) -> OperationWait {
        OperationWait::None
    }
    async fn reset(&self, io: &mut Instrument) -> Result<()> {
        AcmePsu.reset(io).await
    }
    async fn enable_output(&self, io: &mut Instrument, ch: ChannelId) -> Result<()> {
        AcmePsu.enable_output(io, ch).await
    }
    async fn disable_output(&self, io: &mut Instrument, ch: ChannelId) -> Result<()> {
        AcmePsu.disable_output(io, ch).await
    }
    async fn get_output_state(&self, io: &mut Instrument, ch: ChannelId) -> Result<State> {
        AcmePsu.get_output_state(io, ch).await
    }
    async fn set_voltage(&self, io: &mut Instrument, ch: ChannelId, v: f64) -> Result<()> {
        AcmePsu.set_voltage(io, ch, v).await
    }
    async fn get_voltage(&self, io: &mut Instrument, ch: ChannelId) -> Result<f64> {
        AcmePsu.get_voltage(io, ch).await
    }
    async fn set_current(&self, io: &mut Instrument, ch: ChannelId, a: f64) -> Result<()> {
        AcmePsu.set_current(io, ch, a).await
    }
    async fn get_current(&self, io: &mut Instrument, ch: ChannelId) -> Result<f64> {
        AcmePsu.get_current(io, ch).await
    }
    async fn measure(&self, io: &mut Instrument, ch: ChannelId, kind: MeasureType) -> Result<f64> {
        AcmePsu.measure(io, ch, kind).await
    }
    async fn set_remote_sense(
        &self,
        io: &mut Instrument,
        ch: ChannelId,
        state: State,
    ) -> Result<Support<()>> {
        io.write(&format!("SENS{},{state}", n(ch))).await?;
        Ok(Support::Supported(()))
    }
    async fn set_ovp(&self, io: &mut Instrument, ch: ChannelId, v: f64) -> Result<Support<()>> {
        io.write(&format!("OVP{},{v}", n(ch))).await?;
        Ok(Support::Supported(()))
    }
    async fn set_ocp(&self, io: &mut Instrument, ch: ChannelId, a: f64) -> Result<Support<()>> {
        io.write(&format!("OCP{},{a}", n(ch))).await?;
        Ok(Support::Supported(()))
    }
}

pub struct AcmeLoad;

fn load_keyword(mode: LoadMode) -> &'static str {
    match mode {
        LoadMode::ConstantCurrent => "CURR",
        LoadMode::ConstantPower => "POW",
        LoadMode::ConstantResistance => "RES",
        LoadMode::ConstantVoltage => "VOLT",
    }
}

#[async_trait]
impl LoadDriver for AcmeLoad {
    fn operation_wait(&self) -> OperationWait {
        OperationWait::None
    }

    async fn reset(&self, io: &mut Instrument) -> Result<()> {
        io.write("*RST").await
    }

    async fn enable_output(&self, io: &mut Instrument, ch: ChannelId) -> Result<()> {
        io.write(&format!("INP{},ON", n(ch))).await
    }

    async fn disable_output(&self, io: &mut Instrument, ch: ChannelId) -> Result<()> {
        io.write(&format!("INP{},OFF", n(ch))).await
    }

    async fn get_output_state(&self, io: &mut Instrument, ch: ChannelId) -> Result<State> {
        let r = io.query(&format!("INP{}?", n(ch))).await?;
        match r.as_str() {
            "ON" => Ok(State::On),
            "OFF" => Ok(State::Off),
            other => Err(Error::Protocol(format!("unexpected input state {other:?}"))),
        }
    }

    async fn set_mode(&self, io: &mut Instrument, ch: ChannelId, mode: LoadMode) -> Result<()> {
        io.write(&format!("FUNC{},{}", n(ch), load_keyword(mode))).await
    }

    async fn get_mode(&self, io: &mut Instrument, ch: ChannelId) -> Result<LoadMode> {
        let r = io.query(&format!("FUNC{}?", n(ch))).await?;
        match r.as_str() {
            "CURR" => Ok(LoadMode::ConstantCurrent),
            "POW" => Ok(LoadMode::ConstantPower),
            "RES" => Ok(LoadMode::ConstantResistance),
            "VOLT" => Ok(LoadMode::ConstantVoltage),
            other => Err(Error::Protocol(format!("unexpected load mode {other:?}"))),
        }
    }

    async fn set_level(
        &self,
        io: &mut Instrument,
        ch: ChannelId,
        mode: LoadMode,
        value: f64,
    ) -> Result<()> {
        io.write(&format!("{}{},{value}", load_keyword(mode), n(ch))).await
    }

    async fn get_level(&self, io: &mut Instrument, ch: ChannelId, mode: LoadMode) -> Result<f64> {
        io.query_number(&format!("{}{}?", load_keyword(mode), n(ch))).await
    }

    async fn measure(&self, io: &mut Instrument, ch: ChannelId, kind: MeasureType) -> Result<f64> {
        io.query_number(&format!("MEAS{}:{kind}?", n(ch))).await
    }

    async fn set_remote_sense(
        &self,
        io: &mut Instrument,
        ch: ChannelId,
        state: State,
    ) -> Result<Support<()>> {
        io.write(&format!("SENS{},{state}", n(ch))).await?;
        Ok(Support::Supported(()))
    }
}

pub struct AcmeScope;

#[async_trait]
impl ScopeDriver for AcmeScope {
    fn operation_wait(&self) -> OperationWait {
        OperationWait::None
    }

    async fn reset(&self, io: &mut Instrument) -> Result<()> {
        io.write("*RST").await
    }

    async fn set_channel_display(&self, io: &mut Instrument, ch: ChannelId, on: bool) -> Result<()> {
        io.write(&format!("C{}:TRA {}", n(ch), State::from(on))).await
    }

    async fn set_vertical_offset(&self, io: &mut Instrument, ch: ChannelId, v: f64) -> Result<()> {
        io.write(&format!("C{}:OFST {v}", n(ch))).await
    }

    async fn set_vertical_scale(&self, io: &mut Instrument, ch: ChannelId, s: VDiv) -> Result<()> {
        io.write(&format!("C{}:VDIV {s}", n(ch))).await
    }

    async fn set_horizontal_scale(&self, io: &mut Instrument, s: HDiv) -> Result<()> {
        io.write(&format!("TDIV {s}")).await
    }

    async fn measure(&self, io: &mut Instrument, ch: ChannelId, stat: Stats) -> Result<f64> {
        io.query_number(&format!("C{}:PAVA? {stat}", n(ch))).await
    }
}

pub struct AcmeMeter;

#[async_trait]
impl MeterDriver for AcmeMeter {
    fn operation_wait(&self) -> OperationWait {
        OperationWait::None
    }

    async fn reset(&self, io: &mut Instrument) -> Result<()> {
        io.write("*RST").await
    }

    async fn set_mode(&self, io: &mut Instrument, kind: MeasureType) -> Result<()> {
        io.write(&format!("CONF:{kind}")).await
    }

    async fn get_mode(&self, io: &mut Instrument) -> Result<Support<MeasureType>> {
        let r = io.query("CONF?").await?;
        match r.as_str() {
            "VOLTAGE" => Ok(Support::Supported(MeasureType::Voltage)),
            "CURRENT" => Ok(Support::Supported(MeasureType::Current)),
            other => Err(Error::Protocol(format!("unexpected function {other:?}"))),
        }
    }

    async fn read(&self, io: &mut Instrument) -> Result<f64> {
        io.query_number("READ?").await
    }
}
