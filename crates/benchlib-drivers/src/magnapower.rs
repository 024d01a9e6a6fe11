//! Magna-Power SL1000 series power supply.
//!
//! The SL has no power readback; [`MeasureType::Power`] is computed from a
//! voltage and a current reading taken one after the other.

use async_trait::async_trait;

use benchlib_core::{
    ChannelId, Error, Instrument, MeasureType, PowerSupplyDriver, Result, State, Support,
};
use benchlib_scpi::format_value;

use crate::commands::unsupported_measurement;

/// Magna-Power SL1000 power supply.
#[derive(Debug, Default)]
pub struct Sl1000;

#[async_trait]
impl PowerSupplyDriver for Sl1000 {
    /// Hand the setpoints over to the remote interface.
    async fn initialize(&self, io: &mut Instrument) -> Result<()> {
        io.write("CONF:SETPT 3").await
    }

    async fn reset(&self, io: &mut Instrument) -> Result<()> {
        io.write("OUTP:STOP").await?;
        io.write("VOLT 0").await?;
        io.write("CURR 0").await?;
        io.write("VOLT:PROT 50").await?;
        // Leave auto-sequence mode.
        io.write("OUTP:ARM 0").await
    }

    async fn enable_output(&self, io: &mut Instrument, _channel: ChannelId) -> Result<()> {
        io.write("OUTP:START").await
    }

    async fn disable_output(&self, io: &mut Instrument, _channel: ChannelId) -> Result<()> {
        io.write("OUTP:STOP").await
    }

    async fn get_output_state(&self, io: &mut Instrument, _channel: ChannelId) -> Result<State> {
        let reply = io.query("OUTP?").await?;
        match reply.trim() {
            "1" => Ok(State::On),
            "0" => Ok(State::Off),
            other => Err(Error::Protocol(format!("bad OUTP? reply {other:?}"))),
        }
    }

    async fn set_voltage(&self, io: &mut Instrument, _channel: ChannelId, volts: f64) -> Result<()> {
        io.write(&format!("VOLT {}", format_value(volts))).await
    }

    async fn get_voltage(&self, io: &mut Instrument, _channel: ChannelId) -> Result<f64> {
        io.query_number("VOLT?").await
    }

    async fn set_current(&self, io: &mut Instrument, _channel: ChannelId, amps: f64) -> Result<()> {
        io.write(&format!("CURR {}", format_value(amps))).await
    }

    async fn get_current(&self, io: &mut Instrument, _channel: ChannelId) -> Result<f64> {
        io.query_number("CURR?").await
    }

    async fn measure(
        &self,
        io: &mut Instrument,
        _channel: ChannelId,
        kind: MeasureType,
    ) -> Result<f64> {
        match kind {
            MeasureType::Voltage => io.query_number("MEAS:VOLT?").await,
            MeasureType::Current => io.query_number("MEAS:CURR?").await,
            MeasureType::Power => {
                let volts = io.query_number("MEAS:VOLT?").await?;
                let amps = io.query_number("MEAS:CURR?").await?;
                tracing::warn!(
                    instrument = %io.name(),
                    volts,
                    amps,
                    "SL1000 has no power readback, computing V * I from two readings"
                );
                Ok(volts * amps)
            }
            other => Err(unsupported_measurement("SL1000", other)),
        }
    }

    async fn set_ovp(
        &self,
        io: &mut Instrument,
        _channel: ChannelId,
        volts: f64,
    ) -> Result<Support<()>> {
        io.write(&format!("VOLT:PROT {}", format_value(volts))).await?;
        Ok(Support::Supported(()))
    }

    async fn set_ocp(
        &self,
        io: &mut Instrument,
        _channel: ChannelId,
        amps: f64,
    ) -> Result<Support<()>> {
        io.write(&format!("CURR:PROT {}", format_value(amps))).await?;
        Ok(Support::Supported(()))
    }
}
