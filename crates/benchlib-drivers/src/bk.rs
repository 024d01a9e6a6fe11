//! BK Precision 9141 triple-output power supply.
//!
//! The 9141 addresses one output at a time: `INST:SEL <n>` (numbered from
//! zero) selects the output that the following `VOLT`, `CURR`, `OUTP:STAT`
//! and `MEAS` commands act on. Every channel operation therefore starts
//! with a select.

use async_trait::async_trait;

use benchlib_core::{
    ChannelId, Error, Instrument, MeasureType, PowerSupplyDriver, Result, State, Support,
};
use benchlib_scpi::format_value;

use crate::commands::unsupported_measurement;

/// BK Precision 9141 power supply.
#[derive(Debug, Default)]
pub struct Bk9141;

impl Bk9141 {
    async fn select(io: &mut Instrument, channel: ChannelId) -> Result<()> {
        let index = channel.number().saturating_sub(1);
        io.write(&format!("INST:SEL {index}")).await
    }
}

#[async_trait]
impl PowerSupplyDriver for Bk9141 {
    async fn reset(&self, io: &mut Instrument) -> Result<()> {
        io.write("*RST").await
    }

    async fn enable_output(&self, io: &mut Instrument, channel: ChannelId) -> Result<()> {
        Self::select(io, channel).await?;
        io.write("OUTP:STAT ON").await
    }

    async fn disable_output(&self, io: &mut Instrument, channel: ChannelId) -> Result<()> {
        Self::select(io, channel).await?;
        io.write("OUTP:STAT OFF").await
    }

    /// `OUTP? CH<n>` reads a channel without selecting it.
    async fn get_output_state(&self, io: &mut Instrument, channel: ChannelId) -> Result<State> {
        let reply = io.query(&format!("OUTP? {channel}")).await?;
        let upper = reply.to_uppercase();
        if upper.contains("ON") {
            Ok(State::On)
        } else if upper.contains("OFF") {
            Ok(State::Off)
        } else {
            Err(Error::Protocol(format!("bad OUTP? reply {reply:?}")))
        }
    }

    async fn set_voltage(&self, io: &mut Instrument, channel: ChannelId, volts: f64) -> Result<()> {
        Self::select(io, channel).await?;
        io.write(&format!("VOLT {}", format_value(volts))).await
    }

    async fn get_voltage(&self, io: &mut Instrument, channel: ChannelId) -> Result<f64> {
        Self::select(io, channel).await?;
        io.query_number("VOLT?").await
    }

    async fn set_current(&self, io: &mut Instrument, channel: ChannelId, amps: f64) -> Result<()> {
        Self::select(io, channel).await?;
        io.write(&format!("CURR {}", format_value(amps))).await
    }

    async fn get_current(&self, io: &mut Instrument, channel: ChannelId) -> Result<f64> {
        Self::select(io, channel).await?;
        io.query_number("CURR?").await
    }

    async fn measure(
        &self,
        io: &mut Instrument,
        channel: ChannelId,
        kind: MeasureType,
    ) -> Result<f64> {
        let command = match kind {
            MeasureType::Voltage => "MEAS:VOLT:DC?",
            MeasureType::Current => "MEAS:CURR:DC?",
            MeasureType::Power => "MEAS:POW:DC?",
            other => return Err(unsupported_measurement("9141", other)),
        };
        Self::select(io, channel).await?;
        io.query_number(command).await
    }

    async fn set_remote_sense(
        &self,
        io: &mut Instrument,
        channel: ChannelId,
        state: State,
    ) -> Result<Support<()>> {
        Self::select(io, channel).await?;
        io.write(&format!("VOLT:SENS {state}")).await?;
        Ok(Support::Supported(()))
    }
}
