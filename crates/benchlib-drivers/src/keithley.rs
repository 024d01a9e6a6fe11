//! Keithley 2380 series electronic load.
//!
//! The 2380 shares the SDL's load command set apart from the input
//! commands and slew handling. Its current slew has two ranges: quick mode
//! (`CURR:SLOW 0`) takes rates in A/us, slow mode (`CURR:SLOW 1`) in A/ms.

use async_trait::async_trait;

use benchlib_core::{
    ChannelId, Instrument, LoadDriver, LoadMode, MeasureType, Result, SlewRate, State, Support,
};
use benchlib_scpi::format_value;

use crate::commands;

/// Keithley 2380 electronic load.
#[derive(Debug, Default)]
pub struct K2380;

impl K2380 {
    async fn slow_mode(io: &mut Instrument) -> Result<bool> {
        let reply = io.query("CURR:SLOW:STAT?").await?;
        Ok(reply.contains('1'))
    }

    /// Read back the slew rate and convert it to A/ms.
    async fn applied_slew(io: &mut Instrument, slow: bool) -> Result<f64> {
        let rate = io.query_number("CURR:SLEW?").await?;
        Ok(if slow { rate } else { commands::amps_per_ms(rate) })
    }
}

#[async_trait]
impl LoadDriver for K2380 {
    async fn reset(&self, io: &mut Instrument) -> Result<()> {
        io.write("*RST").await
    }

    async fn enable_output(&self, io: &mut Instrument, _channel: ChannelId) -> Result<()> {
        io.write("INP ON").await
    }

    async fn disable_output(&self, io: &mut Instrument, _channel: ChannelId) -> Result<()> {
        io.write("INP OFF").await
    }

    async fn get_output_state(&self, io: &mut Instrument, _channel: ChannelId) -> Result<State> {
        let reply = io.query("INP?").await?;
        Ok(State::from(reply.trim() == "1"))
    }

    async fn set_mode(&self, io: &mut Instrument, _channel: ChannelId, mode: LoadMode) -> Result<()> {
        io.write(&commands::cmd_load_mode(mode)).await
    }

    async fn get_mode(&self, io: &mut Instrument, _channel: ChannelId) -> Result<LoadMode> {
        let reply = io.query("FUNC?").await?;
        commands::parse_load_mode(&reply)
    }

    async fn set_level(
        &self,
        io: &mut Instrument,
        _channel: ChannelId,
        mode: LoadMode,
        value: f64,
    ) -> Result<()> {
        io.write(&commands::cmd_load_level(mode, value)).await
    }

    async fn get_level(&self, io: &mut Instrument, _channel: ChannelId, mode: LoadMode) -> Result<f64> {
        io.query_number(&commands::cmd_read_load_level(mode)).await
    }

    async fn measure(
        &self,
        io: &mut Instrument,
        _channel: ChannelId,
        kind: MeasureType,
    ) -> Result<f64> {
        let command = commands::cmd_load_measure("2380", kind)?;
        io.query_number(command).await
    }

    async fn set_remote_sense(
        &self,
        io: &mut Instrument,
        _channel: ChannelId,
        state: State,
    ) -> Result<Support<()>> {
        io.write(&format!("SYST:SENS {state}")).await?;
        Ok(Support::Supported(()))
    }

    async fn set_slew_rate(
        &self,
        io: &mut Instrument,
        _channel: ChannelId,
        rate: SlewRate,
    ) -> Result<Support<f64>> {
        let applied = match rate {
            SlewRate::Fastest => {
                io.write("CURR:SLOW 0").await?;
                io.write("CURR:SLEW MAX").await?;
                Self::applied_slew(io, false).await?
            }
            SlewRate::Slowest => {
                io.write("CURR:SLOW 1").await?;
                io.write("CURR:SLEW MAX").await?;
                Self::applied_slew(io, true).await?
            }
            SlewRate::Custom(amps_per_ms) => {
                let slow = Self::slow_mode(io).await?;
                let value = if slow {
                    amps_per_ms
                } else {
                    commands::amps_per_us(amps_per_ms)
                };
                io.write(&format!("CURR:SLEW {}", format_value(value))).await?;
                Self::applied_slew(io, slow).await?
            }
        };
        Ok(Support::Supported(applied))
    }
}
