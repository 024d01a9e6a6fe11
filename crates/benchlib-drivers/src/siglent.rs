//! Siglent instruments: SPD1168X supply, SDL1020X-E load, SDS1104X-E scope
//! and SDM3055 multimeter.
//!
//! All four speak SCPI over a raw socket (port 5025) and accept `*OPC?` as
//! the operation-complete wait. The SDS1104X-E uses the LeCroy-style
//! command tree shared with [`crate::lecroy`].

use async_trait::async_trait;

use benchlib_core::{
    ChannelId, Error, HDiv, Instrument, LoadDriver, LoadMode, MeasureType, MeterDriver,
    OperationWait, PowerSupplyDriver, Result, ScopeDriver, SlewRate, State, Stats, Support, VDiv,
};
use benchlib_scpi::{format_value, parse_bool, parse_hex_register};

use crate::commands;

// ---------------------------------------------------------------
// SPD1168X power supply
// ---------------------------------------------------------------

/// Bit of the `SYST:STAT?` register that is set while the output is on.
const SPD_OUTPUT_ON_BIT: u32 = 0x10;

/// Siglent SPD1168X single-output power supply.
///
/// The SPD has no reset command and no programmable protection; the
/// supply's reset sequence (outputs off, setpoints zero) is all a reset
/// does.
#[derive(Debug, Default)]
pub struct Spd1168x;

#[async_trait]
impl PowerSupplyDriver for Spd1168x {
    async fn reset(&self, io: &mut Instrument) -> Result<()> {
        tracing::debug!(instrument = %io.name(), "SPD1168X has no reset command");
        Ok(())
    }

    async fn enable_output(&self, io: &mut Instrument, channel: ChannelId) -> Result<()> {
        io.write(&format!("OUTP {channel},ON")).await
    }

    async fn disable_output(&self, io: &mut Instrument, channel: ChannelId) -> Result<()> {
        io.write(&format!("OUTP {channel},OFF")).await
    }

    async fn get_output_state(&self, io: &mut Instrument, _channel: ChannelId) -> Result<State> {
        let reply = io.query("SYST:STAT?").await?;
        let status = parse_hex_register(&reply)
            .ok_or_else(|| Error::Protocol(format!("bad SYST:STAT? reply {reply:?}")))?;
        Ok(State::from(status & SPD_OUTPUT_ON_BIT != 0))
    }

    async fn set_voltage(&self, io: &mut Instrument, channel: ChannelId, volts: f64) -> Result<()> {
        io.write(&format!("{channel}:VOLT {}", format_value(volts)))
            .await
    }

    async fn get_voltage(&self, io: &mut Instrument, channel: ChannelId) -> Result<f64> {
        io.query_number(&format!("{channel}:VOLT?")).await
    }

    async fn set_current(&self, io: &mut Instrument, channel: ChannelId, amps: f64) -> Result<()> {
        io.write(&format!("{channel}:CURR {}", format_value(amps)))
            .await
    }

    async fn get_current(&self, io: &mut Instrument, channel: ChannelId) -> Result<f64> {
        io.query_number(&format!("{channel}:CURR?")).await
    }

    async fn measure(
        &self,
        io: &mut Instrument,
        channel: ChannelId,
        kind: MeasureType,
    ) -> Result<f64> {
        let quantity = match kind {
            MeasureType::Voltage => "VOLT",
            MeasureType::Current => "CURR",
            MeasureType::Power => "POWE",
            other => return Err(commands::unsupported_measurement("SPD1168X", other)),
        };
        io.query_number(&format!("MEAS:{quantity}? {channel}"))
            .await
    }
}

// ---------------------------------------------------------------
// SDL1020X-E electronic load
// ---------------------------------------------------------------

/// Siglent SDL1020X-E electronic load.
#[derive(Debug, Default)]
pub struct Sdl1020xe;

#[async_trait]
impl LoadDriver for Sdl1020xe {
    async fn reset(&self, io: &mut Instrument) -> Result<()> {
        io.write("*RST").await
    }

    async fn enable_output(&self, io: &mut Instrument, _channel: ChannelId) -> Result<()> {
        io.write(":INP ON").await
    }

    async fn disable_output(&self, io: &mut Instrument, _channel: ChannelId) -> Result<()> {
        io.write(":INP OFF").await
    }

    async fn get_output_state(&self, io: &mut Instrument, _channel: ChannelId) -> Result<State> {
        let reply = io.query(":INP?").await?;
        parse_bool(&reply)
            .map(State::from)
            .ok_or_else(|| Error::Protocol(format!("bad :INP? reply {reply:?}")))
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
        let command = commands::cmd_load_measure("SDL1020XE", kind)?;
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

    /// The SDL takes the current slew rate in A/us.
    async fn set_slew_rate(
        &self,
        io: &mut Instrument,
        _channel: ChannelId,
        rate: SlewRate,
    ) -> Result<Support<f64>> {
        let command = match rate {
            SlewRate::Fastest => "CURR:SLEW MAX".to_string(),
            SlewRate::Slowest => "CURR:SLEW MIN".to_string(),
            SlewRate::Custom(amps_per_ms) => format!(
                "CURR:SLEW {}",
                format_value(commands::amps_per_us(amps_per_ms))
            ),
        };
        io.write(&command).await?;

        let applied = io.query_number("CURR:SLEW?").await?;
        Ok(Support::Supported(commands::amps_per_ms(applied)))
    }
}

// ---------------------------------------------------------------
// SDS1104X-E oscilloscope
// ---------------------------------------------------------------

/// Siglent SDS1104X-E oscilloscope.
#[derive(Debug, Default)]
pub struct Sds1104xe;

#[async_trait]
impl ScopeDriver for Sds1104xe {
    async fn reset(&self, io: &mut Instrument) -> Result<()> {
        io.write("*RST").await
    }

    async fn set_channel_display(
        &self,
        io: &mut Instrument,
        channel: ChannelId,
        visible: bool,
    ) -> Result<()> {
        io.write(&commands::cmd_trace(channel, visible)).await
    }

    async fn set_vertical_offset(&self, io: &mut Instrument, channel: ChannelId, volts: f64) -> Result<()> {
        io.write(&commands::cmd_vertical_offset(channel, volts)).await
    }

    async fn set_vertical_scale(&self, io: &mut Instrument, channel: ChannelId, scale: VDiv) -> Result<()> {
        io.write(&commands::cmd_vertical_scale(channel, scale)).await
    }

    async fn set_horizontal_scale(&self, io: &mut Instrument, scale: HDiv) -> Result<()> {
        io.write(&commands::cmd_horizontal_scale(scale)).await
    }

    /// The SDS answers `C1:PAVA PKPK,2.50E+00V`; the first number after the
    /// keyword is the value.
    async fn measure(&self, io: &mut Instrument, channel: ChannelId, stat: Stats) -> Result<f64> {
        io.query_number(&commands::cmd_parameter_value(channel, stat))
            .await
    }
}

// ---------------------------------------------------------------
// SDM3055 multimeter
// ---------------------------------------------------------------

/// Siglent SDM3055 multimeter.
#[derive(Debug, Default)]
pub struct Sdm3055;

#[async_trait]
impl MeterDriver for Sdm3055 {
    fn operation_wait(&self) -> OperationWait {
        OperationWait::Query("*STB?")
    }

    async fn initialize(&self, io: &mut Instrument) -> Result<()> {
        io.write("SAMP:COUN 1").await
    }

    async fn reset(&self, io: &mut Instrument) -> Result<()> {
        io.write("SYST:PRES").await
    }

    async fn set_mode(&self, io: &mut Instrument, kind: MeasureType) -> Result<()> {
        let command = commands::cmd_meter_configure("SDM3055", kind)?;
        io.write(command).await
    }

    async fn get_mode(&self, io: &mut Instrument) -> Result<Support<MeasureType>> {
        let reply = io.query("CONF?").await?;
        commands::parse_meter_configuration(&reply).map(Support::Supported)
    }

    async fn read(&self, io: &mut Instrument) -> Result<f64> {
        io.query_number("READ?").await
    }
}
