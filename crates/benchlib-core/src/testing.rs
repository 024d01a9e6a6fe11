//! Inert drivers for unit tests that never touch a transport.

use async_trait::async_trait;

use crate::descriptor::InstrumentDescriptor;
use crate::error::Result;
use crate::instrument::Instrument;
use crate::load::LoadDriver;
use crate::meter::MeterDriver;
use crate::psu::PowerSupplyDriver;
use crate::scope::ScopeDriver;
use crate::types::*;

pub(crate) struct NullDriver;

pub(crate) fn null_psu() -> Box<dyn PowerSupplyDriver> {
    Box::new(NullDriver)
}

pub(crate) fn null_load() -> Box<dyn LoadDriver> {
    Box::new(NullDriver)
}

pub(crate) fn null_scope() -> Box<dyn ScopeDriver> {
    Box::new(NullDriver)
}

pub(crate) fn null_meter() -> Box<dyn MeterDriver> {
    Box::new(NullDriver)
}

pub(crate) fn psu_descriptor() -> InstrumentDescriptor {
    InstrumentDescriptor {
        category: Category::PowerSupply,
        manufacturer: "Siglent",
        model: "SPD1168X",
        id_command: "*IDN?",
        channels: &[ChannelId::CH1],
    }
}

pub(crate) fn scope_descriptor() -> InstrumentDescriptor {
    InstrumentDescriptor {
        category: Category::Scope,
        manufacturer: "Siglent",
        model: "SDS1104XE",
        id_command: "*IDN?",
        channels: &[ChannelId::CH1, ChannelId::CH2, ChannelId::CH3, ChannelId::CH4],
    }
}

#[async_trait]
impl PowerSupplyDriver for NullDriver {
    async fn reset(&self, _io: &mut Instrument) -> Result<()> {
        Ok(())
    }
    async fn enable_output(&self, _io: &mut Instrument, _ch: ChannelId) -> Result<()> {
        Ok(())
    }
    async fn disable_output(&self, _io: &mut Instrument, _ch: ChannelId) -> Result<()> {
        Ok(())
    }
    async fn get_output_state(&self, _io: &mut Instrument, _ch: ChannelId) -> Result<State> {
        Ok(State::Off)
    }
    async fn set_voltage(&self, _io: &mut Instrument, _ch: ChannelId, _v: f64) -> Result<()> {
        Ok(())
    }
    async fn get_voltage(&self, _io: &mut Instrument, _ch: ChannelId) -> Result<f64> {
        Ok(0.0)
    }
    async fn set_current(&self, _io: &mut Instrument, _ch: ChannelId, _a: f64) -> Result<()> {
        Ok(())
    }
    async fn get_current(&self, _io: &mut Instrument, _ch: ChannelId) -> Result<f64> {
        Ok(0.0)
    }
    async fn measure(&self, _io: &mut Instrument, _ch: ChannelId, _k: MeasureType) -> Result<f64> {
        Ok(0.0)
    }
}

#[async_trait]
impl LoadDriver for NullDriver {
    async fn reset(&self, _io: &mut Instrument) -> Result<()> {
        Ok(())
    }
    async fn enable_output(&self, _io: &mut Instrument, _ch: ChannelId) -> Result<()> {
        Ok(())
    }
    async fn disable_output(&self, _io: &mut Instrument, _ch: ChannelId) -> Result<()> {
        Ok(())
    }
    async fn get_output_state(&self, _io: &mut Instrument, _ch: ChannelId) -> Result<State> {
        Ok(State::Off)
    }
    async fn set_mode(&self, _io: &mut Instrument, _ch: ChannelId, _m: LoadMode) -> Result<()> {
        Ok(())
    }
    async fn get_mode(&self, _io: &mut Instrument, _ch: ChannelId) -> Result<LoadMode> {
        Ok(LoadMode::ConstantCurrent)
    }
    async fn set_level(
        &self,
        _io: &mut Instrument,
        _ch: ChannelId,
        _m: LoadMode,
        _v: f64,
    ) -> Result<()> {
        Ok(())
    }
    async fn get_level(&self, _io: &mut Instrument, _ch: ChannelId, _m: LoadMode) -> Result<f64> {
        Ok(0.0)
    }
    async fn measure(&self, _io: &mut Instrument, _ch: ChannelId, _k: MeasureType) -> Result<f64> {
        Ok(0.0)
    }
}

#[async_trait]
impl ScopeDriver for NullDriver {
    async fn reset(&self, _io: &mut Instrument) -> Result<()> {
        Ok(())
    }
    async fn set_channel_display(&self, _io: &mut Instrument, _ch: ChannelId, _on: bool) -> Result<()> {
        Ok(())
    }
    async fn set_vertical_offset(&self, _io: &mut Instrument, _ch: ChannelId, _v: f64) -> Result<()> {
        Ok(())
    }
    async fn set_vertical_scale(&self, _io: &mut Instrument, _ch: ChannelId, _s: VDiv) -> Result<()> {
        Ok(())
    }
    async fn set_horizontal_scale(&self, _io: &mut Instrument, _s: HDiv) -> Result<()> {
        Ok(())
    }
    async fn measure(&self, _io: &mut Instrument, _ch: ChannelId, _s: Stats) -> Result<f64> {
        Ok(0.0)
    }
}

#[async_trait]
impl MeterDriver for NullDriver {
    async fn reset(&self, _io: &mut Instrument) -> Result<()> {
        Ok(())
    }
    async fn set_mode(&self, _io: &mut Instrument, _k: MeasureType) -> Result<()> {
        Ok(())
    }
    async fn get_mode(&self, _io: &mut Instrument) -> Result<Support<MeasureType>> {
        Ok(Support::Unsupported)
    }
    async fn read(&self, _io: &mut Instrument) -> Result<f64> {
        Ok(0.0)
    }
}
