//! Electronic load contract.
//!
//! [`ElectronicLoad`] keeps a per-channel cache of the regulation mode so
//! that repeated `set_load` calls in the same mode only send the level.
//! The cache is an optimization: a mode changed from the front panel makes
//! it stale, and [`ElectronicLoad::get_mode`] is the way to resync.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::descriptor::InstrumentDescriptor;
use crate::error::{Error, Result};
use crate::instrument::{Instrument, OperationWait};
use crate::types::{ChannelId, LoadMode, MeasureType, SlewRate, State, Support};

/// Level programmed by [`ElectronicLoad::reset_device`], in ohms.
pub const RESET_RESISTANCE_OHMS: f64 = 10_000.0;

/// Raw primitives of an electronic load driver.
#[async_trait]
pub trait LoadDriver: Send + Sync {
    fn operation_wait(&self) -> OperationWait {
        OperationWait::Query("*OPC?")
    }

    async fn initialize(&self, _io: &mut Instrument) -> Result<()> {
        Ok(())
    }

    async fn reset(&self, io: &mut Instrument) -> Result<()>;

    async fn enable_output(&self, io: &mut Instrument, channel: ChannelId) -> Result<()>;

    async fn disable_output(&self, io: &mut Instrument, channel: ChannelId) -> Result<()>;

    async fn get_output_state(&self, io: &mut Instrument, channel: ChannelId) -> Result<State>;

    async fn set_mode(&self, io: &mut Instrument, channel: ChannelId, mode: LoadMode) -> Result<()>;

    /// Current regulation mode. An unrecognised reply is
    /// [`Error::Protocol`].
    async fn get_mode(&self, io: &mut Instrument, channel: ChannelId) -> Result<LoadMode>;

    /// Program the level for `mode`, which is already active.
    async fn set_level(
        &self,
        io: &mut Instrument,
        channel: ChannelId,
        mode: LoadMode,
        value: f64,
    ) -> Result<()>;

    async fn get_level(&self, io: &mut Instrument, channel: ChannelId, mode: LoadMode) -> Result<f64>;

    async fn measure(
        &self,
        io: &mut Instrument,
        channel: ChannelId,
        kind: MeasureType,
    ) -> Result<f64>;

    async fn set_remote_sense(
        &self,
        _io: &mut Instrument,
        _channel: ChannelId,
        _state: State,
    ) -> Result<Support<()>> {
        Ok(Support::Unsupported)
    }

    /// Set the current slew rate; returns the rate the device applied.
    async fn set_slew_rate(
        &self,
        _io: &mut Instrument,
        _channel: ChannelId,
        _rate: SlewRate,
    ) -> Result<Support<f64>> {
        Ok(Support::Unsupported)
    }
}

/// An electronic load.
pub struct ElectronicLoad {
    core: Instrument,
    driver: Box<dyn LoadDriver>,
    modes: HashMap<ChannelId, LoadMode>,
    closed: bool,
}

impl ElectronicLoad {
    /// Install `driver`, initialize it and read every channel's mode.
    pub async fn setup(mut core: Instrument, driver: Box<dyn LoadDriver>) -> Result<Self> {
        core.set_operation_wait(driver.operation_wait());
        if let Err(e) = driver.initialize(&mut core).await {
            return Err(core.abandon(e).await);
        }

        let mut modes = HashMap::new();
        for &channel in core.channels() {
            match driver.get_mode(&mut core, channel).await {
                Ok(mode) => {
                    modes.insert(channel, mode);
                }
                Err(Error::Protocol(msg)) => {
                    tracing::warn!(
                        instrument = %core.name(),
                        %channel,
                        reason = %msg,
                        "Could not read load mode, leaving it unknown"
                    );
                }
                Err(e) => return Err(core.abandon(e).await),
            }
        }

        tracing::debug!(instrument = %core.name(), ?modes, "Electronic load ready");
        Ok(Self {
            core,
            driver,
            modes,
            closed: false,
        })
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        self.core.descriptor()
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn channels(&self) -> &'static [ChannelId] {
        self.core.channels()
    }

    pub fn instrument_mut(&mut self) -> &mut Instrument {
        &mut self.core
    }

    /// Mode last set or read on `channel`, without touching the device.
    pub fn cached_mode(&self, channel: ChannelId) -> Option<LoadMode> {
        self.modes.get(&channel).copied()
    }

    pub async fn get_id(&mut self) -> Result<String> {
        self.core.get_id().await
    }

    pub async fn enable_output(&mut self, channel: ChannelId) -> Result<()> {
        self.core.check_channel(channel)?;
        self.driver.enable_output(&mut self.core, channel).await
    }

    pub async fn disable_output(&mut self, channel: ChannelId) -> Result<()> {
        self.core.check_channel(channel)?;
        self.driver.disable_output(&mut self.core, channel).await
    }

    pub async fn set_output_state(&mut self, channel: ChannelId, state: State) -> Result<()> {
        match state {
            State::On => self.enable_output(channel).await,
            State::Off => self.disable_output(channel).await,
        }
    }

    pub async fn get_output_state(&mut self, channel: ChannelId) -> Result<State> {
        self.core.check_channel(channel)?;
        self.driver.get_output_state(&mut self.core, channel).await
    }

    /// Switch regulation mode, always sending the command.
    pub async fn set_mode(&mut self, channel: ChannelId, mode: LoadMode) -> Result<()> {
        self.core.check_channel(channel)?;
        self.driver.set_mode(&mut self.core, channel, mode).await?;
        self.modes.insert(channel, mode);
        Ok(())
    }

    /// Read the regulation mode from the device and refresh the cache.
    pub async fn get_mode(&mut self, channel: ChannelId) -> Result<LoadMode> {
        self.core.check_channel(channel)?;
        let mode = self.driver.get_mode(&mut self.core, channel).await?;
        self.modes.insert(channel, mode);
        Ok(mode)
    }

    /// Program `value` in `mode`.
    ///
    /// The mode command is only sent when the cached mode differs (or is
    /// unknown).
    pub async fn set_load(&mut self, channel: ChannelId, mode: LoadMode, value: f64) -> Result<()> {
        self.core.check_channel(channel)?;
        if self.cached_mode(channel) != Some(mode) {
            self.driver.set_mode(&mut self.core, channel, mode).await?;
            self.modes.insert(channel, mode);
        }
        self.driver
            .set_level(&mut self.core, channel, mode, value)
            .await
    }

    /// Current mode and level. The mode comes from the cache, or from the
    /// device when unknown.
    pub async fn get_load(&mut self, channel: ChannelId) -> Result<(LoadMode, f64)> {
        self.core.check_channel(channel)?;
        let mode = match self.cached_mode(channel) {
            Some(mode) => mode,
            None => self.get_mode(channel).await?,
        };
        let level = self.driver.get_level(&mut self.core, channel, mode).await?;
        Ok((mode, level))
    }

    pub async fn measure(&mut self, channel: ChannelId, kind: MeasureType) -> Result<f64> {
        self.core.check_channel(channel)?;
        self.driver.measure(&mut self.core, channel, kind).await
    }

    pub async fn measure_voltage(&mut self, channel: ChannelId) -> Result<f64> {
        self.measure(channel, MeasureType::Voltage).await
    }

    pub async fn measure_current(&mut self, channel: ChannelId) -> Result<f64> {
        self.measure(channel, MeasureType::Current).await
    }

    pub async fn measure_power(&mut self, channel: ChannelId) -> Result<f64> {
        self.measure(channel, MeasureType::Power).await
    }

    pub async fn set_remote_sense(&mut self, channel: ChannelId, state: State) -> Result<Support<()>> {
        self.core.check_channel(channel)?;
        let result = self
            .driver
            .set_remote_sense(&mut self.core, channel, state)
            .await?;
        if !result.is_supported() {
            self.warn_unsupported("set_remote_sense");
        }
        Ok(result)
    }

    pub async fn set_slew_rate(&mut self, channel: ChannelId, rate: SlewRate) -> Result<Support<f64>> {
        self.core.check_channel(channel)?;
        let result = self.driver.set_slew_rate(&mut self.core, channel, rate).await?;
        if !result.is_supported() {
            self.warn_unsupported("set_slew_rate");
        }
        Ok(result)
    }

    fn warn_unsupported(&self, operation: &str) {
        tracing::warn!(
            instrument = %self.core.name(),
            operation,
            "Optional feature not implemented by this load"
        );
    }

    /// Bring the load to a known state: input off, constant resistance at
    /// [`RESET_RESISTANCE_OHMS`], local sense.
    pub async fn reset_device(&mut self) -> Result<()> {
        self.driver.reset(&mut self.core).await?;
        // The device reset may have changed any mode.
        self.modes.clear();

        for &channel in self.core.channels() {
            self.disable_output(channel).await?;
            self.set_load(channel, LoadMode::ConstantResistance, RESET_RESISTANCE_OHMS)
                .await?;
            self.set_remote_sense(channel, State::Off).await?;
        }

        tracing::info!(instrument = %self.core.name(), "Electronic load reset");
        Ok(())
    }

    /// Disable every input.
    pub async fn safe_state(&mut self) -> Result<()> {
        for &channel in self.core.channels() {
            self.driver.disable_output(&mut self.core, channel).await?;
        }
        Ok(())
    }

    /// Disable every input, then close the transport.
    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        let safe = self.safe_state().await;
        let closed = self.core.close().await;
        safe.and(closed)
    }
}

impl Drop for ElectronicLoad {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!(
                instrument = %self.core.name(),
                "Electronic load dropped without close(); inputs may still be enabled"
            );
        }
    }
}

impl std::fmt::Debug for ElectronicLoad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElectronicLoad")
            .field("instrument", &self.core.name())
            .field("modes", &self.modes)
            .finish()
    }
}
