//! Power supply contract.
//!
//! Drivers implement [`PowerSupplyDriver`]: a handful of raw primitives,
//! each acting on one channel. [`PowerSupply`] wraps the driver with the
//! behavior every supply shares: channel validation, the reset sequence,
//! and the safety gate on missing over-voltage and over-current
//! protection.

use async_trait::async_trait;

use crate::descriptor::InstrumentDescriptor;
use crate::error::{Error, Result};
use crate::instrument::{Instrument, OperationWait};
use crate::types::{ChannelId, MeasureType, State, Support};

/// Highest OVP limit a supply without OVP may be asked for.
pub const OVP_SAFETY_CEILING_VOLTS: f64 = 50.0;
/// Highest OCP limit a supply without OCP may be asked for.
pub const OCP_SAFETY_CEILING_AMPS: f64 = 0.01;

/// OVP limit programmed by [`PowerSupply::reset_device`].
pub const RESET_OVP_VOLTS: f64 = 50.0;
/// OCP limit programmed by [`PowerSupply::reset_device`].
pub const RESET_OCP_AMPS: f64 = 5.0;

/// Raw primitives of a power supply driver.
///
/// Channels passed in have already been validated against the
/// descriptor.
#[async_trait]
pub trait PowerSupplyDriver: Send + Sync {
    /// How to wait for the previous command to complete.
    fn operation_wait(&self) -> OperationWait {
        OperationWait::Query("*OPC?")
    }

    /// One-off configuration right after the connection is established.
    async fn initialize(&self, _io: &mut Instrument) -> Result<()> {
        Ok(())
    }

    /// The device's own reset command.
    async fn reset(&self, io: &mut Instrument) -> Result<()>;

    async fn enable_output(&self, io: &mut Instrument, channel: ChannelId) -> Result<()>;

    async fn disable_output(&self, io: &mut Instrument, channel: ChannelId) -> Result<()>;

    async fn get_output_state(&self, io: &mut Instrument, channel: ChannelId) -> Result<State>;

    async fn set_voltage(&self, io: &mut Instrument, channel: ChannelId, volts: f64) -> Result<()>;

    /// The programmed voltage setpoint.
    async fn get_voltage(&self, io: &mut Instrument, channel: ChannelId) -> Result<f64>;

    async fn set_current(&self, io: &mut Instrument, channel: ChannelId, amps: f64) -> Result<()>;

    /// The programmed current limit.
    async fn get_current(&self, io: &mut Instrument, channel: ChannelId) -> Result<f64>;

    /// Read back an actual output quantity.
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

    async fn set_ovp(
        &self,
        _io: &mut Instrument,
        _channel: ChannelId,
        _volts: f64,
    ) -> Result<Support<()>> {
        Ok(Support::Unsupported)
    }

    async fn set_ocp(
        &self,
        _io: &mut Instrument,
        _channel: ChannelId,
        _amps: f64,
    ) -> Result<Support<()>> {
        Ok(Support::Unsupported)
    }
}

/// A programmable power supply.
pub struct PowerSupply {
    core: Instrument,
    driver: Box<dyn PowerSupplyDriver>,
    closed: bool,
}

impl PowerSupply {
    /// Install `driver` on `core` and run its initialization.
    pub async fn setup(mut core: Instrument, driver: Box<dyn PowerSupplyDriver>) -> Result<Self> {
        core.set_operation_wait(driver.operation_wait());
        if let Err(e) = driver.initialize(&mut core).await {
            return Err(core.abandon(e).await);
        }
        tracing::debug!(instrument = %core.name(), "Power supply ready");
        Ok(Self {
            core,
            driver,
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

    /// Direct access to the capability core, for raw commands.
    pub fn instrument_mut(&mut self) -> &mut Instrument {
        &mut self.core
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

    pub async fn set_voltage(&mut self, channel: ChannelId, volts: f64) -> Result<()> {
        self.core.check_channel(channel)?;
        self.driver.set_voltage(&mut self.core, channel, volts).await
    }

    pub async fn get_voltage(&mut self, channel: ChannelId) -> Result<f64> {
        self.core.check_channel(channel)?;
        self.driver.get_voltage(&mut self.core, channel).await
    }

    pub async fn set_current(&mut self, channel: ChannelId, amps: f64) -> Result<()> {
        self.core.check_channel(channel)?;
        self.driver.set_current(&mut self.core, channel, amps).await
    }

    pub async fn get_current(&mut self, channel: ChannelId) -> Result<f64> {
        self.core.check_channel(channel)?;
        self.driver.get_current(&mut self.core, channel).await
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

    /// Program over-voltage protection.
    ///
    /// A supply without OVP may be asked for limits up to
    /// [`OVP_SAFETY_CEILING_VOLTS`] and reports `Unsupported`; above that
    /// the call fails with [`Error::UnimplementedSafetyCritical`].
    pub async fn set_ovp(&mut self, channel: ChannelId, volts: f64) -> Result<Support<()>> {
        self.core.check_channel(channel)?;
        let result = self.driver.set_ovp(&mut self.core, channel, volts).await?;
        self.gate_protection(result, "set_ovp", volts, OVP_SAFETY_CEILING_VOLTS)
    }

    /// Program over-current protection.
    ///
    /// Same gating as [`set_ovp`](Self::set_ovp), with
    /// [`OCP_SAFETY_CEILING_AMPS`] as the ceiling.
    pub async fn set_ocp(&mut self, channel: ChannelId, amps: f64) -> Result<Support<()>> {
        self.core.check_channel(channel)?;
        let result = self.driver.set_ocp(&mut self.core, channel, amps).await?;
        self.gate_protection(result, "set_ocp", amps, OCP_SAFETY_CEILING_AMPS)
    }

    fn gate_protection(
        &self,
        result: Support<()>,
        operation: &'static str,
        requested: f64,
        limit: f64,
    ) -> Result<Support<()>> {
        match result {
            Support::Supported(()) => Ok(result),
            Support::Unsupported if requested > limit => Err(Error::UnimplementedSafetyCritical {
                operation,
                instrument: self.core.name().to_string(),
                requested,
                limit,
            }),
            Support::Unsupported => {
                self.warn_unsupported(operation);
                Ok(result)
            }
        }
    }

    fn warn_unsupported(&self, operation: &str) {
        tracing::warn!(
            instrument = %self.core.name(),
            operation,
            "Optional feature not implemented by this power supply"
        );
    }

    /// Bring the supply to a known state.
    ///
    /// Outputs go off and setpoints to zero before the device reset runs,
    /// then again afterwards together with default protection limits and
    /// local sense.
    pub async fn reset_device(&mut self) -> Result<()> {
        let channels = self.core.channels();

        for &channel in channels {
            self.driver.disable_output(&mut self.core, channel).await?;
            self.driver.set_voltage(&mut self.core, channel, 0.0).await?;
            self.driver.set_current(&mut self.core, channel, 0.0).await?;
        }

        self.driver.reset(&mut self.core).await?;

        for &channel in channels {
            self.driver.disable_output(&mut self.core, channel).await?;
            self.driver.set_voltage(&mut self.core, channel, 0.0).await?;
            self.driver.set_current(&mut self.core, channel, 0.0).await?;

            if !self
                .driver
                .set_ovp(&mut self.core, channel, RESET_OVP_VOLTS)
                .await?
                .is_supported()
            {
                self.warn_unsupported("set_ovp");
            }
            if !self
                .driver
                .set_ocp(&mut self.core, channel, RESET_OCP_AMPS)
                .await?
                .is_supported()
            {
                self.warn_unsupported("set_ocp");
            }
            if !self
                .driver
                .set_remote_sense(&mut self.core, channel, State::Off)
                .await?
                .is_supported()
            {
                self.warn_unsupported("set_remote_sense");
            }
        }

        tracing::info!(instrument = %self.core.name(), "Power supply reset");
        Ok(())
    }

    /// Disable every output.
    pub async fn safe_state(&mut self) -> Result<()> {
        for &channel in self.core.channels() {
            self.driver.disable_output(&mut self.core, channel).await?;
        }
        Ok(())
    }

    /// Disable every output, then close the transport.
    ///
    /// The transport is closed even when disabling an output fails; the
    /// first error is returned.
    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        let safe = self.safe_state().await;
        let closed = self.core.close().await;
        safe.and(closed)
    }
}

impl Drop for PowerSupply {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!(
                instrument = %self.core.name(),
                "Power supply dropped without close(); outputs may still be enabled"
            );
        }
    }
}

impl std::fmt::Debug for PowerSupply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerSupply")
            .field("instrument", &self.core.name())
            .field("connection", self.core.connection())
            .finish()
    }
}
