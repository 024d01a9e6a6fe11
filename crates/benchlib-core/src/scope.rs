//! Oscilloscope contract.

use async_trait::async_trait;

use crate::descriptor::InstrumentDescriptor;
use crate::error::Result;
use crate::instrument::{Instrument, OperationWait};
use crate::types::{ChannelId, HDiv, Stats, VDiv};

/// Raw primitives of an oscilloscope driver.
#[async_trait]
pub trait ScopeDriver: Send + Sync {
    fn operation_wait(&self) -> OperationWait {
        OperationWait::Query("*OPC?")
    }

    async fn initialize(&self, _io: &mut Instrument) -> Result<()> {
        Ok(())
    }

    async fn reset(&self, io: &mut Instrument) -> Result<()>;

    /// Show or hide a channel's trace.
    async fn set_channel_display(
        &self,
        io: &mut Instrument,
        channel: ChannelId,
        visible: bool,
    ) -> Result<()>;

    async fn set_vertical_offset(&self, io: &mut Instrument, channel: ChannelId, volts: f64) -> Result<()>;

    async fn set_vertical_scale(&self, io: &mut Instrument, channel: ChannelId, scale: VDiv) -> Result<()>;

    async fn set_horizontal_scale(&self, io: &mut Instrument, scale: HDiv) -> Result<()>;

    async fn measure(&self, io: &mut Instrument, channel: ChannelId, stat: Stats) -> Result<f64>;
}

/// An oscilloscope.
pub struct Oscilloscope {
    core: Instrument,
    driver: Box<dyn ScopeDriver>,
    closed: bool,
}

impl Oscilloscope {
    pub async fn setup(mut core: Instrument, driver: Box<dyn ScopeDriver>) -> Result<Self> {
        core.set_operation_wait(driver.operation_wait());
        if let Err(e) = driver.initialize(&mut core).await {
            return Err(core.abandon(e).await);
        }
        tracing::debug!(instrument = %core.name(), "Oscilloscope ready");
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

    pub fn instrument_mut(&mut self) -> &mut Instrument {
        &mut self.core
    }

    pub async fn get_id(&mut self) -> Result<String> {
        self.core.get_id().await
    }

    /// Show `channels`; with `disable_unlisted`, hide every other channel.
    ///
    /// The whole list is validated before anything is sent.
    pub async fn enable_channels(&mut self, channels: &[ChannelId], disable_unlisted: bool) -> Result<()> {
        self.set_channels(channels, true, disable_unlisted).await
    }

    /// Hide `channels`; with `enable_unlisted`, show every other channel.
    pub async fn disable_channels(&mut self, channels: &[ChannelId], enable_unlisted: bool) -> Result<()> {
        self.set_channels(channels, false, enable_unlisted).await
    }

    async fn set_channels(
        &mut self,
        channels: &[ChannelId],
        visible: bool,
        invert_unlisted: bool,
    ) -> Result<()> {
        self.core.check_channels(channels)?;

        for &channel in channels {
            self.driver
                .set_channel_display(&mut self.core, channel, visible)
                .await?;
        }

        if invert_unlisted {
            let unlisted = self.core.descriptor().unlisted_channels(channels);
            for channel in unlisted {
                self.driver
                    .set_channel_display(&mut self.core, channel, !visible)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn set_vertical_offset(&mut self, channels: &[ChannelId], volts: f64) -> Result<()> {
        self.core.check_channels(channels)?;
        for &channel in channels {
            self.driver
                .set_vertical_offset(&mut self.core, channel, volts)
                .await?;
        }
        Ok(())
    }

    pub async fn set_vertical_scale(&mut self, channels: &[ChannelId], scale: VDiv) -> Result<()> {
        self.core.check_channels(channels)?;
        for &channel in channels {
            self.driver
                .set_vertical_scale(&mut self.core, channel, scale)
                .await?;
        }
        Ok(())
    }

    pub async fn set_horizontal_scale(&mut self, scale: HDiv) -> Result<()> {
        self.driver.set_horizontal_scale(&mut self.core, scale).await
    }

    pub async fn measure(&mut self, channel: ChannelId, stat: Stats) -> Result<f64> {
        self.core.check_channel(channel)?;
        self.driver.measure(&mut self.core, channel, stat).await
    }

    pub async fn reset_device(&mut self) -> Result<()> {
        self.driver.reset(&mut self.core).await?;
        tracing::info!(instrument = %self.core.name(), "Oscilloscope reset");
        Ok(())
    }

    /// Close the transport. A scope has no outputs to make safe.
    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        self.core.close().await
    }
}

impl Drop for Oscilloscope {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!(instrument = %self.core.name(), "Oscilloscope dropped without close()");
        }
    }
}

impl std::fmt::Debug for Oscilloscope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Oscilloscope")
            .field("instrument", &self.core.name())
            .finish()
    }
}
