//! Multimeter contract.
//!
//! A meter has exactly one input. [`Multimeter::measure`] remembers the
//! function it last selected and only reselects when asked for something
//! else, which matters on older meters where a function change costs a
//! relay click and a settling delay.

use async_trait::async_trait;

use crate::descriptor::InstrumentDescriptor;
use crate::error::{Error, Result};
use crate::instrument::{Instrument, OperationWait};
use crate::types::{MeasureType, Support};

/// Raw primitives of a multimeter driver.
#[async_trait]
pub trait MeterDriver: Send + Sync {
    fn operation_wait(&self) -> OperationWait {
        OperationWait::Query("*OPC?")
    }

    async fn initialize(&self, _io: &mut Instrument) -> Result<()> {
        Ok(())
    }

    async fn reset(&self, io: &mut Instrument) -> Result<()>;

    /// Select the measurement function.
    async fn set_mode(&self, io: &mut Instrument, kind: MeasureType) -> Result<()>;

    /// The selected measurement function, if the meter can report it.
    async fn get_mode(&self, io: &mut Instrument) -> Result<Support<MeasureType>>;

    /// Take one reading in the selected function.
    async fn read(&self, io: &mut Instrument) -> Result<f64>;
}

/// A digital multimeter.
pub struct Multimeter {
    core: Instrument,
    driver: Box<dyn MeterDriver>,
    mode: Option<MeasureType>,
    closed: bool,
}

impl Multimeter {
    /// Install `driver` on `core`. The descriptor must list exactly one
    /// channel.
    pub async fn setup(mut core: Instrument, driver: Box<dyn MeterDriver>) -> Result<Self> {
        let channels = core.channels().len();
        if channels != 1 {
            let err = Error::Initialization(format!(
                "multimeter {} must have exactly one channel, found {channels}",
                core.name()
            ));
            return Err(core.abandon(err).await);
        }

        core.set_operation_wait(driver.operation_wait());
        if let Err(e) = driver.initialize(&mut core).await {
            return Err(core.abandon(e).await);
        }
        tracing::debug!(instrument = %core.name(), "Multimeter ready");
        Ok(Self {
            core,
            driver,
            mode: None,
            closed: false,
        })
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        self.core.descriptor()
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn instrument_mut(&mut self) -> &mut Instrument {
        &mut self.core
    }

    /// Function last selected or read, without touching the device.
    pub fn cached_mode(&self) -> Option<MeasureType> {
        self.mode
    }

    pub async fn get_id(&mut self) -> Result<String> {
        self.core.get_id().await
    }

    /// Select a function, always sending the command.
    pub async fn set_mode(&mut self, kind: MeasureType) -> Result<()> {
        self.driver.set_mode(&mut self.core, kind).await?;
        self.mode = Some(kind);
        Ok(())
    }

    /// Ask the meter for its function and refresh the cache.
    pub async fn get_mode(&mut self) -> Result<Support<MeasureType>> {
        let result = self.driver.get_mode(&mut self.core).await?;
        match result {
            Support::Supported(kind) => self.mode = Some(kind),
            Support::Unsupported => tracing::warn!(
                instrument = %self.core.name(),
                operation = "get_mode",
                "Optional feature not implemented by this multimeter"
            ),
        }
        Ok(result)
    }

    /// Take a reading of `kind`, selecting the function only if the cached
    /// one differs.
    pub async fn measure(&mut self, kind: MeasureType) -> Result<f64> {
        if self.mode != Some(kind) {
            self.set_mode(kind).await?;
        }
        self.driver.read(&mut self.core).await
    }

    /// Take a reading in whatever function is selected.
    pub async fn read(&mut self) -> Result<f64> {
        self.driver.read(&mut self.core).await
    }

    /// Reset the meter and select DC voltage.
    pub async fn reset_device(&mut self) -> Result<()> {
        self.driver.reset(&mut self.core).await?;
        self.mode = None;
        self.set_mode(MeasureType::Voltage).await?;
        tracing::info!(instrument = %self.core.name(), "Multimeter reset");
        Ok(())
    }

    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        self.core.close().await
    }
}

impl Drop for Multimeter {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!(instrument = %self.core.name(), "Multimeter dropped without close()");
        }
    }
}

impl std::fmt::Debug for Multimeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multimeter")
            .field("instrument", &self.core.name())
            .field("mode", &self.mode)
            .finish()
    }
}
