//! HP 3458A multimeter.
//!
//! The 3458A uses its own HP-IB command language. It has no
//! operation-complete query, so commands are paced with a fixed delay, and
//! with `END ALWAYS` set every reading is simply read off the bus without a
//! trigger command.

use std::time::Duration;

use async_trait::async_trait;

use benchlib_core::{
    extract_number, Instrument, MeasureType, MeterDriver, OperationWait, ReadWrite, Result,
    Support,
};

use crate::commands::unsupported_measurement;

/// Pause between commands on the 3458A.
pub const HP3458A_COMMAND_DELAY: Duration = Duration::from_millis(100);

/// HP 3458A multimeter.
#[derive(Debug, Default)]
pub struct Hp3458a;

impl Hp3458a {
    async fn end_always(io: &mut Instrument) -> Result<()> {
        io.send("END ALWAYS", ReadWrite::Write, true).await.map(|_| ())
    }
}

#[async_trait]
impl MeterDriver for Hp3458a {
    fn operation_wait(&self) -> OperationWait {
        OperationWait::Delay(HP3458A_COMMAND_DELAY)
    }

    async fn initialize(&self, io: &mut Instrument) -> Result<()> {
        Self::end_always(io).await
    }

    async fn reset(&self, io: &mut Instrument) -> Result<()> {
        io.write("RESET").await?;
        Self::end_always(io).await
    }

    async fn set_mode(&self, io: &mut Instrument, kind: MeasureType) -> Result<()> {
        let function = match kind {
            MeasureType::Voltage => "DCV",
            MeasureType::VoltageAc => "ACV",
            MeasureType::Current => "DCI",
            MeasureType::CurrentAc => "ACI",
            MeasureType::Resistance => "OHM",
            MeasureType::Frequency => "FREQ",
            other => return Err(unsupported_measurement("3458A", other)),
        };
        io.write(function).await
    }

    async fn get_mode(&self, _io: &mut Instrument) -> Result<Support<MeasureType>> {
        Ok(Support::Unsupported)
    }

    async fn read(&self, io: &mut Instrument) -> Result<f64> {
        let reply = io.send("", ReadWrite::Read, false).await?;
        Ok(extract_number(&reply))
    }
}
