//! Teledyne LeCroy HDO6104 oscilloscope.
//!
//! The HDO uses the classic LeCroy remote command tree, which the Siglent
//! SDS family also follows; the commands live in [`crate::commands`]. The
//! HDO answers `PAVA?` with the bare value once `COMM_HEADER OFF` is set,
//! so the header is switched off during initialization.

use async_trait::async_trait;

use benchlib_core::{ChannelId, HDiv, Instrument, Result, ScopeDriver, Stats, VDiv};

use crate::commands;

/// LeCroy HDO6104 oscilloscope.
#[derive(Debug, Default)]
pub struct Hdo6104;

#[async_trait]
impl ScopeDriver for Hdo6104 {
    async fn initialize(&self, io: &mut Instrument) -> Result<()> {
        io.write("COMM_HEADER OFF").await
    }

    async fn reset(&self, io: &mut Instrument) -> Result<()> {
        io.write("*RST").await?;
        io.write("COMM_HEADER OFF").await
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

    async fn measure(&self, io: &mut Instrument, channel: ChannelId, stat: Stats) -> Result<f64> {
        io.query_number(&commands::cmd_parameter_value(channel, stat))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models;
    use crate::testing::instrument_on;
    use benchlib_test_harness::MockTransport;

    #[tokio::test]
    async fn initialize_drops_response_headers() {
        let mock = MockTransport::new();
        mock.expect_write("COMM_HEADER OFF");
        let mut io = instrument_on(&mock, models::hdo6104()).await;
        Hdo6104.initialize(&mut io).await.unwrap();
    }

    #[tokio::test]
    async fn channel_setup_and_measurement() {
        let mock = MockTransport::new();
        mock.expect_write("C4:TRA OFF");
        mock.expect_write("C1:OFST 0.5");
        mock.expect_write("C1:VDIV 200e-3");
        mock.expect_query("C1:PAVA? RMS", "3.5355E-01");
        let mut io = instrument_on(&mock, models::hdo6104()).await;

        let hdo = Hdo6104;
        hdo.set_channel_display(&mut io, ChannelId::CH4, false).await.unwrap();
        hdo.set_vertical_offset(&mut io, ChannelId::CH1, 0.5).await.unwrap();
        hdo.set_vertical_scale(&mut io, ChannelId::CH1, VDiv::Mv200).await.unwrap();
        let rms = hdo.measure(&mut io, ChannelId::CH1, Stats::Rms).await.unwrap();
        assert_eq!(rms, 0.35355);
    }
}
