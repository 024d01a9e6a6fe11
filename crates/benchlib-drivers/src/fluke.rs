//! Fluke 8840A multimeter.
//!
//! The 8840A predates SCPI. Functions are selected with `F<n>`, readings
//! are triggered with `?`, and `G<n>` reads back internal registers: `G0`
//! the configuration, `G3` the user string, `G7` the status word (used as
//! the operation-complete wait).

use async_trait::async_trait;

use benchlib_core::{
    extract_number, Error, Instrument, MeasureType, MeterDriver, OperationWait, Result, Support,
};

use crate::commands::unsupported_measurement;

/// Fluke 8840A multimeter.
#[derive(Debug, Default)]
pub struct Fluke8840a;

/// `F<n>` function code of a measurement.
fn function_code(kind: MeasureType) -> Result<&'static str> {
    match kind {
        MeasureType::Voltage => Ok("F1"),
        MeasureType::VoltageAc => Ok("F2"),
        MeasureType::Resistance => Ok("F3"),
        MeasureType::Resistance4W => Ok("F4"),
        MeasureType::Current => Ok("F5"),
        MeasureType::CurrentAc => Ok("F6"),
        other => Err(unsupported_measurement("8840A", other)),
    }
}

/// Interpret a `G0` reply. It is four digits (function, range, rate,
/// trigger); only the first one matters here.
fn parse_configuration(reply: &str) -> Result<MeasureType> {
    let reply = reply.trim();
    if reply.len() != 4 {
        return Err(Error::Protocol(format!("bad G0 reply {reply:?}")));
    }
    match reply.as_bytes()[0] {
        b'1' => Ok(MeasureType::Voltage),
        b'2' => Ok(MeasureType::VoltageAc),
        b'3' => Ok(MeasureType::Resistance),
        b'4' => Ok(MeasureType::Resistance4W),
        b'5' => Ok(MeasureType::Current),
        b'6' => Ok(MeasureType::CurrentAc),
        _ => Err(Error::Protocol(format!("unknown 8840A function in {reply:?}"))),
    }
}

#[async_trait]
impl MeterDriver for Fluke8840a {
    fn operation_wait(&self) -> OperationWait {
        OperationWait::Query("G7")
    }

    async fn reset(&self, io: &mut Instrument) -> Result<()> {
        io.write("*").await
    }

    async fn set_mode(&self, io: &mut Instrument, kind: MeasureType) -> Result<()> {
        io.write(function_code(kind)?).await
    }

    async fn get_mode(&self, io: &mut Instrument) -> Result<Support<MeasureType>> {
        let reply = io.query("G0").await?;
        parse_configuration(&reply).map(Support::Supported)
    }

    async fn read(&self, io: &mut Instrument) -> Result<f64> {
        let reply = io.query("?").await?;
        Ok(extract_number(&reply))
    }
}
