//! benchlib-core: Core traits, types and state machines for benchlib.
//!
//! This crate defines the vendor-agnostic abstractions that every
//! instrument driver builds on. Test software depends on these types
//! without pulling in any specific transport or driver.
//!
//! # Key types
//!
//! - [`Transport`] / [`Backend`] -- line-level channel to an instrument
//! - [`Registry`] -- catalog of drivers and identity matching
//! - [`Connection`] -- one open endpoint, with reconnect and identification
//! - [`Instrument`] -- command dispatch with sync, retry and channel checks
//! - [`PowerSupply`], [`ElectronicLoad`], [`Oscilloscope`], [`Multimeter`]
//!   -- the category state machines
//! - [`Error`] / [`Result`] -- error handling

pub mod connection;
pub mod descriptor;
pub mod error;
pub mod helpers;
pub mod instrument;
pub mod load;
pub mod meter;
pub mod psu;
pub mod registry;
pub mod scope;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export key types at crate root for ergonomic `use benchlib_core::*`.
pub use connection::{
    format_locator, list_resources, ConfirmOverride, Connection, EndpointSpec, RetryPolicy,
};
pub use descriptor::InstrumentDescriptor;
pub use error::{Error, Result};
pub use helpers::{extract_number, extract_numbers, parse_numbers};
pub use instrument::{Instrument, OperationWait};
pub use load::{ElectronicLoad, LoadDriver};
pub use meter::{MeterDriver, Multimeter};
pub use psu::{PowerSupply, PowerSupplyDriver};
pub use registry::{DriverFactory, RegisteredDriver, Registry};
pub use scope::{Oscilloscope, ScopeDriver};
pub use transport::{Backend, BackendSet, Transport};
pub use types::*;
