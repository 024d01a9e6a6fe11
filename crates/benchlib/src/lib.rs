//! # benchlib -- Uniform Control of Bench Instruments
//!
//! `benchlib` is an asynchronous Rust library for driving laboratory bench
//! instruments (power supplies, electronic loads, oscilloscopes and
//! multimeters) over SCPI-style text protocols. It is built for automated
//! test benches where one script talks to instruments from several vendors
//! and must not care which model is on the bench today.
//!
//! ## Quick Start
//!
//! Connect to whatever supply answers at an address and program it:
//!
//! ```no_run
//! use benchlib::{setup_power_supply, ChannelId, OptionValue};
//!
//! #[tokio::main]
//! async fn main() -> benchlib::Result<()> {
//!     let mut psu = setup_power_supply(
//!         "TCPIP::192.168.1.50::INSTR",
//!         [("EnableDebug", OptionValue::from(false))],
//!     )
//!     .await?;
//!
//!     psu.reset_device().await?;
//!     psu.set_voltage(ChannelId::CH1, 3.3).await?;
//!     psu.set_current(ChannelId::CH1, 0.5).await?;
//!     psu.enable_output(ChannelId::CH1).await?;
//!     println!("{} V", psu.measure_voltage(ChannelId::CH1).await?);
//!     psu.close().await
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                   | Purpose                                          |
//! |-------------------------|--------------------------------------------------|
//! | `benchlib-core`         | Traits, types, errors, connection, dispatch, category state machines |
//! | `benchlib-scpi`         | Line framing and value formatting                |
//! | `benchlib-transport`    | TCP, serial and simulated transports; resource parsing |
//! | `benchlib-drivers`      | Bundled drivers and the built-in registry        |
//! | **`benchlib`**          | This facade crate -- builder and setup functions |
//!
//! Identification picks the driver: the device is asked for its identity
//! and the registry finds the driver whose manufacturer and model both
//! appear in the reply. A driver can also be forced by name.
//!
//! ## Feature Flags
//!
//! | Feature   | Enables                                     | Default |
//! |-----------|---------------------------------------------|---------|
//! | `drivers` | The bundled drivers ([`drivers`] module)    | yes     |
//!
//! Without `drivers` the default registry is empty, and callers register
//! their own drivers through [`InstrumentBuilder::registry`].

pub mod builder;

pub use benchlib_core::*;

pub use builder::{
    InstrumentBuilder, OptionValue, OPTION_ENABLE_DEBUG, OPTION_FORCED_DRIVER,
    OPTION_SIMULATED_HW,
};

/// Line framing and value formatting.
pub mod scpi {
    pub use benchlib_scpi::*;
}

/// TCP, serial and simulated transports, and the native backends.
pub mod transports {
    pub use benchlib_transport::*;
}

/// Bundled instrument drivers.
///
/// Provides the driver structs, their descriptors in
/// [`models`](drivers::models), and the built-in registry.
#[cfg(feature = "drivers")]
pub mod drivers {
    pub use benchlib_drivers::*;
}

/// The registry used when a builder is not given one.
#[cfg(feature = "drivers")]
pub(crate) fn default_registry() -> &'static Registry {
    benchlib_drivers::builtin_registry()
}

#[cfg(not(feature = "drivers"))]
pub(crate) fn default_registry() -> &'static Registry {
    static EMPTY: std::sync::LazyLock<Registry> = std::sync::LazyLock::new(Registry::new);
    &EMPTY
}

fn builder_with<I, K, V>(resource: &str, options: I) -> Result<InstrumentBuilder>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<OptionValue>,
{
    InstrumentBuilder::new(resource).options(options)
}

/// Open, identify and set up the power supply at `resource`.
///
/// `options` is a configuration map with the keys `EnableDebug`,
/// `SimulatedHW` and `Forced_Driver`.
pub async fn setup_power_supply<I, K, V>(resource: &str, options: I) -> Result<PowerSupply>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<OptionValue>,
{
    builder_with(resource, options)?.build_power_supply().await
}

/// Open, identify and set up the electronic load at `resource`.
pub async fn setup_load<I, K, V>(resource: &str, options: I) -> Result<ElectronicLoad>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<OptionValue>,
{
    builder_with(resource, options)?.build_load().await
}

/// Open, identify and set up the oscilloscope at `resource`.
pub async fn setup_scope<I, K, V>(resource: &str, options: I) -> Result<Oscilloscope>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<OptionValue>,
{
    builder_with(resource, options)?.build_scope().await
}

/// Open, identify and set up the multimeter at `resource`.
pub async fn setup_meter<I, K, V>(resource: &str, options: I) -> Result<Multimeter>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<OptionValue>,
{
    builder_with(resource, options)?.build_meter().await
}

/// Resource locators the native backends can see (serial ports; LAN
/// instruments are not discovered).
pub async fn list_resources() -> Result<Vec<String>> {
    benchlib_core::list_resources(&benchlib_transport::default_backends()).await
}

/// Descriptors of every instrument the default registry knows.
///
/// # Example
///
/// ```
/// let instruments = benchlib::supported_instruments();
/// for d in &instruments {
///     println!("{} ({})", d, d.name());
/// }
/// ```
pub fn supported_instruments() -> Vec<InstrumentDescriptor> {
    default_registry().descriptors().copied().collect()
}
