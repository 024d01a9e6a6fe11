//! InstrumentBuilder -- fluent builder for connected, identified
//! instruments.
//!
//! Separates configuration from construction: the resource, transport kind,
//! simulation and driver overrides, retry policy and backends are all set
//! up front, then one of the `build_*` methods opens the endpoint,
//! identifies the device and hands back the category wrapper.
//!
//! # Example
//!
//! ```no_run
//! use benchlib::{ChannelId, InstrumentBuilder, TransportKind};
//!
//! # async fn example() -> benchlib::Result<()> {
//! let mut psu = InstrumentBuilder::new("192.168.1.50")
//!     .transport_kind(TransportKind::Ethernet)
//!     .build_power_supply()
//!     .await?;
//!
//! psu.set_voltage(ChannelId::CH1, 5.0).await?;
//! psu.enable_output(ChannelId::CH1).await?;
//! psu.close().await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use benchlib_core::{
    BackendSet, Category, ConfirmOverride, Connection, DriverFactory, ElectronicLoad,
    EndpointSpec, Error, Instrument, InstrumentDescriptor, Multimeter, Oscilloscope, PowerSupply,
    Registry, Result, RetryPolicy, TransportKind,
};

/// Configuration-map key: echo every exchange (`bool`).
pub const OPTION_ENABLE_DEBUG: &str = "EnableDebug";
/// Configuration-map key: use simulated hardware (`bool`).
pub const OPTION_SIMULATED_HW: &str = "SimulatedHW";
/// Configuration-map key: driver to use, as `manufacturer_model` (text).
pub const OPTION_FORCED_DRIVER: &str = "Forced_Driver";

/// A value in a setup configuration map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Text(String),
}

impl OptionValue {
    fn kind(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "a boolean",
            OptionValue::Text(_) => "text",
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

/// Fluent builder for instruments.
///
/// The simplest usage needs only a locator; identification picks the
/// driver from the built-in registry:
///
/// ```ignore
/// let dmm = InstrumentBuilder::new("TCPIP::10.0.0.9::5025::SOCKET")
///     .build_meter()
///     .await?;
/// ```
#[derive(Clone)]
pub struct InstrumentBuilder {
    resource: String,
    kind: TransportKind,
    simulated: bool,
    forced_driver: Option<String>,
    debug: bool,
    policy: RetryPolicy,
    backends: Option<BackendSet>,
    registry: Option<Registry>,
    confirm: Option<Arc<ConfirmOverride>>,
}

impl InstrumentBuilder {
    /// Create a builder for `resource`, a locator or (with
    /// [`TransportKind::Ethernet`]) a bare host.
    pub fn new(resource: impl Into<String>) -> Self {
        InstrumentBuilder {
            resource: resource.into(),
            kind: TransportKind::Raw,
            simulated: false,
            forced_driver: None,
            debug: false,
            policy: RetryPolicy::default(),
            backends: None,
            registry: None,
            confirm: None,
        }
    }

    /// How to interpret the resource (default: [`TransportKind::Raw`]).
    pub fn transport_kind(mut self, kind: TransportKind) -> Self {
        self.kind = kind;
        self
    }

    /// Talk to simulated hardware. Requires a forced driver.
    pub fn simulated(mut self, simulated: bool) -> Self {
        self.simulated = simulated;
        self
    }

    /// Use the driver registered as `name` instead of auto-detecting.
    pub fn forced_driver(mut self, name: impl Into<String>) -> Self {
        self.forced_driver = Some(name.into());
        self
    }

    /// Echo every command, its elapsed time and the response at `info`.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Open transports through `backends` instead of the native ones.
    pub fn backends(mut self, backends: BackendSet) -> Self {
        self.backends = Some(backends);
        self
    }

    /// Identify against `registry` instead of the built-in one.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Ask `confirm` before using a forced driver on a device that does not
    /// identify as anything known. Without it such a device is rejected.
    pub fn confirm_override<F>(mut self, confirm: F) -> Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        self.confirm = Some(Arc::new(confirm));
        self
    }

    /// Apply one configuration-map entry.
    ///
    /// Unknown keys are logged and ignored. A value of the wrong type is
    /// [`Error::InvalidParameter`].
    pub fn option(mut self, key: &str, value: impl Into<OptionValue>) -> Result<Self> {
        let value = value.into();
        match (key, value) {
            (OPTION_ENABLE_DEBUG, OptionValue::Bool(on)) => self.debug = on,
            (OPTION_SIMULATED_HW, OptionValue::Bool(on)) => self.simulated = on,
            (OPTION_FORCED_DRIVER, OptionValue::Text(name)) => self.forced_driver = Some(name),
            (OPTION_ENABLE_DEBUG | OPTION_SIMULATED_HW, other) => {
                return Err(Error::InvalidParameter(format!(
                    "option {key} takes a boolean, got {}",
                    other.kind()
                )));
            }
            (OPTION_FORCED_DRIVER, other) => {
                return Err(Error::InvalidParameter(format!(
                    "option {key} takes text, got {}",
                    other.kind()
                )));
            }
            (unknown, _) => {
                tracing::warn!(option = unknown, "Ignoring unknown setup option");
            }
        }
        Ok(self)
    }

    /// Apply every entry of a configuration map.
    pub fn options<I, K, V>(self, options: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<OptionValue>,
    {
        options
            .into_iter()
            .try_fold(self, |builder, (key, value)| builder.option(key.as_ref(), value))
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    fn registry_ref(&self) -> &Registry {
        match &self.registry {
            Some(registry) => registry,
            None => crate::default_registry(),
        }
    }

    fn spec(&self) -> EndpointSpec {
        let spec = EndpointSpec::new(self.resource.clone(), self.kind)
            .simulated(self.simulated)
            .debug(self.debug);
        match &self.forced_driver {
            Some(name) => spec.forced_driver(name.clone()),
            None => spec,
        }
    }

    /// Open, identify and check the category. The connection is closed
    /// again on any failure after opening.
    async fn connect(&self, requested: Category) -> Result<(Instrument, DriverFactory)> {
        let backends = self
            .backends
            .clone()
            .unwrap_or_else(benchlib_transport::default_backends);
        let mut connection = Connection::open(self.spec(), backends, self.policy.clone()).await?;

        match self.resolve(&mut connection, requested).await {
            Ok((name, descriptor, factory)) => {
                tracing::debug!(
                    locator = %connection.locator(),
                    driver = %name,
                    "Instrument driver selected"
                );
                Ok((Instrument::new(connection, name, descriptor), factory))
            }
            Err(e) => {
                if let Err(close_err) = connection.close().await {
                    tracing::debug!(error = %close_err, "Close after failed setup also failed");
                }
                Err(e)
            }
        }
    }

    async fn resolve(
        &self,
        connection: &mut Connection,
        requested: Category,
    ) -> Result<(String, InstrumentDescriptor, DriverFactory)> {
        let registry = self.registry_ref();
        let name = connection
            .identify(registry, self.confirm.as_deref())
            .await?;

        let entry = registry.lookup(&name).ok_or_else(|| {
            Error::Initialization(format!("driver '{name}' is not registered"))
        })?;
        let descriptor = *entry.descriptor();

        if descriptor.category != requested {
            return Err(Error::Initialization(format!(
                "incorrect device type, {} is a {}, not a {}",
                descriptor.model, descriptor.category, requested
            )));
        }
        Ok((entry.name().to_string(), descriptor, entry.factory()))
    }

    /// Build a power supply.
    pub async fn build_power_supply(&self) -> Result<PowerSupply> {
        let (io, factory) = self.connect(Category::PowerSupply).await?;
        match factory {
            DriverFactory::PowerSupply(build) => PowerSupply::setup(io, build()).await,
            other => Err(release(io, mismatched_factory(other, Category::PowerSupply)).await),
        }
    }

    /// Build an electronic load.
    pub async fn build_load(&self) -> Result<ElectronicLoad> {
        let (io, factory) = self.connect(Category::Load).await?;
        match factory {
            DriverFactory::Load(build) => ElectronicLoad::setup(io, build()).await,
            other => Err(release(io, mismatched_factory(other, Category::Load)).await),
        }
    }

    /// Build an oscilloscope.
    pub async fn build_scope(&self) -> Result<Oscilloscope> {
        let (io, factory) = self.connect(Category::Scope).await?;
        match factory {
            DriverFactory::Scope(build) => Oscilloscope::setup(io, build()).await,
            other => Err(release(io, mismatched_factory(other, Category::Scope)).await),
        }
    }

    /// Build a multimeter.
    pub async fn build_meter(&self) -> Result<Multimeter> {
        let (io, factory) = self.connect(Category::Meter).await?;
        match factory {
            DriverFactory::Meter(build) => Multimeter::setup(io, build()).await,
            other => Err(release(io, mismatched_factory(other, Category::Meter)).await),
        }
    }
}

/// Close an instrument that will not be handed out and return `err`.
async fn release(mut io: Instrument, err: Error) -> Error {
    if let Err(close_err) = io.close().await {
        tracing::debug!(error = %close_err, "Close after failed setup also failed");
    }
    err
}

// Registration already ties factory and descriptor categories together.
fn mismatched_factory(factory: DriverFactory, requested: Category) -> Error {
    Error::Initialization(format!(
        "driver factory builds a {}, not a {requested}",
        factory.category()
    ))
}

impl fmt::Debug for InstrumentBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentBuilder")
            .field("resource", &self.resource)
            .field("kind", &self.kind)
            .field("simulated", &self.simulated)
            .field("forced_driver", &self.forced_driver)
            .field("debug", &self.debug)
            .field("policy", &self.policy)
            .field("backends", &self.backends)
            .field("custom_registry", &self.registry.is_some())
            .field("confirm_override", &self.confirm.is_some())
            .finish()
    }
}
