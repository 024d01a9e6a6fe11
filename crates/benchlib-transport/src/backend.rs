//! Backends that open live and simulated transports from locators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use benchlib_core::{Backend, BackendSet, Result, Transport};

use crate::resource::ResourceAddress;
use crate::serial::{available_ports, SerialConfig, SerialTransport};
use crate::simulated::SimulatedTransport;
use crate::tcp::TcpTransport;

/// Connect timeout of the primary backend.
pub const PRIMARY_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Connect timeout of the fallback backend.
pub const FALLBACK_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens TCP sockets and serial ports directly.
#[derive(Debug, Clone)]
pub struct NativeBackend {
    name: &'static str,
    connect_timeout: Duration,
    serial: SerialConfig,
}

impl NativeBackend {
    /// The primary backend: short connect timeout.
    pub fn primary() -> Self {
        Self {
            name: "native",
            connect_timeout: PRIMARY_CONNECT_TIMEOUT,
            serial: SerialConfig::default(),
        }
    }

    /// The fallback backend: a patient second try for slow networks.
    pub fn fallback() -> Self {
        Self {
            name: "native-fallback",
            connect_timeout: FALLBACK_CONNECT_TIMEOUT,
            serial: SerialConfig::default(),
        }
    }

    /// Use `config` for serial resources.
    pub fn with_serial_config(mut self, config: SerialConfig) -> Self {
        self.serial = config;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

#[async_trait]
impl Backend for NativeBackend {
    fn name(&self) -> &str {
        self.name
    }

    async fn open(&self, locator: &str) -> Result<Box<dyn Transport>> {
        match ResourceAddress::parse(locator)? {
            ResourceAddress::Tcp { host, port } => {
                let addr = format!("{host}:{port}");
                let transport = TcpTransport::connect_with_timeout(&addr, self.connect_timeout).await?;
                Ok(Box::new(transport))
            }
            ResourceAddress::Serial { port } => {
                let transport = SerialTransport::open_with_config(&port, self.serial.clone()).await?;
                Ok(Box::new(transport))
            }
        }
    }

    /// Serial ports as `ASRL<port>::INSTR`. LAN instruments cannot be
    /// discovered without VXI-11 and are not listed.
    async fn list_resources(&self) -> Result<Vec<String>> {
        let ports = available_ports()?;
        tracing::debug!(backend = self.name, count = ports.len(), "Enumerated serial ports");
        Ok(ports
            .into_iter()
            .map(|port| ResourceAddress::Serial { port }.to_string())
            .collect())
    }
}

/// Opens [`SimulatedTransport`]s for any locator.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    seed: Option<u64>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transport opened gets the same seeded reply sequence.
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

#[async_trait]
impl Backend for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn open(&self, locator: &str) -> Result<Box<dyn Transport>> {
        let transport = match self.seed {
            Some(seed) => SimulatedTransport::seeded(locator, seed),
            None => SimulatedTransport::new(locator),
        };
        Ok(Box::new(transport))
    }

    async fn list_resources(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Native primary and fallback backends plus the simulated backend.
pub fn default_backends() -> BackendSet {
    BackendSet::new(
        Arc::new(NativeBackend::primary()),
        Arc::new(NativeBackend::fallback()),
        Arc::new(SimulatedBackend::new()),
    )
}
