//! Connection to one instrument endpoint.
//!
//! A [`Connection`] owns exactly one [`Transport`] and knows how to get it
//! back when it drops. It also runs identification: given a [`Registry`],
//! it works out which driver the device behind the endpoint needs.
//!
//! Opening is retried (`open_attempts`, primary backend then fallback
//! backend each time, one backoff between attempts). Identification is
//! never retried.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::transport::{BackendSet, Transport};
use crate::types::{ReadWrite, TransportKind};

/// Caller-supplied description of the endpoint to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    /// Resource locator, or a bare host for [`TransportKind::Ethernet`].
    pub resource: String,
    pub kind: TransportKind,
    /// Talk to the simulated backend instead of hardware.
    pub simulated: bool,
    /// Registration name of the driver to use (`manufacturer_model`).
    pub forced_driver: Option<String>,
    /// Echo every exchange at `info` level.
    pub debug: bool,
}

impl EndpointSpec {
    pub fn new(resource: impl Into<String>, kind: TransportKind) -> Self {
        Self {
            resource: resource.into(),
            kind,
            simulated: false,
            forced_driver: None,
            debug: false,
        }
    }

    pub fn simulated(mut self, simulated: bool) -> Self {
        self.simulated = simulated;
        self
    }

    pub fn forced_driver(mut self, name: impl Into<String>) -> Self {
        self.forced_driver = Some(name.into());
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Build the transport locator for a resource.
///
/// `Raw` passes the resource through and `Ethernet` wraps a bare host as
/// `TCPIP::<host>::INSTR`. The other kinds need a pre-formed locator and
/// must be given as `Raw`.
///
/// ```
/// use benchlib_core::{format_locator, TransportKind};
///
/// assert_eq!(
///     format_locator("10.0.0.7", TransportKind::Ethernet).unwrap(),
///     "TCPIP::10.0.0.7::INSTR"
/// );
/// assert_eq!(
///     format_locator("ASRL3::INSTR", TransportKind::Raw).unwrap(),
///     "ASRL3::INSTR"
/// );
/// assert!(format_locator("GPIB0::5::INSTR", TransportKind::Gpib).is_err());
/// ```
pub fn format_locator(resource: &str, kind: TransportKind) -> Result<String> {
    match kind {
        TransportKind::Raw => Ok(resource.to_string()),
        TransportKind::Ethernet => Ok(format!("TCPIP::{resource}::INSTR")),
        TransportKind::Gpib | TransportKind::Usb | TransportKind::Rs232 => {
            Err(Error::InvalidParameter(format!(
                "{kind} locators are not synthesized; supply a fully-formed locator with the RAW transport kind"
            )))
        }
    }
}

/// Retry and timing parameters for connections and command dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts to open the transport.
    pub open_attempts: u32,
    /// Total attempts for one command, the first included.
    pub send_attempts: u32,
    /// Attempts to reopen the transport after the link drops.
    pub reconnect_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
    /// Response timeout while probing identity commands.
    pub identify_timeout: Duration,
    /// Identity responses shorter than this are queried a second time.
    pub short_response_len: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            open_attempts: 3,
            send_attempts: 5,
            reconnect_attempts: 15,
            backoff: Duration::from_secs(1),
            identify_timeout: Duration::from_millis(1500),
            short_response_len: 8,
        }
    }
}

/// Callback asked whether to keep a forced driver whose device did not
/// identify as anything known. Receives the driver name and the raw
/// identity response.
pub type ConfirmOverride = dyn Fn(&str, &str) -> bool + Send + Sync;

/// One open endpoint.
pub struct Connection {
    spec: EndpointSpec,
    locator: String,
    transport: Box<dyn Transport>,
    backends: BackendSet,
    policy: RetryPolicy,
    reconnects: u32,
}

impl Connection {
    /// Open the endpoint described by `spec`.
    ///
    /// Simulated endpoints open the simulated backend once. Live endpoints
    /// get `policy.open_attempts` tries.
    pub async fn open(spec: EndpointSpec, backends: BackendSet, policy: RetryPolicy) -> Result<Self> {
        let locator = format_locator(&spec.resource, spec.kind)?;

        let transport = if spec.simulated {
            backends.simulated.open(&locator).await?
        } else {
            open_with_fallback(&backends, &locator, policy.open_attempts, policy.backoff).await?
        };

        tracing::info!(
            locator = %locator,
            simulated = spec.simulated,
            "Connection opened"
        );

        Ok(Self {
            spec,
            locator,
            transport,
            backends,
            policy,
            reconnects: 0,
        })
    }

    /// Work out which registered driver the device needs.
    ///
    /// Returns the driver's registration name.
    pub async fn identify(
        &mut self,
        registry: &Registry,
        confirm: Option<&ConfirmOverride>,
    ) -> Result<String> {
        if self.spec.simulated {
            return match &self.spec.forced_driver {
                Some(name) => Ok(name.to_lowercase()),
                None => Err(Error::Initialization(
                    "which device should be simulated? set a forced driver for simulated hardware"
                        .into(),
                )),
            };
        }

        match self.spec.forced_driver.clone() {
            Some(forced) => self.identify_forced(registry, &forced, confirm).await,
            None => self.identify_auto(registry).await,
        }
    }

    async fn identify_forced(
        &mut self,
        registry: &Registry,
        forced: &str,
        confirm: Option<&ConfirmOverride>,
    ) -> Result<String> {
        let entry = registry.lookup(forced).ok_or_else(|| {
            Error::Initialization(format!("forced driver '{forced}' is not registered"))
        })?;
        let name = entry.name().to_string();

        // A silent device is treated like an unrecognised one.
        let response = self
            .ask_identity(entry.descriptor().id_command)
            .await?
            .unwrap_or_default();

        match registry.match_identity(&response) {
            Some(found) if found.name() == name => Ok(name),
            Some(found) => Err(Error::Initialization(format!(
                "forced driver '{name}' does not match the connected device, which identifies as '{}'",
                found.name()
            ))),
            None => {
                let accepted = confirm.is_some_and(|ask| ask(&name, &response));
                if accepted {
                    tracing::warn!(
                        locator = %self.locator,
                        driver = %name,
                        response = %response,
                        "Device identity not recognised, using forced driver on caller override"
                    );
                    Ok(name)
                } else {
                    Err(Error::Connection(format!(
                        "device at {} did not identify as {name} (response: {response:?})",
                        self.locator
                    )))
                }
            }
        }
    }

    async fn identify_auto(&mut self, registry: &Registry) -> Result<String> {
        for command in registry.id_commands_by_frequency() {
            let Some(response) = self.ask_identity(command).await? else {
                continue;
            };
            if let Some(found) = registry.match_identity(&response) {
                tracing::info!(
                    locator = %self.locator,
                    driver = %found.name(),
                    "Instrument identified"
                );
                return Ok(found.name().to_string());
            }
            tracing::debug!(command, response = %response, "Identity not recognised");
        }

        Err(Error::Connection(format!(
            "unable to identify the device at {}",
            self.locator
        )))
    }

    /// Query an identity command under the identify timeout.
    ///
    /// `Ok(None)` means the device timed out on this command.
    async fn ask_identity(&mut self, command: &str) -> Result<Option<String>> {
        let original = self.transport.timeout();
        self.transport.set_timeout(self.policy.identify_timeout);
        let result = self.ask_identity_once(command).await;
        self.transport.set_timeout(original);

        match result {
            Ok(response) => Ok(Some(response)),
            Err(Error::Timeout) => {
                tracing::debug!(command, locator = %self.locator, "Identity query timed out");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn ask_identity_once(&mut self, command: &str) -> Result<String> {
        let response = self.exchange(command, ReadWrite::Read).await?;
        if response.len() >= self.policy.short_response_len {
            return Ok(response);
        }
        tracing::debug!(command, response = %response, "Short identity response, asking again");
        self.exchange(command, ReadWrite::Read).await
    }

    /// Run one command against the transport, without retry.
    ///
    /// Writes return an empty string. Responses are trimmed of line
    /// terminators.
    pub async fn exchange(&mut self, command: &str, rw: ReadWrite) -> Result<String> {
        let started = Instant::now();
        let response = match rw.resolve(command) {
            ReadWrite::Write => {
                self.transport.write(command).await?;
                String::new()
            }
            _ => self.transport.query(command).await?,
        };
        let response = response.trim_matches(['\r', '\n']).to_string();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        if self.spec.debug {
            tracing::info!(
                locator = %self.locator,
                command,
                elapsed_ms,
                response = %response,
                simulated = self.is_simulated(),
                "Instrument exchange"
            );
        } else {
            tracing::trace!(
                locator = %self.locator,
                command,
                elapsed_ms,
                response = %response,
                simulated = self.is_simulated(),
                "Instrument exchange"
            );
        }

        Ok(response)
    }

    /// Close and reopen the transport.
    ///
    /// Does nothing for simulated endpoints. The response timeout in force
    /// before the reconnect carries over.
    pub async fn reconnect(&mut self) -> Result<()> {
        if self.is_simulated() {
            tracing::debug!(locator = %self.locator, "Simulated connection, skipping reconnect");
            return Ok(());
        }

        let timeout = self.transport.timeout();
        if let Err(e) = self.transport.close().await {
            tracing::warn!(locator = %self.locator, error = %e, "Error closing transport before reconnect");
        }

        let mut transport = open_with_fallback(
            &self.backends,
            &self.locator,
            self.policy.reconnect_attempts,
            self.policy.backoff,
        )
        .await?;
        transport.set_timeout(timeout);
        self.transport = transport;
        self.reconnects += 1;

        tracing::info!(
            locator = %self.locator,
            reconnects = self.reconnects,
            "Reconnected to instrument"
        );
        Ok(())
    }

    /// Close the transport.
    pub async fn close(&mut self) -> Result<()> {
        tracing::debug!(locator = %self.locator, "Closing connection");
        self.transport.close().await
    }

    pub fn spec(&self) -> &EndpointSpec {
        &self.spec
    }

    /// The locator the transport was opened with.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Number of successful reconnects so far.
    pub fn reconnect_count(&self) -> u32 {
        self.reconnects
    }

    pub fn is_simulated(&self) -> bool {
        self.spec.simulated || self.transport.is_simulated()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn timeout(&self) -> Duration {
        self.transport.timeout()
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.transport.set_timeout(timeout);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("locator", &self.locator)
            .field("simulated", &self.is_simulated())
            .field("connected", &self.transport.is_connected())
            .field("reconnects", &self.reconnects)
            .finish()
    }
}

/// Locators visible to either backend, sorted and deduplicated.
///
/// A backend that fails to list is logged and skipped; the call only
/// fails when both do.
pub async fn list_resources(backends: &BackendSet) -> Result<Vec<String>> {
    let mut found = BTreeSet::new();
    let mut last_error = None;
    let mut listed = false;

    for backend in [&backends.primary, &backends.fallback] {
        match backend.list_resources().await {
            Ok(resources) => {
                listed = true;
                found.extend(resources);
            }
            Err(e) => {
                tracing::warn!(backend = backend.name(), error = %e, "Failed to list resources");
                last_error = Some(e);
            }
        }
    }

    match (listed, last_error) {
        (false, Some(e)) => Err(e),
        _ => Ok(found.into_iter().collect()),
    }
}

async fn open_with_fallback(
    backends: &BackendSet,
    locator: &str,
    attempts: u32,
    backoff: Duration,
) -> Result<Box<dyn Transport>> {
    let mut last_error = None;

    for attempt in 1..=attempts {
        match backends.primary.open(locator).await {
            Ok(transport) => return Ok(transport),
            Err(e) => {
                tracing::debug!(
                    backend = backends.primary.name(),
                    locator,
                    attempt,
                    error = %e,
                    "Primary backend failed, trying fallback"
                );
            }
        }

        match backends.fallback.open(locator).await {
            Ok(transport) => return Ok(transport),
            Err(e) => {
                tracing::warn!(
                    backend = backends.fallback.name(),
                    locator,
                    attempt,
                    error = %e,
                    "Failed to open instrument"
                );
                last_error = Some(e);
            }
        }

        if attempt < attempts {
            tokio::time::sleep(backoff).await;
        }
    }

    tracing::error!(locator, attempts, "Giving up on instrument");
    let cause = last_error.map(|e| format!(" ({e})")).unwrap_or_default();
    Err(Error::Connection(format!(
        "failed to connect to device after {attempts} attempts: {locator}{cause}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ethernet_wraps_host() {
        assert_eq!(
            format_locator("bench-psu.lan", TransportKind::Ethernet).unwrap(),
            "TCPIP::bench-psu.lan::INSTR"
        );
    }

    #[test]
    fn raw_passes_through() {
        assert_eq!(
            format_locator("TCPIP::10.0.0.7::5025::SOCKET", TransportKind::Raw).unwrap(),
            "TCPIP::10.0.0.7::5025::SOCKET"
        );
    }

    #[test]
    fn preformed_kinds_rejected() {
        for kind in [TransportKind::Gpib, TransportKind::Usb, TransportKind::Rs232] {
            let err = format_locator("whatever", kind).unwrap_err();
            assert!(matches!(err, Error::InvalidParameter(_)), "{kind}");
        }
    }

    #[test]
    fn retry_policy_defaults() {
        let p = RetryPolicy::default();
        assert_eq!(p.open_attempts, 3);
        assert_eq!(p.send_attempts, 5);
        assert_eq!(p.reconnect_attempts, 15);
        assert_eq!(p.backoff, Duration::from_secs(1));
        assert_eq!(p.identify_timeout, Duration::from_millis(1500));
        assert_eq!(p.short_response_len, 8);
    }

    #[test]
    fn endpoint_builder() {
        let spec = EndpointSpec::new("10.0.0.7", TransportKind::Ethernet)
            .simulated(true)
            .forced_driver("Siglent_SPD1168X")
            .debug(true);
        assert!(spec.simulated);
        assert!(spec.debug);
        assert_eq!(spec.forced_driver.as_deref(), Some("Siglent_SPD1168X"));
    }
}
