//! Transport and backend traits for instrument communication.
//!
//! The [`Transport`] trait abstracts over the line-oriented text channel to
//! an instrument. Implementations exist for TCP sockets and serial ports
//! (in `benchlib-transport`), for a simulated instrument that answers
//! every query with a number, and for scripted mocks in
//! `benchlib-test-harness`.
//!
//! A [`Backend`] turns a resource locator such as `TCPIP::10.0.0.7::INSTR`
//! into an open transport. A [`Connection`](crate::Connection) holds a
//! [`BackendSet`] so it can reopen the link when it drops.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Asynchronous line-level transport to an instrument.
///
/// Framing (terminators, partial reads) is the implementation's job:
/// callers deal in whole command and response lines without terminators.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one command line without reading a reply.
    ///
    /// Live implementations pause briefly after the write so that slow
    /// instrument firmware is not overrun by the next command.
    async fn write(&mut self, command: &str) -> Result<()>;

    /// Send one command line and return the next response line.
    ///
    /// Returns [`Error::Timeout`](crate::Error::Timeout) if no complete line
    /// arrives within [`timeout`](Transport::timeout).
    async fn query(&mut self, command: &str) -> Result<String>;

    /// Current response timeout.
    fn timeout(&self) -> Duration;

    /// Change the response timeout for subsequent queries.
    fn set_timeout(&mut self, timeout: Duration);

    /// Close the transport.
    ///
    /// After `close()`, `write()` and `query()` return
    /// [`Error::NotConnected`](crate::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;

    /// Whether this transport talks to a simulated instrument.
    fn is_simulated(&self) -> bool {
        false
    }
}

/// Factory that opens transports for resource locators.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name for logging (e.g. `"native"`, `"simulated"`).
    fn name(&self) -> &str;

    /// Open a transport for `locator`.
    async fn open(&self, locator: &str) -> Result<Box<dyn Transport>>;

    /// Locators this backend can currently see.
    async fn list_resources(&self) -> Result<Vec<String>>;
}

/// The backends a connection draws on.
///
/// Each open attempt tries `primary` first and `fallback` second.
/// `simulated` serves endpoints flagged as simulated hardware.
#[derive(Clone)]
pub struct BackendSet {
    pub primary: Arc<dyn Backend>,
    pub fallback: Arc<dyn Backend>,
    pub simulated: Arc<dyn Backend>,
}

impl BackendSet {
    pub fn new(
        primary: Arc<dyn Backend>,
        fallback: Arc<dyn Backend>,
        simulated: Arc<dyn Backend>,
    ) -> Self {
        Self {
            primary,
            fallback,
            simulated,
        }
    }
}

impl std::fmt::Debug for BackendSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSet")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.name())
            .field("simulated", &self.simulated.name())
            .finish()
    }
}
