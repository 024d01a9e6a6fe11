//! Simulated instrument transport.
//!
//! [`SimulatedTransport`] accepts every write and answers every query with
//! a random number in `[0, 1)`. It lets a full setup run without hardware,
//! with the driver chosen up front by a forced driver name.

use std::time::Duration;

use async_trait::async_trait;
use benchlib_core::{Error, Result, Transport};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A transport with no instrument behind it.
#[derive(Debug)]
pub struct SimulatedTransport {
    locator: String,
    rng: StdRng,
    timeout: Duration,
    open: bool,
}

impl SimulatedTransport {
    /// A simulated transport seeded from OS entropy.
    pub fn new(locator: impl Into<String>) -> Self {
        Self::with_rng(locator, StdRng::from_entropy())
    }

    /// A simulated transport with reproducible replies.
    pub fn seeded(locator: impl Into<String>, seed: u64) -> Self {
        Self::with_rng(locator, StdRng::seed_from_u64(seed))
    }

    fn with_rng(locator: impl Into<String>, rng: StdRng) -> Self {
        let locator = locator.into();
        tracing::debug!(locator = %locator, "Opened simulated transport");
        Self {
            locator,
            rng,
            timeout: Duration::from_secs(2),
            open: true,
        }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn write(&mut self, command: &str) -> Result<()> {
        if !self.open {
            return Err(Error::NotConnected);
        }
        tracing::trace!(locator = %self.locator, command, "Simulated write");
        Ok(())
    }

    async fn query(&mut self, command: &str) -> Result<String> {
        if !self.open {
            return Err(Error::NotConnected);
        }
        let value: f64 = self.rng.gen();
        tracing::trace!(locator = %self.locator, command, value, "Simulated query");
        Ok(value.to_string())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.open
    }

    fn is_simulated(&self) -> bool {
        true
    }
}
