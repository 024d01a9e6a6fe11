//! The capability core shared by every instrument category.
//!
//! [`Instrument`] binds one [`Connection`] to the [`InstrumentDescriptor`]
//! that identification chose. Drivers talk to the device exclusively
//! through it, which gives every command the same treatment:
//!
//! 1. the driver's operation-complete wait, unless skipped;
//! 2. automatic read/write classification (`?` means query);
//! 3. local retry of I/O-class failures, with a reconnect when the link
//!    itself is gone.
//!
//! Channel checks also live here so that a bad channel never reaches the
//! wire.

use std::time::Duration;

use crate::connection::Connection;
use crate::descriptor::InstrumentDescriptor;
use crate::error::{Error, Result};
use crate::helpers::extract_numbers;
use crate::types::{ChannelId, ReadWrite};

/// How a driver waits for the device to finish the previous command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationWait {
    /// Send this query and discard the reply (e.g. `*OPC?`).
    Query(&'static str),
    /// Sleep for a fixed time.
    Delay(Duration),
    /// Do not wait.
    None,
}

/// One connected, identified instrument.
#[derive(Debug)]
pub struct Instrument {
    connection: Connection,
    name: String,
    descriptor: InstrumentDescriptor,
    sync: OperationWait,
    closed: bool,
}

impl Instrument {
    /// Bind `connection` to the driver registered as `name`.
    ///
    /// The operation wait starts as [`OperationWait::None`]; category
    /// wrappers install the driver's own during setup.
    pub fn new(
        connection: Connection,
        name: impl Into<String>,
        descriptor: InstrumentDescriptor,
    ) -> Self {
        Self {
            connection,
            name: name.into(),
            descriptor,
            sync: OperationWait::None,
            closed: false,
        }
    }

    pub fn set_operation_wait(&mut self, sync: OperationWait) {
        self.sync = sync;
    }

    pub fn operation_wait(&self) -> OperationWait {
        self.sync
    }

    /// Send a command and return its response (empty for writes).
    ///
    /// Unless `skip_sync` is set, the operation-complete wait runs first.
    /// I/O-class failures are retried up to the policy's `send_attempts`
    /// in total; anything else propagates at once.
    pub async fn send(&mut self, command: &str, rw: ReadWrite, skip_sync: bool) -> Result<String> {
        if self.closed {
            return Err(Error::NotConnected);
        }
        if !skip_sync {
            self.wait_for_completion().await?;
        }
        self.dispatch(command, rw.resolve(command)).await
    }

    /// Send a command without reading a response.
    pub async fn write(&mut self, command: &str) -> Result<()> {
        self.send(command, ReadWrite::Write, false).await.map(|_| ())
    }

    /// Send a command and read one response line.
    pub async fn query(&mut self, command: &str) -> Result<String> {
        self.send(command, ReadWrite::Read, false).await
    }

    /// Query and extract every number in the response.
    pub async fn query_numbers(&mut self, command: &str) -> Result<Vec<f64>> {
        let response = self.query(command).await?;
        Ok(extract_numbers(&response))
    }

    /// Query and extract the first number in the response.
    pub async fn query_number(&mut self, command: &str) -> Result<f64> {
        let values = self.query_numbers(command).await?;
        Ok(values.first().copied().unwrap_or(0.0))
    }

    /// Run the operation-complete wait on its own.
    pub async fn wait_for_completion(&mut self) -> Result<()> {
        match self.sync {
            OperationWait::Query(command) => {
                self.dispatch(command, ReadWrite::Read).await?;
            }
            OperationWait::Delay(delay) => tokio::time::sleep(delay).await,
            OperationWait::None => {}
        }
        Ok(())
    }

    /// Ask the device for its identity string.
    pub async fn get_id(&mut self) -> Result<String> {
        let command = self.descriptor.id_command;
        self.send(command, ReadWrite::Read, false).await
    }

    async fn dispatch(&mut self, command: &str, rw: ReadWrite) -> Result<String> {
        let attempts = self.connection.policy().send_attempts.max(1);
        let backoff = self.connection.policy().backoff;
        let mut attempt = 1;

        loop {
            let err = match self.connection.exchange(command, rw).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_io() && attempt < attempts => e,
                Err(e) => return Err(e),
            };

            tracing::warn!(
                instrument = %self.name,
                command,
                attempt,
                error = %err,
                "Command failed, retrying"
            );

            if err.is_connection_lost() {
                if let Err(e) = self.connection.reconnect().await {
                    tracing::warn!(instrument = %self.name, error = %e, "Reconnect failed");
                }
            }

            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    /// Fail with [`Error::Channel`] unless `channel` exists.
    pub fn check_channel(&self, channel: ChannelId) -> Result<()> {
        if self.descriptor.has_channel(channel) {
            Ok(())
        } else {
            Err(Error::Channel {
                channel,
                instrument: self.name.clone(),
            })
        }
    }

    /// Check every channel in `channels`, failing on the first missing one.
    pub fn check_channels(&self, channels: &[ChannelId]) -> Result<()> {
        channels.iter().try_for_each(|ch| self.check_channel(*ch))
    }

    /// Close the connection. Calling it again does nothing.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.connection.close().await
    }

    /// Close after a failed setup step and hand back the setup error.
    pub(crate) async fn abandon(&mut self, err: Error) -> Error {
        if let Err(close_err) = self.close().await {
            tracing::debug!(
                instrument = %self.name,
                error = %close_err,
                "Close after failed setup also failed"
            );
        }
        err
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Registration name of the driver.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    pub fn channels(&self) -> &'static [ChannelId] {
        self.descriptor.channels
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }
}
