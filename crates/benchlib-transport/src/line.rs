//! Newline-framed command/response exchange over a byte stream.
//!
//! [`LineChannel`] owns the stream and a receive buffer. Every reply
//! belongs to the command written just before it: anything still buffered
//! when a new command goes out is discarded, and after a read times out the
//! channel owes the instrument one reply, which is skipped when it turns up
//! late. TCP and serial transports both delegate their framing here.

use std::time::Duration;

use benchlib_core::{Error, Result};
use benchlib_scpi::{decode_line, encode_command, DecodeResult};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

/// Pause after every write so slow instrument firmware keeps up.
pub const SETTLE_DELAY: Duration = Duration::from_millis(1);

const READ_CHUNK: usize = 1024;

/// Largest unterminated response held before the buffer is dropped.
const MAX_BUF: usize = 8192;

pub(crate) struct LineChannel<S> {
    stream: Option<S>,
    pending: Vec<u8>,
    /// A read timed out and its reply may still arrive.
    owed: bool,
    label: String,
}

impl<S> LineChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub(crate) fn new(stream: S, label: String) -> Self {
        Self {
            stream: Some(stream),
            pending: Vec::new(),
            owed: false,
            label,
        }
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Send `command` followed by the terminator, then settle.
    pub(crate) async fn write_line(&mut self, command: &str) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::NotConnected);
        }
        self.discard_stale().await;

        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        let frame = encode_command(command);

        tracing::trace!(addr = %self.label, command, "Sending line");

        stream.write_all(&frame).await.map_err(|e| {
            tracing::error!(addr = %self.label, error = %e, "Failed to send data");
            map_io_error(e)
        })?;
        stream.flush().await.map_err(|e| {
            tracing::error!(addr = %self.label, error = %e, "Failed to flush stream");
            map_io_error(e)
        })?;

        tokio::time::sleep(SETTLE_DELAY).await;
        Ok(())
    }

    /// Drop whatever the peer already sent before a new command goes out.
    ///
    /// Only bytes readable without waiting are taken. A complete line among
    /// them settles an owed reply.
    async fn discard_stale(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        let mut chunk = [0u8; READ_CHUNK];
        while self.pending.len() <= MAX_BUF {
            match tokio::time::timeout(Duration::ZERO, stream.read(&mut chunk)).await {
                Ok(Ok(n)) if n > 0 => self.pending.extend_from_slice(&chunk[..n]),
                _ => break,
            }
        }

        if self.pending.is_empty() {
            return;
        }
        if self.pending.contains(&b'\n') {
            self.owed = false;
        }
        tracing::debug!(
            addr = %self.label,
            bytes = self.pending.len(),
            data = ?String::from_utf8_lossy(&self.pending),
            "Discarding stale input before write"
        );
        self.pending.clear();
    }

    /// Read the next complete line, waiting at most `timeout` overall.
    ///
    /// While a reply is owed the first line is held back as the late answer
    /// to the earlier query. If nothing else arrives before the deadline the
    /// earlier query was never answered, and the held line is returned.
    pub(crate) async fn read_line(&mut self, timeout: Duration) -> Result<String> {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; READ_CHUNK];
        let mut held: Option<String> = None;

        loop {
            match decode_line(&self.pending) {
                DecodeResult::Line { text, consumed } => {
                    self.pending.drain(..consumed);
                    if self.owed {
                        self.owed = false;
                        tracing::debug!(addr = %self.label, response = %text, "Skipping late reply");
                        held = Some(text);
                        continue;
                    }
                    tracing::trace!(addr = %self.label, response = %text, "Received line");
                    return Ok(text);
                }
                DecodeResult::Error(consumed) => {
                    let raw: Vec<u8> = self.pending.drain(..consumed).collect();
                    return Err(Error::Protocol(format!(
                        "response from {} is not valid UTF-8: {:02X?}",
                        self.label, raw
                    )));
                }
                DecodeResult::Incomplete => {}
            }

            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
            match tokio::time::timeout_at(deadline, stream.read(&mut chunk)).await {
                Ok(Ok(0)) => {
                    tracing::warn!(addr = %self.label, "Peer closed connection (0 bytes read)");
                    return Err(Error::ConnectionLost);
                }
                Ok(Ok(n)) => {
                    tracing::trace!(addr = %self.label, bytes = n, data = ?&chunk[..n], "Received data");
                    self.pending.extend_from_slice(&chunk[..n]);
                    if self.pending.len() > MAX_BUF {
                        tracing::warn!(
                            addr = %self.label,
                            buffered = self.pending.len(),
                            "Response buffer overflow, clearing"
                        );
                        self.pending.clear();
                        return Err(Error::Protocol(format!(
                            "response from {} exceeded {MAX_BUF} bytes without a terminator",
                            self.label
                        )));
                    }
                }
                Ok(Err(e)) => {
                    tracing::error!(addr = %self.label, error = %e, "Failed to receive data");
                    return Err(map_io_error(e));
                }
                Err(_) => {
                    if let Some(text) = held {
                        tracing::trace!(addr = %self.label, response = %text, "Received line");
                        return Ok(text);
                    }
                    self.owed = true;
                    tracing::trace!(
                        addr = %self.label,
                        timeout_ms = timeout.as_millis(),
                        buffered = self.pending.len(),
                        "Timeout waiting for response line"
                    );
                    return Err(Error::Timeout);
                }
            }
        }
    }

    /// Flush and release the stream. Returns it so the caller can run a
    /// transport-specific shutdown.
    pub(crate) async fn take(&mut self) -> Option<S> {
        let mut stream = self.stream.take()?;
        self.pending.clear();
        self.owed = false;
        if let Err(e) = stream.flush().await {
            tracing::warn!(
                addr = %self.label,
                error = %e,
                "Failed to flush before closing (continuing anyway)"
            );
        }
        Some(stream)
    }
}

/// Map a data-path I/O error to the appropriate [`Error`] variant.
pub(crate) fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::ConnectionAborted => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}
