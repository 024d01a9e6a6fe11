//! Mock SCPI server for socket-level testing.
//!
//! [`MockScpiServer`] listens on a random localhost port and plays back a
//! script of expected command lines, answering the queries. It lets the
//! TCP transport and the full setup path be tested against a real socket
//! without an instrument.
//!
//! # Example
//!
//! ```
//! use benchlib_test_harness::MockScpiServer;
//!
//! # async fn example() -> benchlib_core::Result<()> {
//! let mut server = MockScpiServer::new().await?;
//! server.expect("*IDN?", Some("Siglent Technologies,SPD1168X,SPD1X0001,1.01"));
//! server.expect("OUTP CH1,ON", None);
//! let addr = server.addr().to_string();
//! server.start();
//! // ... connect a TcpTransport to `addr` ...
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use benchlib_core::error::{Error, Result};

#[derive(Debug, Clone)]
struct LineExpectation {
    command: String,
    response: Option<String>,
}

/// A one-connection SCPI peer with a scripted conversation.
///
/// Once [`start`](MockScpiServer::start)ed, the server accepts a single
/// client and, for each expectation, reads one `\n`-terminated line,
/// checks it, and writes the response line if there is one. After the
/// script it closes the connection.
pub struct MockScpiServer {
    addr: String,
    listener: Option<TcpListener>,
    expectations: VecDeque<LineExpectation>,
    server_handle: Option<JoinHandle<std::result::Result<(), String>>>,
}

impl MockScpiServer {
    /// Bind to a random localhost port.
    pub async fn new() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::Transport(format!("failed to bind mock SCPI server: {e}")))?;
        let addr = listener.local_addr().map_err(Error::Io)?.to_string();

        Ok(Self {
            addr,
            listener: Some(listener),
            expectations: VecDeque::new(),
            server_handle: None,
        })
    }

    /// Expect `command` (without terminator) and answer `response`.
    pub fn expect(&mut self, command: &str, response: Option<&str>) {
        self.expectations.push_back(LineExpectation {
            command: command.to_string(),
            response: response.map(str::to_string),
        });
    }

    /// `host:port` the server listens on.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Port the server listens on.
    pub fn port(&self) -> u16 {
        self.addr
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or_default()
    }

    /// Start serving the script in a background task.
    ///
    /// The listener is already bound, so clients may connect as soon as
    /// this returns.
    pub fn start(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let expectations: Vec<LineExpectation> = self.expectations.drain(..).collect();

        let handle = tokio::spawn(async move {
            let (stream, peer) = listener
                .accept()
                .await
                .map_err(|e| format!("failed to accept connection: {e}"))?;
            tracing::debug!(%peer, "Mock SCPI server accepted connection");

            let (reader, mut writer) = stream.into_split();
            let mut reader = BufReader::new(reader);

            for (i, expectation) in expectations.iter().enumerate() {
                let mut line = String::new();
                let n = reader
                    .read_line(&mut line)
                    .await
                    .map_err(|e| format!("expectation {i}: read error: {e}"))?;
                if n == 0 {
                    return Err(format!(
                        "expectation {i}: client disconnected before sending {:?}",
                        expectation.command
                    ));
                }

                let received = line.trim_end_matches(['\r', '\n']);
                if received != expectation.command {
                    return Err(format!(
                        "expectation {i}: expected {:?}, got {received:?}",
                        expectation.command
                    ));
                }

                if let Some(response) = &expectation.response {
                    writer
                        .write_all(format!("{response}\n").as_bytes())
                        .await
                        .map_err(|e| format!("expectation {i}: write error: {e}"))?;
                    writer
                        .flush()
                        .await
                        .map_err(|e| format!("expectation {i}: flush error: {e}"))?;
                }
            }

            Ok(())
        });

        self.server_handle = Some(handle);
    }

    /// Wait for the script to finish and report any mismatch.
    pub async fn wait(self) -> std::result::Result<(), String> {
        match self.server_handle {
            Some(handle) => handle
                .await
                .map_err(|e| format!("server task panicked: {e}"))?,
            None => Ok(()),
        }
    }
}
