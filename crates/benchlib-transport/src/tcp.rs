//! TCP transport for LAN instruments.
//!
//! Most bench instruments with an Ethernet port expose a raw SCPI socket,
//! conventionally on port 5025. [`TcpTransport`] connects to it and frames
//! commands and responses as newline-terminated lines.
//!
//! # Example
//!
//! ```no_run
//! use benchlib_core::Transport;
//! use benchlib_transport::TcpTransport;
//!
//! # async fn example() -> benchlib_core::Result<()> {
//! let mut transport = TcpTransport::connect("192.168.1.50:5025").await?;
//! let idn = transport.query("*IDN?").await?;
//! transport.write("OUTP CH1,ON").await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use benchlib_core::{Error, Result, Transport};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::line::LineChannel;

/// Default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default response timeout.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

/// TCP transport to a raw SCPI socket.
///
/// The connection is established eagerly via [`connect`](TcpTransport::connect)
/// or [`connect_with_timeout`](TcpTransport::connect_with_timeout).
pub struct TcpTransport {
    channel: LineChannel<TcpStream>,
    timeout: Duration,
}

impl TcpTransport {
    /// Connect to a `host:port` endpoint using the default timeout.
    pub async fn connect(addr: &str) -> Result<Self> {
        Self::connect_with_timeout(addr, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Connect to a `host:port` endpoint, giving up after `timeout`.
    pub async fn connect_with_timeout(addr: &str, timeout: Duration) -> Result<Self> {
        tracing::debug!(
            addr = %addr,
            timeout_ms = timeout.as_millis(),
            "Connecting to TCP endpoint"
        );

        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                tracing::error!(addr = %addr, "TCP connection timed out");
                Error::Timeout
            })?
            .map_err(|e| {
                tracing::error!(addr = %addr, error = %e, "TCP connection failed");
                map_connect_error(e, addr)
            })?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(
                addr = %addr,
                error = %e,
                "Failed to set TCP_NODELAY (continuing anyway)"
            );
        }

        tracing::info!(addr = %addr, "TCP connection established");
        Ok(Self::from_stream(stream, addr.to_string()))
    }

    /// Wrap an already-connected stream, e.g. one accepted in a test.
    pub fn from_stream(stream: TcpStream, addr: String) -> Self {
        Self {
            channel: LineChannel::new(stream, addr),
            timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    /// The address this transport was connected to.
    pub fn addr(&self) -> &str {
        self.channel.label()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn write(&mut self, command: &str) -> Result<()> {
        self.channel.write_line(command).await
    }

    async fn query(&mut self, command: &str) -> Result<String> {
        self.channel.write_line(command).await?;
        self.channel.read_line(self.timeout).await
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.channel.take().await {
            tracing::debug!(addr = %self.addr(), "Closing TCP connection");
            if let Err(e) = stream.shutdown().await {
                tracing::warn!(
                    addr = %self.addr(),
                    error = %e,
                    "Failed to shutdown TCP stream (continuing anyway)"
                );
            }
            tracing::info!(addr = %self.addr(), "TCP connection closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.channel.is_open()
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.channel.is_open() {
            tracing::debug!(addr = %self.addr(), "TcpTransport dropped, closing connection");
        }
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("addr", &self.addr())
            .field("connected", &self.channel.is_open())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Map a connection-time I/O error to the appropriate [`Error`] variant.
fn map_connect_error(e: std::io::Error, addr: &str) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionRefused => {
            Error::Transport(format!("connection refused: {}", addr))
        }
        _ => Error::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchlib_test_harness::MockScpiServer;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    async fn test_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    /// A peer that accepts and then never says anything.
    async fn mute_instrument() -> (String, tokio::task::JoinHandle<()>) {
        let (listener, addr) = test_listener().await;
        let peer = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        (addr, peer)
    }

    #[tokio::test]
    async fn query_against_scripted_server() {
        let mut server = MockScpiServer::new().await.unwrap();
        server.expect("*IDN?", Some("Siglent Technologies,SPD1168X,SPD1X,1.01"));
        server.expect("OUTP CH1,ON", None);
        server.expect("MEAS:VOLT? CH1", Some("12.003"));
        let addr = server.addr().to_string();
        server.start();

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        assert!(transport.is_connected());
        assert_eq!(
            transport.query("*IDN?").await.unwrap(),
            "Siglent Technologies,SPD1168X,SPD1X,1.01"
        );
        transport.write("OUTP CH1,ON").await.unwrap();
        assert_eq!(transport.query("MEAS:VOLT? CH1").await.unwrap(), "12.003");

        transport.close().await.unwrap();
        server.wait().await.unwrap();
    }

    #[tokio::test]
    async fn closed_port_is_refused() {
        let (listener, addr) = test_listener().await;
        drop(listener);

        match TcpTransport::connect(&addr).await.unwrap_err() {
            Error::Transport(msg) => assert!(msg.contains(&addr), "{msg}"),
            other => panic!("refusal should be a transport error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn connect_timeout_to_nonexistent_host() {
        // 192.0.2.0/24 is TEST-NET-1 and black-holed.
        let err = TcpTransport::connect_with_timeout("192.0.2.1:5025", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout | Error::Io(_)), "{err:?}");
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let (addr, server) = mute_instrument().await;

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        transport.set_timeout(Duration::from_millis(100));
        assert_eq!(transport.timeout(), Duration::from_millis(100));

        let err = transport.query("*IDN?").await.unwrap_err();
        assert!(matches!(err, Error::Timeout));

        transport.close().await.unwrap();
        server.abort();
    }

    #[tokio::test]
    async fn peer_hangup_is_connection_lost() {
        let (listener, addr) = test_listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            // Hang up without answering.
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        let err = transport.query("*IDN?").await.unwrap_err();
        assert!(err.is_connection_lost(), "{err:?}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn slow_reply_does_not_shift_later_queries() {
        let (listener, addr) = test_listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            assert_eq!(line.trim_end(), "MEAS:VOLT?");
            tokio::time::sleep(Duration::from_millis(300)).await;
            reader.get_mut().write_all(b"12.5\n").await.unwrap();
            for reply in [&b"0.25\n"[..], b"0.30\n"] {
                line.clear();
                reader.read_line(&mut line).await.unwrap();
                assert_eq!(line.trim_end(), "MEAS:CURR?");
                reader.get_mut().write_all(reply).await.unwrap();
            }
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        transport.set_timeout(Duration::from_millis(100));
        assert!(matches!(transport.query("MEAS:VOLT?").await, Err(Error::Timeout)));

        // The voltage reading turns up during this query and is skipped.
        transport.set_timeout(Duration::from_secs(2));
        assert_eq!(transport.query("MEAS:CURR?").await.unwrap(), "0.25");
        assert_eq!(transport.query("MEAS:CURR?").await.unwrap(), "0.30");

        transport.close().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn use_after_close_is_not_connected() {
        let (addr, server) = mute_instrument().await;

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        assert_eq!(transport.addr(), addr);
        transport.close().await.unwrap();
        assert!(!transport.is_connected());

        assert!(matches!(transport.write("*RST").await, Err(Error::NotConnected)));
        assert!(matches!(transport.query("*IDN?").await, Err(Error::NotConnected)));

        // Closing again is a no-op.
        transport.close().await.unwrap();
        server.abort();
    }
}
