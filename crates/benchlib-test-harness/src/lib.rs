//! benchlib-test-harness: Mock transports, backends and a scripted SCPI
//! server for benchlib.
//!
//! [`MockTransport`] (with its [`MockHandle`] spy) tests drivers and the
//! dispatch core without hardware, [`MockBackend`] tests connection and
//! reconnect logic, and [`MockScpiServer`] tests the TCP transport and the
//! full setup path over a real socket.

pub mod mock_backend;
pub mod mock_server;
pub mod mock_transport;

pub use mock_backend::{backends_with, MockBackend};
pub use mock_server::MockScpiServer;
pub use mock_transport::{Failure, MockHandle, MockTransport};
