//! Transport implementations for benchlib.
//!
//! This crate provides concrete implementations of the
//! [`Transport`](benchlib_core::Transport) trait from `benchlib-core`:
//!
//! - [`TcpTransport`]: raw SCPI sockets on LAN instruments
//! - [`SerialTransport`]: RS-232 and USB virtual COM ports
//! - [`SimulatedTransport`]: no hardware; queries answer with random numbers
//!
//! and the [`Backend`](benchlib_core::Backend)s that open them from
//! VISA-style locators ([`ResourceAddress`]).
//!
//! # Example
//!
//! ```no_run
//! use benchlib_core::{Backend, Transport};
//! use benchlib_transport::NativeBackend;
//!
//! # async fn example() -> benchlib_core::Result<()> {
//! let mut transport = NativeBackend::primary().open("TCPIP::192.168.1.50::INSTR").await?;
//! println!("{}", transport.query("*IDN?").await?);
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
mod line;
pub mod resource;
pub mod serial;
pub mod simulated;
pub mod tcp;

pub use backend::{default_backends, NativeBackend, SimulatedBackend};
pub use line::SETTLE_DELAY;
pub use resource::{ResourceAddress, SCPI_SOCKET_PORT};
pub use serial::{DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits};
pub use simulated::SimulatedTransport;
pub use tcp::TcpTransport;
