//! Error types for benchlib.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport faults, identification
//! failures, contract violations and registration mistakes are all
//! captured here so callers can match on a single enum.

use crate::types::ChannelId;

/// The error type for all benchlib operations.
///
/// The first group of variants describes failures on the wire (socket,
/// serial port, framing). These are the "I/O class" errors that the
/// instrument dispatcher retries locally, see [`Error::is_io`]. The second
/// group describes contract failures that are never retried: the caller
/// has to change something before trying again.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port, TCP socket).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (malformed or unparsable reply).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Timed out waiting for a response from the instrument.
    ///
    /// Usually the instrument is powered off, the locator points at the
    /// wrong port, or the command was not a query and produced no reply.
    #[error("timeout waiting for response")]
    Timeout,

    /// The requested operation is not supported by this instrument or
    /// transport.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// An invalid parameter was passed to an instrument command.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the instrument is open.
    #[error("not connected")]
    NotConnected,

    /// The connection to the instrument was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// The endpoint could not be opened or the device behind it could not
    /// be identified.
    #[error("connection error: {0}")]
    Connection(String),

    /// The instrument could not be set up: category mismatch, forced
    /// driver mismatch, or a simulated endpoint without a forced driver.
    #[error("initialization error: {0}")]
    Initialization(String),

    /// The channel does not exist on this instrument.
    #[error("channel {channel} does not exist on {instrument}")]
    Channel {
        /// The rejected channel.
        channel: ChannelId,
        /// Registered driver name of the instrument.
        instrument: String,
    },

    /// A protection feature is missing and the requested limit crosses the
    /// safety ceiling. Continuing would leave the device unprotected.
    #[error(
        "{operation} is not implemented for {instrument}: requested {requested} exceeds the safety ceiling of {limit}"
    )]
    UnimplementedSafetyCritical {
        /// Operation that was requested (e.g. `"set_ovp"`).
        operation: &'static str,
        /// Registered driver name of the instrument.
        instrument: String,
        /// Value the caller asked for.
        requested: f64,
        /// The hardcoded ceiling.
        limit: f64,
    },

    /// A driver registration was rejected.
    #[error("registration error: {0}")]
    Registration(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error came from the transport layer.
    ///
    /// I/O-class errors are retried by [`Instrument::send`](crate::Instrument::send);
    /// everything else propagates immediately.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::Timeout
                | Error::NotConnected
                | Error::ConnectionLost
                | Error::Io(_)
        )
    }

    /// Whether the link to the instrument is gone and a reconnect is
    /// worth attempting.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            Error::ConnectionLost | Error::NotConnected => true,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
