//! Scripted mock transport.
//!
//! [`MockTransport`] implements [`Transport`] with a queue of expected
//! commands and their replies, so driver and dispatch logic can be tested
//! without an instrument. Every command is recorded. A [`MockHandle`]
//! shares the transport's state, so a test can keep inspecting (and
//! scripting) the transport after it has been moved into a
//! `Connection`.
//!
//! # Example
//!
//! ```
//! use benchlib_test_harness::MockTransport;
//!
//! let mock = MockTransport::new();
//! mock.expect_query("*IDN?", "Siglent Technologies,SPD1168X,SPD1X0001,1.01");
//! mock.expect_write("OUTP CH1,ON");
//! let handle = mock.handle();
//! assert_eq!(handle.remaining_expectations(), 2);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use benchlib_core::error::{Error, Result};
use benchlib_core::transport::Transport;

/// A failure the mock can be told to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// [`Error::Timeout`].
    Timeout,
    /// [`Error::ConnectionLost`].
    ConnectionLost,
    /// [`Error::Transport`].
    Transport,
    /// [`Error::Protocol`]; not retried by the dispatcher.
    Protocol,
}

impl Failure {
    fn into_error(self, command: &str) -> Error {
        match self {
            Failure::Timeout => Error::Timeout,
            Failure::ConnectionLost => Error::ConnectionLost,
            Failure::Transport => Error::Transport(format!("injected failure on {command:?}")),
            Failure::Protocol => Error::Protocol(format!("injected failure on {command:?}")),
        }
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Line(String),
    Ack,
    Fail(Failure),
}

#[derive(Debug, Clone)]
struct Expectation {
    command: String,
    reply: Reply,
}

#[derive(Debug)]
struct MockState {
    expectations: VecDeque<Expectation>,
    standing: HashMap<String, String>,
    default_response: String,
    permissive: bool,
    injected: VecDeque<Failure>,
    sent: Vec<String>,
    connected: bool,
    simulated: bool,
    closes: usize,
    timeout: Duration,
    timeout_history: Vec<Duration>,
}

impl MockState {
    fn handle(&mut self, command: &str, is_query: bool) -> Result<String> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.sent.push(command.to_string());

        if let Some(failure) = self.injected.pop_front() {
            return Err(failure.into_error(command));
        }

        let front_matches = self
            .expectations
            .front()
            .is_some_and(|e| e.command == command);

        if front_matches {
            let Some(expectation) = self.expectations.pop_front() else {
                return Err(Error::Protocol("expectation queue changed underneath".into()));
            };
            return match (expectation.reply, is_query) {
                (Reply::Line(line), true) => Ok(line),
                (Reply::Line(_), false) => Err(Error::Protocol(format!(
                    "{command:?} was written but the script expected a query"
                ))),
                (Reply::Ack, false) => Ok(String::new()),
                // A write-only command never answers.
                (Reply::Ack, true) => Err(Error::Timeout),
                (Reply::Fail(failure), _) => Err(failure.into_error(command)),
            };
        }

        if self.permissive {
            return Ok(if is_query {
                self.standing
                    .get(command)
                    .cloned()
                    .unwrap_or_else(|| self.default_response.clone())
            } else {
                String::new()
            });
        }

        match self.expectations.front() {
            Some(next) => Err(Error::Protocol(format!(
                "unexpected command: expected {:?}, got {command:?}",
                next.command
            ))),
            None => Err(Error::Protocol(format!(
                "no more expectations in mock transport (got {command:?})"
            ))),
        }
    }
}

/// A mock [`Transport`] driven by a script of expected commands.
///
/// In strict mode (the default) every command must match the next
/// expectation. In permissive mode, commands that do not match the next
/// expectation are accepted: writes succeed and queries get the standing
/// response registered with [`respond`](MockTransport::respond), or the
/// default response.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a strict mock in the connected state.
    pub fn new() -> Self {
        MockTransport {
            state: Arc::new(Mutex::new(MockState {
                expectations: VecDeque::new(),
                standing: HashMap::new(),
                default_response: "0".into(),
                permissive: false,
                injected: VecDeque::new(),
                sent: Vec::new(),
                connected: true,
                simulated: false,
                closes: 0,
                timeout: Duration::from_secs(2),
                timeout_history: Vec::new(),
            })),
        }
    }

    /// Create a permissive mock.
    pub fn permissive() -> Self {
        let mock = Self::new();
        mock.lock().permissive = true;
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A handle sharing this transport's state.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Box the transport for a backend.
    pub fn boxed(self) -> Box<dyn Transport> {
        Box::new(self)
    }

    /// Expect `command` as a query and answer `response`.
    pub fn expect_query(&self, command: &str, response: &str) {
        self.lock().expectations.push_back(Expectation {
            command: command.into(),
            reply: Reply::Line(response.into()),
        });
    }

    /// Expect `command` as a write.
    pub fn expect_write(&self, command: &str) {
        self.lock().expectations.push_back(Expectation {
            command: command.into(),
            reply: Reply::Ack,
        });
    }

    /// Expect `command` and fail it.
    pub fn expect_failure(&self, command: &str, failure: Failure) {
        self.lock().expectations.push_back(Expectation {
            command: command.into(),
            reply: Reply::Fail(failure),
        });
    }

    /// Standing answer to `command` in permissive mode.
    pub fn respond(&self, command: &str, response: &str) {
        self.lock().standing.insert(command.into(), response.into());
    }

    /// Answer for permissive queries with no standing response.
    pub fn set_default_response(&self, response: &str) {
        self.lock().default_response = response.into();
    }

    /// Fail the next `count` commands, whatever they are.
    pub fn fail_next(&self, count: usize, failure: Failure) {
        let mut state = self.lock();
        for _ in 0..count {
            state.injected.push_back(failure);
        }
    }

    /// Report the transport as simulated.
    pub fn set_simulated(&self, simulated: bool) {
        self.lock().simulated = simulated;
    }

    /// When `false`, every call fails with [`Error::NotConnected`].
    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&mut self, command: &str) -> Result<()> {
        self.lock().handle(command, false).map(|_| ())
    }

    async fn query(&mut self, command: &str) -> Result<String> {
        self.lock().handle(command, true)
    }

    fn timeout(&self) -> Duration {
        self.lock().timeout
    }

    fn set_timeout(&mut self, timeout: Duration) {
        let mut state = self.lock();
        state.timeout = timeout;
        state.timeout_history.push(timeout);
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.connected = false;
        state.closes += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn is_simulated(&self) -> bool {
        self.lock().simulated
    }
}

/// Spy on a [`MockTransport`] after it has been handed off.
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every command the transport received, in order.
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// How many times `command` was received.
    pub fn count(&self, command: &str) -> usize {
        self.lock().sent.iter().filter(|c| *c == command).count()
    }

    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    pub fn remaining_expectations(&self) -> usize {
        self.lock().expectations.len()
    }

    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    pub fn timeout(&self) -> Duration {
        self.lock().timeout
    }

    /// Every timeout ever set, in order.
    pub fn timeout_history(&self) -> Vec<Duration> {
        self.lock().timeout_history.clone()
    }

    pub fn expect_query(&self, command: &str, response: &str) {
        self.lock().expectations.push_back(Expectation {
            command: command.into(),
            reply: Reply::Line(response.into()),
        });
    }

    pub fn expect_write(&self, command: &str) {
        self.lock().expectations.push_back(Expectation {
            command: command.into(),
            reply: Reply::Ack,
        });
    }

    pub fn respond(&self, command: &str, response: &str) {
        self.lock().standing.insert(command.into(), response.into());
    }

    pub fn fail_next(&self, count: usize, failure: Failure) {
        let mut state = self.lock();
        for _ in 0..count {
            state.injected.push_back(failure);
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }
}
