//! Mock backend handing out queued transports.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use benchlib_core::error::{Error, Result};
use benchlib_core::transport::{Backend, BackendSet, Transport};

use crate::mock_transport::MockTransport;

#[derive(Debug, Default)]
struct BackendState {
    transports: VecDeque<MockTransport>,
    failures_left: usize,
    opened: Vec<String>,
    resources: Vec<String>,
}

/// A [`Backend`] that opens queued [`MockTransport`]s.
///
/// Each successful `open()` pops the next queued transport. The backend
/// can be told to refuse the next N opens, or every open.
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    state: Mutex<BackendState>,
}

impl MockBackend {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(MockBackend {
            name: name.into(),
            state: Mutex::new(BackendState::default()),
        })
    }

    /// A backend that refuses every open.
    pub fn refusing(name: &str) -> Arc<Self> {
        let backend = Self::new(name);
        backend.fail_next(usize::MAX);
        backend
    }

    /// A backend holding one queued transport.
    pub fn with_transport(name: &str, transport: MockTransport) -> Arc<Self> {
        let backend = Self::new(name);
        backend.push_transport(transport);
        backend
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push_transport(&self, transport: MockTransport) {
        self.lock().transports.push_back(transport);
    }

    /// Refuse the next `count` opens.
    pub fn fail_next(&self, count: usize) {
        self.lock().failures_left = count;
    }

    pub fn set_resources(&self, resources: &[&str]) {
        self.lock().resources = resources.iter().map(|r| r.to_string()).collect();
    }

    /// Number of `open()` calls, refused ones included.
    pub fn open_count(&self) -> usize {
        self.lock().opened.len()
    }

    /// Locators passed to `open()`, in order.
    pub fn opened_locators(&self) -> Vec<String> {
        self.lock().opened.clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self, locator: &str) -> Result<Box<dyn Transport>> {
        let mut state = self.lock();
        state.opened.push(locator.to_string());

        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(Error::Transport(format!("{} refused {locator}", self.name)));
        }

        match state.transports.pop_front() {
            Some(transport) => Ok(transport.boxed()),
            None => Err(Error::Transport(format!(
                "{} has no transport queued for {locator}",
                self.name
            ))),
        }
    }

    async fn list_resources(&self) -> Result<Vec<String>> {
        Ok(self.lock().resources.clone())
    }
}

/// A backend set with `primary` as primary and simulated backend and a
/// fallback that refuses everything.
pub fn backends_with(primary: &Arc<MockBackend>) -> BackendSet {
    BackendSet::new(
        Arc::clone(primary) as Arc<dyn Backend>,
        MockBackend::refusing("fallback"),
        Arc::clone(primary) as Arc<dyn Backend>,
    )
}
