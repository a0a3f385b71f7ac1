// This file is only compiled during tests

use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::error::TransportError;
use crate::remote::StateStore;

/// In-memory [`StateStore`] with injectable failures and latency.
pub struct MockStore {
    state: Mutex<String>,
    writes: Mutex<Vec<String>>,
    failures_left: Mutex<u32>,
    latency: Duration,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new("low".to_string()),
            writes: Mutex::new(Vec::new()),
            failures_left: Mutex::new(0),
            latency: Duration::ZERO,
        }
    }

    /// Fail the next `count` calls with a 503.
    pub fn failing(self, count: u32) -> Self {
        *self.failures_left.lock().unwrap() = count;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every write attempt, including failed ones.
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn state(&self) -> String {
        self.state.lock().unwrap().clone()
    }

    fn maybe_fail(&self) -> Result<(), TransportError> {
        let mut failures = self.failures_left.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(TransportError::Status {
                code: 503,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }
}

impl StateStore for MockStore {
    fn read(&self) -> Result<String, TransportError> {
        thread::sleep(self.latency);
        self.maybe_fail()?;
        Ok(self.state())
    }

    fn write(&self, value: &str) -> Result<String, TransportError> {
        thread::sleep(self.latency);
        self.writes.lock().unwrap().push(value.to_string());
        self.maybe_fail()?;
        *self.state.lock().unwrap() = value.to_string();
        Ok(value.to_string())
    }
}
