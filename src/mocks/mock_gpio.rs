// This file is only compiled during tests

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::error::HardwareFault;
use crate::pin::{DigitalPin, DriveMode, Level};

struct MockState {
    level: Level,
    disposed: bool,
    dispose_count: usize,
    // (timestamp, level written)
    writes: Vec<(Instant, Level)>,
    fail_after: Option<usize>,
}

/// In-memory pin. Shares its state with any [`MockProbe`] so a test can keep
/// observing the pin after it has been moved into a PWM channel thread.
pub struct MockPin {
    number: u8,
    mode: DriveMode,
    state: Arc<Mutex<MockState>>,
}

#[derive(Clone)]
pub struct MockProbe {
    state: Arc<Mutex<MockState>>,
}

impl MockPin {
    pub fn new(number: u8, mode: DriveMode) -> Self {
        let level = match mode {
            DriveMode::OutputInitiallyLow => Level::Low,
            DriveMode::OutputInitiallyHigh | DriveMode::Input => Level::High,
        };
        Self {
            number,
            mode,
            state: Arc::new(Mutex::new(MockState {
                level,
                disposed: false,
                dispose_count: 0,
                writes: Vec::new(),
                fail_after: None,
            })),
        }
    }

    /// Fail every write after the first `writes` successful ones.
    pub fn failing_after(self, writes: usize) -> Self {
        lock(&self.state).fail_after = Some(writes);
        self
    }

    pub fn probe(&self) -> MockProbe {
        MockProbe {
            state: Arc::clone(&self.state),
        }
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DigitalPin for MockPin {
    fn number(&self) -> u8 {
        self.number
    }

    fn read(&self) -> Result<Level, HardwareFault> {
        let state = lock(&self.state);
        if state.disposed {
            return Err(HardwareFault::Disposed { pin: self.number });
        }
        Ok(state.level)
    }

    fn write(&mut self, level: Level) -> Result<(), HardwareFault> {
        if self.mode == DriveMode::Input {
            return Err(HardwareFault::NotOutput { pin: self.number });
        }
        let mut state = lock(&self.state);
        if state.disposed {
            return Err(HardwareFault::Disposed { pin: self.number });
        }
        if state.fail_after.is_some_and(|n| state.writes.len() >= n) {
            return Err(HardwareFault::Driver {
                pin: self.number,
                reason: "injected write failure".into(),
            });
        }
        state.level = level;
        state.writes.push((Instant::now(), level));
        Ok(())
    }

    fn dispose(&mut self) {
        let mut state = lock(&self.state);
        state.disposed = true;
        state.dispose_count += 1;
    }
}

impl MockProbe {
    pub fn level(&self) -> Level {
        lock(&self.state).level
    }

    /// Drive an input pin from the outside, like the sensor would.
    pub fn set_level(&self, level: Level) {
        lock(&self.state).level = level;
    }

    pub fn writes(&self) -> Vec<(Instant, Level)> {
        lock(&self.state).writes.clone()
    }

    pub fn write_count(&self) -> usize {
        lock(&self.state).writes.len()
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.state).disposed
    }

    pub fn dispose_count(&self) -> usize {
        lock(&self.state).dispose_count
    }
}
