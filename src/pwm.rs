use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::DUTY_MAX;
use crate::error::{Error, HardwareFault};
use crate::pin::{DigitalPin, Level};

/// Duty cycle in percent, always within 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Duty(u8);

impl Duty {
    pub const OFF: Duty = Duty(0);
    pub const FULL: Duty = Duty(DUTY_MAX);

    /// Checked constructor, `None` above 100.
    pub fn new(percent: u8) -> Option<Self> {
        (percent <= DUTY_MAX).then_some(Self(percent))
    }

    /// Saturate any integer into 0..=100.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, DUTY_MAX as i64) as u8)
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

/// Length of the two phases of one carrier period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTiming {
    /// Pin held `Low` (LED on).
    pub on: Duration,
    /// Pin held `High` (LED off).
    pub off: Duration,
}

/// Carrier period for a frequency in Hz.
pub fn carrier_period(frequency_hz: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(frequency_hz.max(1)))
}

/// Split one period by duty. Computed in microseconds, so at 50 Hz each duty
/// step is 200 µs and `on + off == period` always holds.
pub fn phase_timing(period: Duration, duty: Duty) -> PhaseTiming {
    let period_us = period.as_micros() as u64;
    let on_us = period_us * u64::from(duty.percent()) / u64::from(DUTY_MAX);
    PhaseTiming {
        on: Duration::from_micros(on_us),
        off: Duration::from_micros(period_us - on_us),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    /// Constructed, loop not started yet.
    Idle,
    Running,
    /// The loop died on a pin fault; the channel accepts no more updates.
    Degraded(HardwareFault),
    Stopped,
}

struct Shared {
    duty: AtomicU8,
    stop: AtomicBool,
    fault: OnceLock<HardwareFault>,
}

/// Active-low software PWM on one pin. The loop thread starts on the first
/// duty; the duty reaches it through one atomic cell, so the last write wins.
pub struct PwmChannel {
    label: String,
    pin_number: u8,
    period: Duration,
    shared: Arc<Shared>,
    // Held here until the loop starts, then owned by the loop thread which
    // hands it back on exit.
    pin: Option<Box<dyn DigitalPin>>,
    handle: Option<JoinHandle<Box<dyn DigitalPin>>>,
    stopped: bool,
}

impl PwmChannel {
    /// Create an idle channel at duty 0. No thread is started until the first
    /// [`set_duty`](Self::set_duty).
    pub fn new<P>(label: impl Into<String>, pin: P, frequency_hz: u32) -> Self
    where
        P: DigitalPin + 'static,
    {
        Self {
            label: label.into(),
            pin_number: pin.number(),
            period: carrier_period(frequency_hz),
            shared: Arc::new(Shared {
                duty: AtomicU8::new(0),
                stop: AtomicBool::new(false),
                fault: OnceLock::new(),
            }),
            pin: Some(Box::new(pin)),
            handle: None,
            stopped: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pin_number(&self) -> u8 {
        self.pin_number
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn duty(&self) -> Duty {
        Duty(self.shared.duty.load(Ordering::Acquire))
    }

    pub fn state(&self) -> ChannelState {
        if self.stopped {
            ChannelState::Stopped
        } else if let Some(fault) = self.shared.fault.get() {
            ChannelState::Degraded(fault.clone())
        } else if self.handle.is_some() {
            ChannelState::Running
        } else if self.pin.is_some() {
            ChannelState::Idle
        } else {
            ChannelState::Stopped
        }
    }

    /// Store a new duty cycle for the next carrier period, starting the loop
    /// on first use.
    ///
    /// Out-of-range values are clamped to 0..=100, never rejected; the applied
    /// value is returned. Fails only when the channel can no longer run.
    pub fn set_duty(&mut self, value: i64) -> Result<Duty, Error> {
        if self.stopped {
            return Err(Error::ChannelStopped);
        }
        if let Some(fault) = self.shared.fault.get() {
            return Err(fault.clone().into());
        }

        let duty = Duty::clamped(value);
        if i64::from(duty.percent()) != value {
            log::warn!(
                "PWM {}: duty {} out of range, clamped to {}",
                self.label,
                value,
                duty.percent()
            );
        }
        self.shared.duty.store(duty.percent(), Ordering::Release);

        self.start()?;
        Ok(duty)
    }

    fn start(&mut self) -> Result<(), Error> {
        if self.handle.is_some() {
            return Ok(());
        }
        let Some(pin) = self.pin.take() else {
            return Err(Error::ChannelStopped);
        };

        let shared = Arc::clone(&self.shared);
        let period = self.period;
        let label = self.label.clone();
        let handle = thread::Builder::new()
            .name(format!("pwm-{}", self.label))
            .spawn(move || run(pin, &shared, period, &label))
            .map_err(|e| Error::Spawn(e.to_string()))?;

        self.handle = Some(handle);
        Ok(())
    }

    /// Signal the loop, wait for it to exit, then dispose the pin.
    /// Idempotent; also called on drop.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.shared.stop.store(true, Ordering::Release);

        let pin = match self.handle.take() {
            Some(handle) => {
                handle.thread().unpark();
                match handle.join() {
                    Ok(pin) => Some(pin),
                    Err(_) => {
                        log::error!("PWM {}: loop thread panicked", self.label);
                        None
                    }
                }
            }
            None => self.pin.take(),
        };

        if let Some(mut pin) = pin {
            pin.dispose();
        }
        log::info!("PWM {} (GPIO {}): stopped", self.label, self.pin_number);
    }
}

impl Drop for PwmChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    mut pin: Box<dyn DigitalPin>,
    shared: &Shared,
    period: Duration,
    label: &str,
) -> Box<dyn DigitalPin> {
    log::info!(
        "PWM {} (GPIO {}): loop started, period {:?}",
        label,
        pin.number(),
        period
    );

    if let Err(fault) = drive(&mut *pin, shared, period) {
        log::error!("PWM {}: {}, channel degraded", label, fault);
        let _ = shared.fault.set(fault);
    }
    pin
}

fn drive(pin: &mut dyn DigitalPin, shared: &Shared, period: Duration) -> Result<(), HardwareFault> {
    while !shared.stop.load(Ordering::Acquire) {
        // Sampled once per period, at the Low-phase boundary.
        let duty = Duty(shared.duty.load(Ordering::Acquire));
        let timing = phase_timing(period, duty);

        // Zero-length phases are skipped entirely: no glitch pulse at 0 / 100.
        if !timing.on.is_zero() {
            pin.write(Level::Low)?;
            suspend(timing.on, shared);
        }
        if !timing.off.is_zero() {
            pin.write(Level::High)?;
            suspend(timing.off, shared);
        }
    }
    Ok(())
}

/// Sleep for `duration`, returning early once stop is requested.
fn suspend(duration: Duration, shared: &Shared) {
    let deadline = Instant::now() + duration;
    loop {
        if shared.stop.load(Ordering::Acquire) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::park_timeout(deadline - now);
    }
}
