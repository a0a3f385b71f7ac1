use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ** GPIO CONFIGURATION ** //

/// Indicator LED toggled by the sensor (mirrored to the remote store).
pub const SENSOR_LED_GPIO: u8 = 24;
/// Active-low motion sensor input (pull-up).
pub const MOTION_SENSOR_GPIO: u8 = 23;
/// RGB LED channels, driven with software PWM.
pub const RGB_RED_GPIO: u8 = 17;
pub const RGB_GREEN_GPIO: u8 = 22;
pub const RGB_BLUE_GPIO: u8 = 27;

// ** PWM CONFIGURATION ** //

/// Carrier frequency (Hz). 50 Hz => 20 ms period.
pub const PWM_FREQUENCY_HZ: u32 = 50;
pub const PWM_MAX_FREQUENCY_HZ: u32 = 1000;
/// Duty cycle domain is 0..=100 percent.
pub const DUTY_MAX: u8 = 100;

// ** REMOTE STATE CONFIGURATION ** //

pub const REMOTE_ENDPOINT: &str = "http://192.168.0.3:8000/";
pub const REMOTE_TIMEOUT_SECS: u64 = 30;
/// Environment variable overriding the endpoint from file/defaults.
pub const ENDPOINT_ENV: &str = "SMARTLIGHT_ENDPOINT";
/// Mirror attempts per state change (first try included).
pub const MIRROR_MAX_ATTEMPTS: u32 = 3;
/// Backoff before the first retry, doubled on each further retry.
pub const MIRROR_BACKOFF_MS: u64 = 500;

// ** MAIN CONFIGURATION ** //

/// Event loop / sensor poll interval (debounce).
pub const POLL_INTERVAL_MS: u64 = 20;

/// Runtime configuration, loadable from a JSON file. Missing fields fall back
/// to the constants above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub sensor_led_pin: u8,
    pub motion_sensor_pin: u8,
    pub red_pin: u8,
    pub green_pin: u8,
    pub blue_pin: u8,
    pub pwm_frequency_hz: u32,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub mirror_max_attempts: u32,
    pub mirror_backoff_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            sensor_led_pin: SENSOR_LED_GPIO,
            motion_sensor_pin: MOTION_SENSOR_GPIO,
            red_pin: RGB_RED_GPIO,
            green_pin: RGB_GREEN_GPIO,
            blue_pin: RGB_BLUE_GPIO,
            pwm_frequency_hz: PWM_FREQUENCY_HZ,
            endpoint: REMOTE_ENDPOINT.to_string(),
            timeout_secs: REMOTE_TIMEOUT_SECS,
            mirror_max_attempts: MIRROR_MAX_ATTEMPTS,
            mirror_backoff_ms: MIRROR_BACKOFF_MS,
            poll_interval_ms: POLL_INTERVAL_MS,
        }
    }
}

impl LightConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| Error::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use the defaults, then apply the
    /// `SMARTLIGHT_ENDPOINT` override.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        Self::load_with_endpoint(path, std::env::var(ENDPOINT_ENV).ok())
    }

    fn load_with_endpoint(path: Option<&Path>, endpoint: Option<String>) -> Result<Self, Error> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
                Self::from_json(&text)?
            }
            None => Self::default(),
        };

        if let Some(endpoint) = endpoint {
            log::info!("Endpoint overridden by {}: {}", ENDPOINT_ENV, endpoint);
            config.endpoint = endpoint;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let pins = [
            self.sensor_led_pin,
            self.motion_sensor_pin,
            self.red_pin,
            self.green_pin,
            self.blue_pin,
        ];
        let mut seen = HashSet::new();
        for pin in pins {
            if !seen.insert(pin) {
                return Err(Error::Config(format!("GPIO {pin} assigned twice")));
            }
        }

        if !(1..=PWM_MAX_FREQUENCY_HZ).contains(&self.pwm_frequency_hz) {
            return Err(Error::Config(format!(
                "PWM frequency {} Hz outside 1..={} Hz",
                self.pwm_frequency_hz, PWM_MAX_FREQUENCY_HZ
            )));
        }

        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout must be non-zero".into()));
        }

        if !self.endpoint.starts_with("http://") {
            return Err(Error::Config(format!(
                "endpoint must be a plain http:// URL, got {}",
                self.endpoint
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be non-zero".into()));
        }

        if self.mirror_max_attempts == 0 {
            return Err(Error::Config("mirror_max_attempts must be at least 1".into()));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
