use std::fmt;
use std::sync::Arc;

use crate::config::LightConfig;
use crate::error::Error;
use crate::mirror::{MirrorWorker, RetryPolicy};
use crate::pin::{DigitalPin, DriveMode, GpioPin, Level};
use crate::pwm::{ChannelState, Duty, PwmChannel};
use crate::remote::{RemoteStateClient, StateStore};

/// Key names that request application exit on key-down.
pub const EXIT_KEYS: [&str; 2] = ["Escape", "XF86Back"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Blue,
}

impl Color {
    pub const ALL: [Color; 3] = [Color::Red, Color::Green, Color::Blue];

    fn index(self) -> usize {
        match self {
            Color::Red => 0,
            Color::Green => 1,
            Color::Blue => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
        }
    }
}

/// On/off state of the indicator light, as stored remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightState {
    Low,
    High,
}

impl LightState {
    pub fn token(self) -> &'static str {
        match self {
            LightState::Low => "low",
            LightState::High => "high",
        }
    }

    /// Parse a store token. Surrounding whitespace is ignored.
    pub fn from_token(token: &str) -> Result<Self, Error> {
        match token.trim() {
            "low" => Ok(LightState::Low),
            "high" => Ok(LightState::High),
            other => Err(Error::UnknownState(other.to_string())),
        }
    }

    fn level(self) -> Level {
        match self {
            LightState::Low => Level::Low,
            LightState::High => Level::High,
        }
    }
}

impl From<Level> for LightState {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => LightState::Low,
            Level::High => LightState::High,
        }
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Events produced by the presentation layer or the sensor poller.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// Slider moved; value is forwarded verbatim and clamped by the channel.
    Slider { color: Color, value: i64 },
    /// Sensor fired or the user asked to toggle the light.
    Toggle,
    Key { name: String, pressed: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Routes slider, toggle and key events to the RGB channels, the indicator
/// pin and the remote mirror. Only [`LightController::read_remote`] and
/// [`LightController::sync_remote`] block on the network.
pub struct LightController {
    sensor_led: Box<dyn DigitalPin>,
    channels: [PwmChannel; 3],
    store: Arc<dyn StateStore>,
    mirror: MirrorWorker,
    stopped: bool,
}

impl LightController {
    pub fn new<P>(
        sensor_led: P,
        channels: [PwmChannel; 3],
        store: Arc<dyn StateStore>,
        policy: RetryPolicy,
    ) -> Result<Self, Error>
    where
        P: DigitalPin + 'static,
    {
        let mirror = MirrorWorker::spawn(Arc::clone(&store), policy)?;
        Ok(Self {
            sensor_led: Box::new(sensor_led),
            channels,
            store,
            mirror,
            stopped: false,
        })
    }

    /// Acquire the GPIO lines and build the HTTP client described by `config`.
    pub fn from_config(config: &LightConfig) -> Result<Self, Error> {
        let sensor_led = GpioPin::new(config.sensor_led_pin, DriveMode::OutputInitiallyLow)?;

        let channel = |color: Color, pin: u8| -> Result<PwmChannel, Error> {
            // Active-low LED: start High so the channel is dark until its first duty.
            let pin = GpioPin::new(pin, DriveMode::OutputInitiallyHigh)?;
            Ok(PwmChannel::new(color.name(), pin, config.pwm_frequency_hz))
        };
        let channels = [
            channel(Color::Red, config.red_pin)?,
            channel(Color::Green, config.green_pin)?,
            channel(Color::Blue, config.blue_pin)?,
        ];

        let client = RemoteStateClient::with_timeout(&config.endpoint, config.timeout())?;
        let policy = RetryPolicy {
            max_attempts: config.mirror_max_attempts,
            backoff: std::time::Duration::from_millis(config.mirror_backoff_ms),
        };

        Self::new(sensor_led, channels, Arc::new(client), policy)
    }

    /// Forward a slider value to the matching channel.
    pub fn set_channel(&mut self, color: Color, value: i64) -> Result<Duty, Error> {
        let duty = self.channels[color.index()].set_duty(value)?;
        log::debug!("{} value {} -> duty {}%", color.name(), value, duty.percent());
        Ok(duty)
    }

    /// Flip the indicator pin and queue the new state for the remote store.
    /// Local and synchronous; a slow or failing remote never delays it.
    pub fn toggle(&mut self) -> Result<LightState, Error> {
        let next = self.sensor_led.read()?.toggled();
        self.sensor_led.write(next)?;

        let state = LightState::from(next);
        log::info!("Light toggled {}", state);
        self.mirror.submit(state.token());
        Ok(state)
    }

    pub fn handle_event(&mut self, event: ControlEvent) -> Result<Flow, Error> {
        match event {
            ControlEvent::Slider { color, value } => {
                self.set_channel(color, value)?;
            }
            ControlEvent::Toggle => {
                self.toggle()?;
            }
            ControlEvent::Key { name, pressed } => {
                if pressed && EXIT_KEYS.contains(&name.as_str()) {
                    log::info!("Exit requested via {}", name);
                    return Ok(Flow::Exit);
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Blocking GET of the remote state. Runs on the caller's thread for up
    /// to the client timeout.
    pub fn read_remote(&self) -> Result<String, Error> {
        Ok(self.store.read()?)
    }

    /// Drive the indicator pin to the state named by a remote `token`.
    /// Nothing is mirrored back: the store already holds this state.
    pub fn apply_remote(&mut self, token: &str) -> Result<LightState, Error> {
        let state = LightState::from_token(token)?;
        if self.sensor_led.read()? != state.level() {
            self.sensor_led.write(state.level())?;
            log::info!("Light set to {} by remote", state);
        }
        Ok(state)
    }

    /// Read the remote state and apply it locally.
    pub fn sync_remote(&mut self) -> Result<LightState, Error> {
        let token = self.read_remote()?;
        self.apply_remote(&token)
    }

    pub fn light_state(&self) -> Result<LightState, Error> {
        Ok(self.sensor_led.read()?.into())
    }

    pub fn channel_states(&self) -> [(Color, ChannelState); 3] {
        Color::ALL.map(|color| (color, self.channels[color.index()].state()))
    }

    pub fn channel(&self, color: Color) -> &PwmChannel {
        &self.channels[color.index()]
    }

    pub fn mirror(&self) -> &MirrorWorker {
        &self.mirror
    }

    /// Dispose the indicator pin, stop every PWM loop and flush the mirror.
    /// Idempotent; also called on drop.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        self.sensor_led.dispose();
        for channel in &mut self.channels {
            channel.stop();
        }
        self.mirror.shutdown();
        log::info!("Light controller stopped");
    }
}

impl Drop for LightController {
    fn drop(&mut self) {
        self.stop();
    }
}
