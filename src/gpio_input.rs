use crate::config::MOTION_SENSOR_GPIO;
use crate::error::HardwareFault;
use crate::pin::{DigitalPin, DriveMode, GpioPin, Level};

#[derive(Debug, PartialEq, Clone, Copy)]
/// Motion sensor output as seen through the pull-up input.
pub enum SensorReading {
    /// Sensor pulls the line low while it detects motion.
    Active,
    Idle,
}

/// Polls an active-low motion sensor and reports each new detection once.
///
/// Debouncing comes from the caller's poll interval: a level must be observed
/// on a poll to count.
pub struct MotionSensor<P: DigitalPin> {
    pin: P,
    last_reading: SensorReading,
}

impl MotionSensor<GpioPin> {
    pub fn new() -> Result<Self, HardwareFault> {
        Self::with_pin(MOTION_SENSOR_GPIO)
    }

    pub fn with_pin(pin: u8) -> Result<Self, HardwareFault> {
        Self::from_pin(GpioPin::new(pin, DriveMode::Input)?)
    }
}

impl<P: DigitalPin> MotionSensor<P> {
    /// Seed the last reading from the line, so a sensor already active at
    /// startup does not count as a detection.
    pub fn from_pin(pin: P) -> Result<Self, HardwareFault> {
        let mut sensor = Self {
            pin,
            last_reading: SensorReading::Idle,
        };
        sensor.last_reading = sensor.read_sensor()?;
        Ok(sensor)
    }

    pub fn read_sensor(&self) -> Result<SensorReading, HardwareFault> {
        Ok(match self.pin.read()? {
            Level::Low => SensorReading::Active,
            Level::High => SensorReading::Idle,
        })
    }

    /// Get the last polled reading.
    pub fn get_reading(&self) -> SensorReading {
        self.last_reading
    }

    /// Poll once. Returns `true` only on the Idle -> Active edge.
    pub fn update(&mut self) -> Result<bool, HardwareFault> {
        let reading = self.read_sensor()?;
        let triggered = reading == SensorReading::Active && self.last_reading == SensorReading::Idle;

        if reading != self.last_reading {
            log::debug!("Motion sensor GPIO {}: {:?}", self.pin.number(), reading);
            self.last_reading = reading;
        }

        Ok(triggered)
    }

    pub fn dispose(&mut self) {
        self.pin.dispose();
    }
}
