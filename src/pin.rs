use rppal::gpio::{Gpio, InputPin, OutputPin};

use crate::error::HardwareFault;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn toggled(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<rppal::gpio::Level> for Level {
    fn from(level: rppal::gpio::Level) -> Self {
        match level {
            rppal::gpio::Level::Low => Level::Low,
            rppal::gpio::Level::High => Level::High,
        }
    }
}

impl From<Level> for rppal::gpio::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => rppal::gpio::Level::Low,
            Level::High => rppal::gpio::Level::High,
        }
    }
}

/// How a pin is configured when it is acquired. Fixed for the pin's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    OutputInitiallyHigh,
    OutputInitiallyLow,
    /// Input with the internal pull-up enabled.
    Input,
}

/// A single numbered GPIO line.
///
/// Once [`dispose`](DigitalPin::dispose) has been called, `read` and `write`
/// fail with [`HardwareFault::Disposed`]; disposing twice is a no-op.
pub trait DigitalPin: Send {
    fn number(&self) -> u8;
    fn read(&self) -> Result<Level, HardwareFault>;
    fn write(&mut self, level: Level) -> Result<(), HardwareFault>;
    fn dispose(&mut self);
}

impl<P: DigitalPin + ?Sized> DigitalPin for Box<P> {
    fn number(&self) -> u8 {
        (**self).number()
    }

    fn read(&self) -> Result<Level, HardwareFault> {
        (**self).read()
    }

    fn write(&mut self, level: Level) -> Result<(), HardwareFault> {
        (**self).write(level)
    }

    fn dispose(&mut self) {
        (**self).dispose()
    }
}

enum Line {
    Output(OutputPin),
    Input(InputPin),
}

/// Raspberry Pi GPIO line driven through rppal.
pub struct GpioPin {
    number: u8,
    line: Option<Line>,
}

impl GpioPin {
    pub fn new(number: u8, mode: DriveMode) -> Result<Self, HardwareFault> {
        let driver = |e: rppal::gpio::Error| HardwareFault::Driver {
            pin: number,
            reason: e.to_string(),
        };

        let gpio = Gpio::new().map_err(driver)?;
        let pin = gpio.get(number).map_err(driver)?;

        let line = match mode {
            DriveMode::OutputInitiallyHigh => Line::Output(pin.into_output_high()),
            DriveMode::OutputInitiallyLow => Line::Output(pin.into_output_low()),
            DriveMode::Input => Line::Input(pin.into_input_pullup()),
        };
        log::debug!("GPIO {} acquired as {:?}", number, mode);

        Ok(Self {
            number,
            line: Some(line),
        })
    }
}

impl DigitalPin for GpioPin {
    fn number(&self) -> u8 {
        self.number
    }

    fn read(&self) -> Result<Level, HardwareFault> {
        match &self.line {
            Some(Line::Output(pin)) => Ok(if pin.is_set_high() {
                Level::High
            } else {
                Level::Low
            }),
            Some(Line::Input(pin)) => Ok(pin.read().into()),
            None => Err(HardwareFault::Disposed { pin: self.number }),
        }
    }

    fn write(&mut self, level: Level) -> Result<(), HardwareFault> {
        match &mut self.line {
            Some(Line::Output(pin)) => {
                pin.write(level.into());
                Ok(())
            }
            Some(Line::Input(_)) => Err(HardwareFault::NotOutput { pin: self.number }),
            None => Err(HardwareFault::Disposed { pin: self.number }),
        }
    }

    fn dispose(&mut self) {
        // Dropping the rppal handle resets the line to its original mode.
        if self.line.take().is_some() {
            log::debug!("GPIO {} disposed", self.number);
        }
    }
}
