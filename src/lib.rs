pub mod config;
pub mod console;
pub mod controller;
pub mod error;
pub mod gpio_input;
pub mod mirror;
pub mod pin;
pub mod pwm;
pub mod remote;

// Re-export commonly used types
pub use controller::{Color, ControlEvent, LightController, LightState};
pub use error::{Error, HardwareFault, TransportError};
pub use pwm::{Duty, PwmChannel};
pub use remote::RemoteStateClient;

#[cfg(test)]
pub(crate) mod mocks;
