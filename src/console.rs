use std::fmt;

use crate::controller::{Color, ControlEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Event(ControlEvent),
    ReadRemote,
    /// Read the remote state and drive the indicator light to it.
    SyncRemote,
    Status,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    Unknown(String),
    MissingValue(&'static str),
    BadValue(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::Unknown(word) => write!(f, "unknown command '{word}' (try 'help')"),
            Self::MissingValue(channel) => write!(f, "{channel} needs a value 0-100"),
            Self::BadValue(value) => write!(f, "'{value}' is not a number"),
        }
    }
}

impl std::error::Error for ParseError {}

pub const HELP: &str = "commands: r|g|b <0-100>, toggle, read, sync, status, quit";

/// Parse one stdin line: `r|g|b <n>` sliders, `toggle`, `read`, `sync`,
/// `status`, `help`, and `quit`/`escape`/`back` as exit key presses.
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Err(ParseError::Empty);
    };

    let color = match word.to_ascii_lowercase().as_str() {
        "r" | "red" => Some(Color::Red),
        "g" | "green" => Some(Color::Green),
        "b" | "blue" => Some(Color::Blue),
        "t" | "toggle" => return Ok(Command::Event(ControlEvent::Toggle)),
        "read" => return Ok(Command::ReadRemote),
        "sync" => return Ok(Command::SyncRemote),
        "status" | "s" => return Ok(Command::Status),
        "help" | "h" | "?" => return Ok(Command::Help),
        "quit" | "q" | "exit" | "escape" => return Ok(exit_key("Escape")),
        "back" => return Ok(exit_key("XF86Back")),
        _ => None,
    };

    let Some(color) = color else {
        return Err(ParseError::Unknown(word.to_string()));
    };
    let raw = words.next().ok_or(ParseError::MissingValue(color.name()))?;
    // Sliders report fractional values; channels take whole percent.
    let value: f64 = raw
        .parse()
        .map_err(|_| ParseError::BadValue(raw.to_string()))?;
    if !value.is_finite() {
        return Err(ParseError::BadValue(raw.to_string()));
    }

    Ok(Command::Event(ControlEvent::Slider {
        color,
        value: value.trunc() as i64,
    }))
}

fn exit_key(name: &str) -> Command {
    Command::Event(ControlEvent::Key {
        name: name.to_string(),
        pressed: true,
    })
}
