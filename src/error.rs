use std::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The remote state endpoint could not be reached or refused the request.
    Transport(TransportError),
    /// A digital pin operation failed.
    Hardware(HardwareFault),
    /// Configuration is invalid or could not be loaded.
    Config(String),
    /// A background thread could not be spawned.
    Spawn(String),
    /// The PWM channel has been stopped and accepts no further updates.
    ChannelStopped,
    /// The remote store holds a token that is neither `low` nor `high`.
    UnknownState(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Hardware(e) => write!(f, "hardware: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Spawn(msg) => write!(f, "thread spawn failed: {msg}"),
            Self::ChannelStopped => write!(f, "PWM channel stopped"),
            Self::UnknownState(token) => write!(f, "unknown light state {token:?}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Hardware(e) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The HTTP client could not be built or the URL was rejected.
    InvalidRequest(String),
    /// Connection refused, name resolution failed, or the socket dropped.
    Connect(String),
    /// No complete response arrived within the request timeout.
    Timeout,
    /// The remote answered with a non-2xx status.
    Status { code: u16, body: String },
    /// The response body could not be read as text.
    Body(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            Self::Connect(msg) => write!(f, "connection failed: {msg}"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Status { code, body } => write!(f, "HTTP {code}: {body}"),
            Self::Body(msg) => write!(f, "unreadable response body: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<isahc::Error> for TransportError {
    fn from(e: isahc::Error) -> Self {
        use isahc::error::ErrorKind;

        if e.is_timeout() {
            return Self::Timeout;
        }
        match e.kind() {
            ErrorKind::InvalidRequest | ErrorKind::ClientInitialization => {
                Self::InvalidRequest(e.to_string())
            }
            _ => Self::Connect(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Hardware faults
// ---------------------------------------------------------------------------

/// A failed operation on a numbered pin. Fatal to any PWM loop that hits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareFault {
    /// The pin was already disposed.
    Disposed { pin: u8 },
    /// A write was attempted on a pin configured as input.
    NotOutput { pin: u8 },
    /// The GPIO driver reported an error.
    Driver { pin: u8, reason: String },
}

impl HardwareFault {
    pub fn pin(&self) -> u8 {
        match self {
            Self::Disposed { pin } | Self::NotOutput { pin } | Self::Driver { pin, .. } => *pin,
        }
    }
}

impl fmt::Display for HardwareFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disposed { pin } => write!(f, "GPIO {pin} already disposed"),
            Self::NotOutput { pin } => write!(f, "GPIO {pin} is not an output"),
            Self::Driver { pin, reason } => write!(f, "GPIO {pin}: {reason}"),
        }
    }
}

impl std::error::Error for HardwareFault {}

impl From<HardwareFault> for Error {
    fn from(e: HardwareFault) -> Self {
        Self::Hardware(e)
    }
}
