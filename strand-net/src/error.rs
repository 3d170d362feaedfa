use std::time::Duration;
use strand_event::ErrorKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NetError>;

/// Failure to establish or use a connection.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("unsupported network {0:?}, only \"tcp\" is supported")]
    UnsupportedNetwork(String),

    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress {
        address: String,
        reason: &'static str,
    },

    #[error("dial timed out after {0:?}")]
    Timeout(Duration),

    #[error("dial cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NetError {
    /// Classification shared with the event primitives.
    ///
    /// I/O failures have no counterpart there and are
    /// reported as `None`: they are fatal to the current
    /// connection and up to the reconnect policy.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::UnsupportedNetwork(_) | Self::InvalidAddress { .. } => Some(ErrorKind::Usage),
            Self::Timeout(_) => Some(ErrorKind::Timeout),
            Self::Cancelled => Some(ErrorKind::Cancellation),
            Self::Io(_) => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedNetwork(_) => "STRAND_UNSUPPORTED_NETWORK",
            Self::InvalidAddress { .. } => "STRAND_INVALID_ADDRESS",
            Self::Timeout(_) => "STRAND_DIAL_TIMEOUT",
            Self::Cancelled => "STRAND_CANCELLED",
            Self::Io(_) => "STRAND_IO",
        }
    }
}

impl From<strand_event::Error> for NetError {
    fn from(err: strand_event::Error) -> Self {
        match err {
            strand_event::Error::Timeout(after) => Self::Timeout(after),
            strand_event::Error::Cancelled => Self::Cancelled,
            err => Self::Io(std::io::Error::other(err)),
        }
    }
}
