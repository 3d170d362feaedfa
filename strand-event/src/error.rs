//! Error taxonomy of the event primitives.
//!
//! Every suspending or fallible operation in this
//! crate reports through [`Error`]. The variants
//! fall into a handful of [`ErrorKind`]s, and the
//! protocol layers above are expected to treat
//! [`ErrorKind::Cancellation`] and
//! [`ErrorKind::Completed`] as ordinary shutdown
//! signals rather than failures.
//!
//! | Variant | Kind | Code |
//! |---------|------|------|
//! | [`Error::NegativeCounter`] | Usage | `STRAND_NEGATIVE_COUNTER` |
//! | [`Error::Full`] | Usage | `STRAND_FULL` |
//! | [`Error::Timeout`] | Timeout | `STRAND_TIMEOUT` |
//! | [`Error::Cancelled`] | Cancellation | `STRAND_CANCELLED` |
//! | [`Error::Completed`] | Completed | `STRAND_COMPLETED` |
//! | [`Error::Handler`] | Handler | `STRAND_HANDLER` |

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type of the event primitives.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller broke a usage contract.
    Usage,
    /// A deadline expired.
    Timeout,
    /// A cancellation signal fired during a wait.
    Cancellation,
    /// The channel is completed and holds no more values.
    Completed,
    /// A select case handler failed.
    Handler,
}

/// Error of the event primitives.
#[derive(Debug, Error)]
pub enum Error {
    /// A wait group transition would take the counter below zero.
    ///
    /// The counter is left untouched when this is reported,
    /// it usually points at a duplicated `done()`.
    #[error("wait group counter would go negative: {count} {delta:+}")]
    NegativeCounter { count: usize, delta: isize },

    /// A non-blocking write hit a full bounded channel.
    #[error("channel is full")]
    Full,

    /// A select with a timeout but no default action expired.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The wait was unwound by its cancellation signal.
    #[error("operation cancelled")]
    Cancelled,

    /// The channel is completed and drained.
    #[error("channel is completed")]
    Completed,

    /// A select case handler returned an error.
    ///
    /// The value handed to the handler has already
    /// been consumed from its channel.
    #[error("select handler failed: {0}")]
    Handler(#[source] anyhow::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NegativeCounter { .. } | Self::Full => ErrorKind::Usage,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancellation,
            Self::Completed => ErrorKind::Completed,
            Self::Handler(_) => ErrorKind::Handler,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NegativeCounter { .. } => "STRAND_NEGATIVE_COUNTER",
            Self::Full => "STRAND_FULL",
            Self::Timeout(_) => "STRAND_TIMEOUT",
            Self::Cancelled => "STRAND_CANCELLED",
            Self::Completed => "STRAND_COMPLETED",
            Self::Handler(_) => "STRAND_HANDLER",
        }
    }

    /// Whether this error is an ordinary shutdown signal
    /// (cancellation or channel completion).
    pub fn is_shutdown(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Cancellation | ErrorKind::Completed
        )
    }
}

/// Failed channel write.
///
/// The value that could not be written is handed
/// back to the caller together with the reason.
pub struct WriteError<T> {
    value: T,
    reason: Error,
}

impl<T> WriteError<T> {
    pub(crate) fn new(value: T, reason: Error) -> Self {
        Self { value, reason }
    }

    /// Why the write failed, one of [`Error::Full`],
    /// [`Error::Completed`] or [`Error::Cancelled`].
    pub fn reason(&self) -> &Error {
        &self.reason
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    /// Drop the value and keep the reason.
    pub fn into_error(self) -> Error {
        self.reason
    }
}

impl<T> fmt::Debug for WriteError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteError")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for WriteError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "write failed: {}", self.reason)
    }
}

impl<T> std::error::Error for WriteError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

impl<T> From<WriteError<T>> for Error {
    fn from(err: WriteError<T>) -> Self {
        err.reason
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_kind_and_code() {
        let err = Error::NegativeCounter { count: 0, delta: -1 };
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(err.code(), "STRAND_NEGATIVE_COUNTER");
        assert!(!err.is_shutdown());
        assert_eq!(
            err.to_string(),
            "wait group counter would go negative: 0 -1"
        );

        assert!(Error::Cancelled.is_shutdown());
        assert!(Error::Completed.is_shutdown());
        assert!(!Error::Timeout(Duration::from_millis(5)).is_shutdown());
        assert!(!Error::Handler(anyhow::anyhow!("boom")).is_shutdown());
    }

    #[test]
    fn test_write_error() {
        let err = WriteError::new(7usize, Error::Full);
        assert!(matches!(err.reason(), Error::Full));
        assert_eq!(err.to_string(), "write failed: channel is full");
        assert_eq!(err.into_inner(), 7);
    }
}
