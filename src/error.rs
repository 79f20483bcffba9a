//! Error types shared by the server and the shutdown coordinator.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by server lifecycle operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound (address in use, invalid address, permission denied).
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The listener closed because shutdown was requested.
    ///
    /// Returned by `start` after a graceful stop. Not a failure; check with
    /// [`ServerError::is_closed`].
    #[error("server closed")]
    Closed,

    /// The drain window elapsed before in-flight requests completed.
    #[error("graceful shutdown timed out after {timeout:?} with {in_flight} request(s) in flight")]
    ShutdownTimeout { timeout: Duration, in_flight: u64 },

    /// The drain itself failed for a reason other than the deadline.
    #[error("shutdown failed: {0}")]
    ShutdownExecution(String),

    /// The serving loop failed after the listener was bound.
    #[error("serve loop failed: {0}")]
    Serve(#[source] std::io::Error),

    /// Termination signal handlers could not be installed.
    #[error("failed to listen for termination signals: {0}")]
    Signal(#[source] std::io::Error),

    /// `start` was called while a listener is already bound or binding.
    #[error("server already started")]
    AlreadyStarted,

    /// A drain was requested but no listener was ever started.
    #[error("server has not been started")]
    NotStarted,

    /// `stop` was called while another stop is still running.
    #[error("stop already in progress")]
    StopInProgress,
}

impl ServerError {
    /// True for the graceful-close sentinel.
    pub fn is_closed(&self) -> bool {
        matches!(self, ServerError::Closed)
    }
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_is_the_only_sentinel() {
        assert!(ServerError::Closed.is_closed());
        assert!(!ServerError::NotStarted.is_closed());
        assert!(!ServerError::ShutdownTimeout {
            timeout: Duration::from_secs(5),
            in_flight: 1,
        }
        .is_closed());
    }

    #[test]
    fn bind_error_names_address() {
        let err = ServerError::Bind {
            address: "0.0.0.0:8080".into(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert!(err.to_string().contains("0.0.0.0:8080"));
    }
}
