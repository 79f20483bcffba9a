//! Lifecycle states shared between `start` and `stop`.

use std::fmt;
use std::net::SocketAddr;

/// Where the listener is in its life.
///
/// ```text
/// Unbound → Binding → Listening(addr) → Closed | Failed
///              ↓ (bind error)
///           BindFailed → Binding (retry)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerState {
    /// `start` has not been called.
    Unbound,
    /// `start` is binding the socket.
    Binding,
    /// The last bind attempt failed; `start` may be called again.
    BindFailed(String),
    /// Accepting connections on this address.
    Listening(SocketAddr),
    /// The serving loop ended after a shutdown request.
    Closed,
    /// The serving loop ended with an I/O error.
    Failed(String),
}

impl ListenerState {
    /// True once the serving loop has ended for good.
    pub fn is_finished(&self) -> bool {
        matches!(self, ListenerState::Closed | ListenerState::Failed(_))
    }
}

/// Phase of the shutdown coordinator.
///
/// ```text
/// Idle → WaitingForSignal → Draining → Stopped
///                                    ↘ TimedOut
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Idle,
    WaitingForSignal,
    Draining,
    Stopped,
    TimedOut,
}

impl ShutdownPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, ShutdownPhase::Stopped | ShutdownPhase::TimedOut)
    }
}

impl fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShutdownPhase::Idle => "idle",
            ShutdownPhase::WaitingForSignal => "waiting-for-signal",
            ShutdownPhase::Draining => "draining",
            ShutdownPhase::Stopped => "stopped",
            ShutdownPhase::TimedOut => "timed-out",
        };
        f.write_str(name)
    }
}
