//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! start (http/server.rs):
//!     Bind → Listening → serve until graceful/force flag → Closed
//!
//! stop → ShutdownProcedure (shutdown.rs):
//!     Idle → WaitingForSignal ─ trigger.rs (SIGINT/SIGTERM, manual, immediate)
//!          → Draining ─ handle.rs (stop accepting, wait for in-flight, deadline)
//!          → Stopped | TimedOut
//! ```
//!
//! # Design Decisions
//! - "When to stop" (trigger) is separate from "how to stop" (drain)
//! - The default policy is a value built once at construction, not a closure
//!   rebuilt on demand
//! - Shutdown has a timeout: the serving loop is dropped after the deadline

pub mod handle;
pub mod shutdown;
pub mod signals;
pub mod state;
pub mod trigger;

pub use handle::ServerHandle;
pub use shutdown::{GracefulShutdown, ShutdownProcedure, DEFAULT_DRAIN_TIMEOUT};
pub use signals::TerminationSignal;
pub use state::{ListenerState, ShutdownPhase};
pub use trigger::{ShutdownCause, ShutdownSwitch, ShutdownTrigger};
