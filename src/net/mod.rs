//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - Bind errors surface immediately; accept errors are logged and retried

pub mod listener;

pub use listener::{resolve_bind_address, BoundedListener, LimitedStream};
