//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::BoundedListener)
//!     → server.rs (Axum setup, middleware)
//!     → inflight.rs (count the request until it is answered)
//!     → handler.rs (caller-supplied dispatch)
//!     → Send to client
//! ```

pub mod handler;
pub mod inflight;
pub mod server;

pub use handler::Handler;
pub use inflight::InFlightTracker;
pub use server::{HttpServer, HttpServerOptions};
