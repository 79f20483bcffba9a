//! Start/stop abstraction for network servers, with signal-driven graceful
//! shutdown.
//!
//! ```text
//!   caller ── spawn ──▶ Server::start ──▶ net::BoundedListener ──▶ http::Handler
//!     │                      ▲
//!     └──── Server::stop ────┤ lifecycle::ServerHandle
//!              │             │   (graceful flag, force flag, listener state)
//!              ▼             │
//!     lifecycle::ShutdownProcedure
//!        wait for trigger ──▶ drain with deadline
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use http::{Handler, HttpServer, HttpServerOptions};
pub use lifecycle::{ServerHandle, ShutdownProcedure, ShutdownSwitch, ShutdownTrigger};
pub use server::Server;
