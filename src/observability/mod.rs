//! Observability subsystem.
//!
//! All subsystems emit `tracing` events with structured fields; `logging.rs`
//! decides where they go. HTTP access spans come from tower-http's
//! `TraceLayer` in `http/server.rs`.

pub mod logging;
