//! Transport-neutral server contract.

use axum::{extract::Request, response::Response};
use std::future::Future;

use crate::error::ServerError;

/// A server that can be started, stopped, and handed requests.
///
/// [`HttpServer`](crate::http::HttpServer) is the only implementation; a
/// TLS variant would slot in beside it.
pub trait Server: Send + Sync {
    /// Dispatch one request to application logic.
    fn handle_request(&self, request: Request) -> impl Future<Output = Response> + Send;

    /// Bind `address` and serve until the listener closes.
    ///
    /// Returns [`ServerError::Closed`] after a graceful stop and
    /// [`ServerError::Bind`] if the address cannot be bound. Run it on its
    /// own task when the same caller also needs [`Server::stop`].
    fn start(&self, address: &str) -> impl Future<Output = Result<(), ServerError>> + Send;

    /// Run the configured shutdown procedure and wait for it.
    ///
    /// Calling `stop` again after a finished shutdown is a no-op.
    fn stop(&self) -> impl Future<Output = Result<(), ServerError>> + Send;
}
