//! Caller-supplied request dispatch.
//!
//! The server does no routing of its own; every request goes to one
//! [`Handler`]. The default answers `200 OK` with an empty body.

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;

type DispatchFn = dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync;

/// Application entry point for inbound requests.
#[derive(Clone)]
pub struct Handler {
    dispatch: Arc<DispatchFn>,
}

impl Handler {
    /// Wrap an async function as a handler.
    pub fn from_fn<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        Self {
            dispatch: Arc::new(move |request: Request| {
                f(request).map(|r| r.into_response()).boxed()
            }),
        }
    }

    /// A handler that answers every request with an empty `200 OK`.
    pub fn empty() -> Self {
        Self::from_fn(|_request| async {})
    }

    /// Dispatch one request.
    pub async fn call(&self, request: Request) -> Response {
        (self.dispatch)(request).await
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}
