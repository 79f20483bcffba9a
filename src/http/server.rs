//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Build the Axum router around the caller's [`Handler`]
//! - Wire up middleware (request ID, tracing, timeout, body limit, in-flight)
//! - Bind the listener and serve until shutdown
//! - Run the configured shutdown procedure on `stop`

use axum::{
    extract::{Request, State},
    middleware,
    response::Response,
    routing::any,
    Router,
};
use std::future::IntoFuture;
use std::time::Duration;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::http::handler::Handler;
use crate::http::inflight::track_in_flight;
use crate::lifecycle::handle::StopAdmission;
use crate::lifecycle::{ServerHandle, ShutdownProcedure, ShutdownTrigger};
use crate::net::BoundedListener;
use crate::server::Server;

/// Construction options for [`HttpServer`].
#[derive(Debug, Clone, Default)]
pub struct HttpServerOptions {
    pub config: ServerConfig,
    pub handler: Handler,
    /// `None` installs the graceful policy: SIGINT/SIGTERM, then drain
    /// within `config.shutdown.drain_timeout_ms`.
    pub shutdown: Option<ShutdownProcedure>,
}

impl HttpServerOptions {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn handler(mut self, handler: Handler) -> Self {
        self.handler = handler;
        self
    }

    pub fn shutdown(mut self, procedure: ShutdownProcedure) -> Self {
        self.shutdown = Some(procedure);
        self
    }
}

/// HTTP implementation of [`Server`].
#[derive(Debug)]
pub struct HttpServer {
    config: ServerConfig,
    handler: Handler,
    shutdown: ShutdownProcedure,
    handle: ServerHandle,
}

impl HttpServer {
    pub fn new(options: HttpServerOptions) -> Self {
        let HttpServerOptions {
            config,
            handler,
            shutdown,
        } = options;

        let shutdown = shutdown.unwrap_or_else(|| {
            ShutdownProcedure::graceful(
                ShutdownTrigger::os_signals(),
                config.shutdown.drain_timeout(),
            )
        });

        Self {
            config,
            handler,
            shutdown,
            handle: ServerHandle::new(),
        }
    }

    /// Lifecycle handle shared with the shutdown procedure.
    pub fn handle(&self) -> &ServerHandle {
        &self.handle
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn shutdown_procedure(&self) -> &ShutdownProcedure {
        &self.shutdown
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", any(dispatch))
            .route("/{*path}", any(dispatch))
            .with_state(self.handler.clone())
            .layer(middleware::from_fn_with_state(
                self.handle.in_flight_tracker().clone(),
                track_in_flight,
            ))
            .layer(RequestBodyLimitLayer::new(self.config.limits.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }
}

impl Server for HttpServer {
    async fn handle_request(&self, request: Request) -> Response {
        self.handler.call(request).await
    }

    async fn start(&self, address: &str) -> Result<(), ServerError> {
        self.handle.begin_binding()?;

        let listener =
            match BoundedListener::bind(address, self.config.listener.max_connections).await {
                Ok(listener) => listener,
                Err(e) => {
                    self.handle.bind_failed(&e);
                    tracing::error!(error = %e, "HTTP server failed to start");
                    return Err(e);
                }
            };
        let local_addr = match axum::serve::Listener::local_addr(&listener) {
            Ok(addr) => addr,
            Err(source) => {
                let e = ServerError::Bind {
                    address: address.to_string(),
                    source,
                };
                self.handle.bind_failed(&e);
                return Err(e);
            }
        };

        self.handle.mark_listening(local_addr);
        tracing::info!(address = %local_addr, "HTTP server starting");

        let serve = axum::serve(listener, self.router())
            .with_graceful_shutdown(self.handle.graceful_requested())
            .into_future();
        let force = self.handle.force_requested();

        let result = tokio::select! {
            result = serve => result,
            _ = force => {
                tracing::warn!(
                    in_flight = self.handle.in_flight(),
                    "Abandoning requests still in flight"
                );
                Ok(())
            }
        };
        self.handle.mark_finished(&result);
        result.map_err(ServerError::Serve)?;

        tracing::info!("HTTP server stopped");
        Err(ServerError::Closed)
    }

    async fn stop(&self) -> Result<(), ServerError> {
        // Resets the phase if the procedure returns without draining or this
        // future is dropped first.
        let reset = match self.handle.begin_stop()? {
            StopAdmission::Proceed(reset) => reset,
            StopAdmission::AlreadyFinished(phase) => {
                tracing::debug!(%phase, "Stop requested after shutdown finished");
                return Ok(());
            }
        };

        tracing::info!(procedure = self.shutdown.name(), "Stopping HTTP server");
        let result = self.shutdown.invoke(self.handle.clone()).await;
        drop(reset);

        match &result {
            Ok(()) => tracing::info!(phase = %self.handle.phase(), "Stop procedure finished"),
            Err(e) => tracing::error!(error = %e, "Stop procedure failed"),
        }
        result
    }
}

/// Hand every request to the caller's handler.
async fn dispatch(State(handler): State<Handler>, request: Request) -> Response {
    handler.call(request).await
}
