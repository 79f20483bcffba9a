//! Shutdown procedures.
//!
//! A [`ShutdownProcedure`] is what `stop` runs. The built-in policy is a
//! two-phase graceful shutdown: wait for a [`ShutdownTrigger`], then drain
//! the listener under a deadline. Callers can replace it with their own
//! async function.

use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ServerError;
use crate::lifecycle::handle::ServerHandle;
use crate::lifecycle::trigger::ShutdownTrigger;

/// Drain window used when nothing else is configured.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Future returned by a shutdown procedure.
pub type ShutdownFuture = BoxFuture<'static, Result<(), ServerError>>;

/// Wait for a trigger, then drain with a deadline.
#[derive(Debug, Clone)]
pub struct GracefulShutdown {
    trigger: ShutdownTrigger,
    drain_timeout: Duration,
}

impl GracefulShutdown {
    pub fn new(trigger: ShutdownTrigger, drain_timeout: Duration) -> Self {
        Self {
            trigger,
            drain_timeout,
        }
    }

    pub fn trigger(&self) -> &ShutdownTrigger {
        &self.trigger
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// Run both phases against `handle`.
    pub async fn run(&self, handle: ServerHandle) -> Result<(), ServerError> {
        tracing::info!(drain_timeout = ?self.drain_timeout, "Waiting for shutdown trigger");
        let cause = self.trigger.wait().await?;
        tracing::info!(%cause, "Shutdown triggered");

        handle.shutdown(self.drain_timeout).await
    }
}

/// SIGINT/SIGTERM with a five second drain.
impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new(ShutdownTrigger::os_signals(), DEFAULT_DRAIN_TIMEOUT)
    }
}

type CustomFn = dyn Fn(ServerHandle) -> ShutdownFuture + Send + Sync;

/// The procedure `stop` runs, chosen at construction.
#[derive(Clone)]
pub enum ShutdownProcedure {
    Graceful(GracefulShutdown),
    /// Caller-supplied logic. It receives the server's handle and is
    /// responsible for calling [`ServerHandle::shutdown`] if the listener
    /// should actually close.
    Custom(Arc<CustomFn>),
}

impl ShutdownProcedure {
    pub fn graceful(trigger: ShutdownTrigger, drain_timeout: Duration) -> Self {
        ShutdownProcedure::Graceful(GracefulShutdown::new(trigger, drain_timeout))
    }

    pub fn custom<F, Fut>(f: F) -> Self
    where
        F: Fn(ServerHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ServerError>> + Send + 'static,
    {
        ShutdownProcedure::Custom(Arc::new(move |handle: ServerHandle| f(handle).boxed()))
    }

    pub fn is_graceful(&self) -> bool {
        matches!(self, ShutdownProcedure::Graceful(_))
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ShutdownProcedure::Graceful(_) => "graceful",
            ShutdownProcedure::Custom(_) => "custom",
        }
    }

    pub(crate) fn invoke(&self, handle: ServerHandle) -> ShutdownFuture {
        match self {
            ShutdownProcedure::Graceful(graceful) => {
                let graceful = graceful.clone();
                async move { graceful.run(handle).await }.boxed()
            }
            ShutdownProcedure::Custom(f) => f(handle),
        }
    }
}

impl Default for ShutdownProcedure {
    fn default() -> Self {
        ShutdownProcedure::Graceful(GracefulShutdown::default())
    }
}

impl std::fmt::Debug for ShutdownProcedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownProcedure::Graceful(graceful) => {
                f.debug_tuple("Graceful").field(graceful).finish()
            }
            ShutdownProcedure::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn default_policy_is_signals_with_five_seconds() {
        let procedure = ShutdownProcedure::default();
        match &procedure {
            ShutdownProcedure::Graceful(graceful) => {
                assert!(matches!(graceful.trigger(), ShutdownTrigger::Signals));
                assert_eq!(graceful.drain_timeout(), Duration::from_secs(5));
            }
            other => panic!("unexpected default {:?}", other),
        }
        assert_eq!(procedure.name(), "graceful");
    }

    #[tokio::test]
    async fn custom_procedure_receives_handle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let procedure = ShutdownProcedure::custom(move |_handle| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        assert!(!procedure.is_graceful());

        procedure.invoke(ServerHandle::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn graceful_on_unstarted_server_reports_not_started() {
        let procedure = ShutdownProcedure::graceful(
            ShutdownTrigger::immediate(),
            Duration::from_millis(100),
        );
        let err = procedure.invoke(ServerHandle::new()).await.unwrap_err();
        assert!(matches!(err, ServerError::NotStarted));
    }
}
