//! Shared view of a running server.
//!
//! `start` writes the listener state, `stop` (through the shutdown procedure)
//! reads it and requests the drain. Everything lives in `watch` channels, so
//! both sides can observe transitions without locks.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::ServerError;
use crate::http::inflight::InFlightTracker;
use crate::lifecycle::state::{ListenerState, ShutdownPhase};

/// Cloneable handle onto one server instance's lifecycle.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    listener: watch::Sender<ListenerState>,
    phase: watch::Sender<ShutdownPhase>,
    /// Stop accepting and let in-flight requests finish.
    graceful: watch::Sender<bool>,
    /// Abandon the drain and drop the serving loop.
    force: watch::Sender<bool>,
    in_flight: InFlightTracker,
}

/// Outcome of asking to run the stop procedure.
#[derive(Debug)]
pub(crate) enum StopAdmission {
    /// Hold the guard for as long as the procedure runs.
    Proceed(PhaseReset),
    AlreadyFinished(ShutdownPhase),
}

/// Puts the coordinator back to `Idle` when dropped, unless the phase has
/// moved on from the one it guards. Covers both a procedure that returned
/// without draining and a `stop` future dropped mid-flight.
#[derive(Debug)]
pub(crate) struct PhaseReset {
    handle: ServerHandle,
    guarded: ShutdownPhase,
}

impl Drop for PhaseReset {
    fn drop(&mut self) {
        let guarded = self.guarded;
        let reverted = self.handle.inner.phase.send_if_modified(|phase| {
            if *phase == guarded {
                *phase = ShutdownPhase::Idle;
                true
            } else {
                false
            }
        });
        if reverted {
            tracing::debug!(phase = %guarded, "Shutdown phase reset to idle");
        }
    }
}

impl ServerHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                listener: watch::Sender::new(ListenerState::Unbound),
                phase: watch::Sender::new(ShutdownPhase::Idle),
                graceful: watch::Sender::new(false),
                force: watch::Sender::new(false),
                in_flight: InFlightTracker::new(),
            }),
        }
    }

    pub fn listener_state(&self) -> ListenerState {
        self.inner.listener.borrow().clone()
    }

    /// Bound address while the listener is live.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match *self.inner.listener.borrow() {
            ListenerState::Listening(addr) => Some(addr),
            _ => None,
        }
    }

    pub fn phase(&self) -> ShutdownPhase {
        *self.inner.phase.borrow()
    }

    /// Requests currently being handled.
    pub fn in_flight(&self) -> u64 {
        self.inner.in_flight.active_count()
    }

    /// Wait until `start` has bound its listener.
    ///
    /// Returns the bound address, or `None` if the bind failed or the
    /// serving loop had already finished. Never returns while the server is
    /// unstarted.
    pub async fn listening(&self) -> Option<SocketAddr> {
        let mut rx = self.inner.listener.subscribe();
        let state = rx
            .wait_for(|state| {
                !matches!(state, ListenerState::Unbound | ListenerState::Binding)
            })
            .await
            .ok()?;
        match *state {
            ListenerState::Listening(addr) => Some(addr),
            _ => None,
        }
    }

    /// Stop accepting connections and drain in-flight requests within
    /// `timeout`.
    ///
    /// If the deadline passes, the serving loop is dropped and
    /// [`ServerError::ShutdownTimeout`] is returned. Draining a server that
    /// was never started returns [`ServerError::NotStarted`]; draining one
    /// that already closed succeeds without doing anything.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), ServerError> {
        let mut listener_rx = self.inner.listener.subscribe();
        let settled = listener_rx
            .wait_for(|state| !matches!(state, ListenerState::Binding))
            .await
            .map_err(|_| channel_closed())?
            .clone();

        match settled {
            ListenerState::Unbound | ListenerState::BindFailed(_) => {
                return Err(ServerError::NotStarted)
            }
            ListenerState::Closed => {
                tracing::debug!("Listener already closed, nothing to drain");
                self.settle_phase(ShutdownPhase::Stopped);
                return Ok(());
            }
            ListenerState::Failed(reason) => return Err(ServerError::ShutdownExecution(reason)),
            ListenerState::Binding | ListenerState::Listening(_) => {}
        }

        tracing::info!(
            timeout = ?timeout,
            in_flight = self.in_flight(),
            "Draining listener"
        );
        self.inner.phase.send_replace(ShutdownPhase::Draining);
        // If this future is dropped before a verdict, a later stop can drain again.
        let _reset = PhaseReset {
            handle: self.clone(),
            guarded: ShutdownPhase::Draining,
        };
        self.inner.graceful.send_replace(true);

        let drained = tokio::time::timeout(
            timeout,
            listener_rx.wait_for(ListenerState::is_finished),
        )
        .await;

        match drained {
            Ok(Ok(state)) => {
                let failure = match &*state {
                    ListenerState::Failed(reason) => Some(reason.clone()),
                    _ => None,
                };
                drop(state);
                self.inner.phase.send_replace(ShutdownPhase::Stopped);
                match failure {
                    Some(reason) => Err(ServerError::ShutdownExecution(reason)),
                    None => {
                        tracing::info!("Listener drained");
                        Ok(())
                    }
                }
            }
            Ok(Err(_)) => Err(channel_closed()),
            Err(_) => {
                let in_flight = self.in_flight();
                self.inner.force.send_replace(true);
                self.inner.phase.send_replace(ShutdownPhase::TimedOut);
                tracing::warn!(
                    timeout = ?timeout,
                    in_flight,
                    "Drain deadline passed, forcing listener closed"
                );
                Err(ServerError::ShutdownTimeout { timeout, in_flight })
            }
        }
    }

    pub(crate) fn in_flight_tracker(&self) -> &InFlightTracker {
        &self.inner.in_flight
    }

    pub(crate) fn begin_binding(&self) -> Result<(), ServerError> {
        let mut outcome = Ok(());
        self.inner.listener.send_if_modified(|state| match state {
            ListenerState::Unbound | ListenerState::BindFailed(_) => {
                *state = ListenerState::Binding;
                true
            }
            ListenerState::Binding | ListenerState::Listening(_) => {
                outcome = Err(ServerError::AlreadyStarted);
                false
            }
            ListenerState::Closed | ListenerState::Failed(_) => {
                outcome = Err(ServerError::Closed);
                false
            }
        });
        outcome
    }

    pub(crate) fn bind_failed(&self, error: &ServerError) {
        self.inner
            .listener
            .send_replace(ListenerState::BindFailed(error.to_string()));
    }

    pub(crate) fn mark_listening(&self, addr: SocketAddr) {
        self.inner.listener.send_replace(ListenerState::Listening(addr));
    }

    pub(crate) fn mark_finished(&self, result: &std::io::Result<()>) {
        let state = match result {
            Ok(()) => ListenerState::Closed,
            Err(e) => ListenerState::Failed(e.to_string()),
        };
        self.inner.listener.send_replace(state);
    }

    /// Resolves once a graceful drain has been requested.
    pub(crate) fn graceful_requested(&self) -> impl Future<Output = ()> + Send + 'static {
        wait_for_flag(self.inner.graceful.subscribe())
    }

    /// Resolves once the drain deadline has passed.
    pub(crate) fn force_requested(&self) -> impl Future<Output = ()> + Send + 'static {
        wait_for_flag(self.inner.force.subscribe())
    }

    /// Move `Idle → WaitingForSignal` for a new stop.
    pub(crate) fn begin_stop(&self) -> Result<StopAdmission, ServerError> {
        let mut finished = Ok(None);
        self.inner.phase.send_if_modified(|phase| match *phase {
            ShutdownPhase::Idle => {
                *phase = ShutdownPhase::WaitingForSignal;
                true
            }
            ShutdownPhase::WaitingForSignal | ShutdownPhase::Draining => {
                finished = Err(ServerError::StopInProgress);
                false
            }
            done @ (ShutdownPhase::Stopped | ShutdownPhase::TimedOut) => {
                finished = Ok(Some(done));
                false
            }
        });

        Ok(match finished? {
            Some(done) => StopAdmission::AlreadyFinished(done),
            None => StopAdmission::Proceed(PhaseReset {
                handle: self.clone(),
                guarded: ShutdownPhase::WaitingForSignal,
            }),
        })
    }

    fn settle_phase(&self, terminal: ShutdownPhase) {
        self.inner.phase.send_if_modified(|phase| {
            if phase.is_terminal() {
                false
            } else {
                *phase = terminal;
                true
            }
        });
    }
}

impl Default for ServerHandle {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_for_flag(mut rx: watch::Receiver<bool>) {
    // The sender lives as long as the handle; an error means it is gone and
    // nobody is left to serve for.
    let _ = rx.wait_for(|set| *set).await;
}

fn channel_closed() -> ServerError {
    ServerError::ShutdownExecution("listener state channel closed".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_before_start_is_not_started() {
        let handle = ServerHandle::new();
        let err = handle.shutdown(Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, ServerError::NotStarted));
        assert_eq!(handle.phase(), ShutdownPhase::Idle);
    }

    #[tokio::test]
    async fn drain_after_close_is_a_no_op() {
        let handle = ServerHandle::new();
        handle.begin_binding().unwrap();
        handle.mark_listening("127.0.0.1:1".parse().unwrap());
        handle.mark_finished(&Ok(()));

        handle.shutdown(Duration::from_millis(100)).await.unwrap();
        assert_eq!(handle.phase(), ShutdownPhase::Stopped);
    }

    #[tokio::test]
    async fn drain_waits_for_serving_loop() {
        let handle = ServerHandle::new();
        handle.begin_binding().unwrap();
        handle.mark_listening("127.0.0.1:1".parse().unwrap());

        // Stand-in for the serving loop.
        let serving = {
            let handle = handle.clone();
            tokio::spawn(async move {
                handle.graceful_requested().await;
                handle.mark_finished(&Ok(()));
            })
        };

        handle.shutdown(Duration::from_secs(1)).await.unwrap();
        assert_eq!(handle.phase(), ShutdownPhase::Stopped);
        assert_eq!(handle.listener_state(), ListenerState::Closed);
        serving.await.unwrap();
    }

    #[tokio::test]
    async fn drain_deadline_forces_close() {
        let handle = ServerHandle::new();
        handle.begin_binding().unwrap();
        handle.mark_listening("127.0.0.1:1".parse().unwrap());
        let _request = handle.in_flight_tracker().track();

        let err = handle
            .shutdown(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServerError::ShutdownTimeout { in_flight: 1, .. }
        ));
        assert_eq!(handle.phase(), ShutdownPhase::TimedOut);

        tokio::time::timeout(Duration::from_secs(1), handle.force_requested())
            .await
            .expect("force flag not raised");
    }

    #[tokio::test]
    async fn cancelled_drain_lets_a_later_stop_retry() {
        let handle = ServerHandle::new();
        handle.begin_binding().unwrap();
        handle.mark_listening("127.0.0.1:1".parse().unwrap());
        let _request = handle.in_flight_tracker().track();

        let cancelled = tokio::time::timeout(
            Duration::from_millis(20),
            handle.shutdown(Duration::from_secs(5)),
        )
        .await;
        assert!(cancelled.is_err());
        assert_eq!(handle.phase(), ShutdownPhase::Idle);

        let err = handle
            .shutdown(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::ShutdownTimeout { .. }));
        assert_eq!(handle.phase(), ShutdownPhase::TimedOut);
    }

    #[test]
    fn second_start_is_rejected() {
        let handle = ServerHandle::new();
        handle.begin_binding().unwrap();
        assert!(matches!(
            handle.begin_binding(),
            Err(ServerError::AlreadyStarted)
        ));

        handle.bind_failed(&ServerError::NotStarted);
        assert!(handle.begin_binding().is_ok());
    }

    #[tokio::test]
    async fn listening_resolves_after_bind_failure() {
        let handle = ServerHandle::new();
        handle.begin_binding().unwrap();

        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.listening().await })
        };
        handle.bind_failed(&ServerError::Bind {
            address: "127.0.0.1:1".into(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        });

        let addr = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("listening() still pending after bind failure")
            .unwrap();
        assert_eq!(addr, None);
        assert!(matches!(
            handle.listener_state(),
            ListenerState::BindFailed(_)
        ));
    }

    #[test]
    fn stop_admission_follows_phase() {
        let handle = ServerHandle::new();
        let admission = handle.begin_stop().unwrap();
        assert!(matches!(admission, StopAdmission::Proceed(_)));
        assert_eq!(handle.phase(), ShutdownPhase::WaitingForSignal);
        assert!(matches!(
            handle.begin_stop(),
            Err(ServerError::StopInProgress)
        ));

        drop(admission);
        assert_eq!(handle.phase(), ShutdownPhase::Idle);
    }

    #[test]
    fn finished_phase_is_not_reset() {
        let handle = ServerHandle::new();
        let admission = handle.begin_stop().unwrap();
        handle.inner.phase.send_replace(ShutdownPhase::Stopped);
        drop(admission);

        assert_eq!(handle.phase(), ShutdownPhase::Stopped);
        assert!(matches!(
            handle.begin_stop(),
            Ok(StopAdmission::AlreadyFinished(ShutdownPhase::Stopped))
        ));
    }
}
