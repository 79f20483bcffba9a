//! What tells a graceful shutdown to begin.
//!
//! The trigger only decides *when*; the drain that follows is the same
//! whichever trigger fired.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::ServerError;
use crate::lifecycle::signals::{wait_for_termination, TerminationSignal};

/// Source of the shutdown request.
#[derive(Debug, Clone)]
pub enum ShutdownTrigger {
    /// SIGINT or SIGTERM delivered to the process.
    Signals,
    /// A [`ShutdownSwitch`] held by an admin endpoint, test harness, etc.
    Manual(watch::Receiver<bool>),
    /// Fire as soon as the trigger is awaited.
    Immediate,
}

impl ShutdownTrigger {
    pub fn os_signals() -> Self {
        ShutdownTrigger::Signals
    }

    /// A trigger fired by hand. The switch may be fired before or after the
    /// trigger is awaited.
    pub fn manual() -> (Self, ShutdownSwitch) {
        let (tx, rx) = watch::channel(false);
        (
            ShutdownTrigger::Manual(rx),
            ShutdownSwitch { tx: Arc::new(tx) },
        )
    }

    pub fn immediate() -> Self {
        ShutdownTrigger::Immediate
    }

    /// Wait for the trigger to fire.
    ///
    /// A manual trigger whose switch is dropped unfired never fires.
    pub async fn wait(&self) -> Result<ShutdownCause, ServerError> {
        match self {
            ShutdownTrigger::Signals => wait_for_termination()
                .await
                .map(ShutdownCause::Signal)
                .map_err(ServerError::Signal),
            ShutdownTrigger::Manual(rx) => {
                let mut rx = rx.clone();
                if rx.wait_for(|fired| *fired).await.is_err() {
                    tracing::debug!("Shutdown switch dropped without firing");
                    std::future::pending::<()>().await;
                }
                Ok(ShutdownCause::Manual)
            }
            ShutdownTrigger::Immediate => Ok(ShutdownCause::Immediate),
        }
    }
}

/// Hand-operated side of [`ShutdownTrigger::manual`].
#[derive(Debug, Clone)]
pub struct ShutdownSwitch {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSwitch {
    /// Fire the trigger. Firing twice is harmless.
    pub fn fire(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Why a graceful shutdown started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    Signal(TerminationSignal),
    Manual,
    Immediate,
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownCause::Signal(signal) => write!(f, "signal {}", signal),
            ShutdownCause::Manual => f.write_str("manual trigger"),
            ShutdownCause::Immediate => f.write_str("immediate trigger"),
        }
    }
}
