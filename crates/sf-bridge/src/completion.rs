//! Single-slot completion signal between host callbacks and a waiting caller.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tracing::debug;

use crate::config::MIN_LIVENESS_INTERVAL;
use crate::error::{Error, ErrorKind, Result};

/// How a host call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Completion {
    /// Response payload.
    Fulfilled(Vec<u8>),
    /// Host-reported failure message.
    Rejected(String),
    /// A callback received arguments of the wrong shape.
    Violated(String),
}

/// Write side, cloned into every callback of one invocation.
///
/// The first deposit wins. Once every clone is dropped without a deposit the
/// waiting side sees the signal as abandoned.
#[derive(Clone)]
pub(crate) struct CompletionSlot {
    tx: Arc<Mutex<Option<oneshot::Sender<Completion>>>>,
}

impl CompletionSlot {
    /// Deposit an outcome. Returns false if one was already deposited or the
    /// waiter has gone away.
    pub(crate) fn deposit(&self, completion: Completion) -> bool {
        let sender = match self.tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => tx.send(completion).is_ok(),
            None => false,
        }
    }
}

/// Read side, owned by the waiting caller.
pub(crate) struct CompletionSignal {
    rx: oneshot::Receiver<Completion>,
}

pub(crate) fn channel() -> (CompletionSlot, CompletionSignal) {
    let (tx, rx) = oneshot::channel();
    (
        CompletionSlot {
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        CompletionSignal { rx },
    )
}

impl CompletionSignal {
    /// Wait for the first deposit.
    ///
    /// Wakes every `interval` (at least [`MIN_LIVENESS_INTERVAL`]) to log that
    /// the call is still pending. Gives up with [`ErrorKind::Timeout`] once
    /// `timeout` has elapsed, if one is set.
    pub(crate) async fn wait(
        mut self,
        operation: &str,
        interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<Completion> {
        let interval = interval.max(MIN_LIVENESS_INTERVAL);
        let started = Instant::now();
        loop {
            let tick = match timeout {
                Some(limit) => interval.min(limit.saturating_sub(started.elapsed())),
                None => interval,
            };

            match tokio::time::timeout(tick, &mut self.rx).await {
                Ok(Ok(completion)) => return Ok(completion),
                Ok(Err(_)) => {
                    return Err(Error::contract(format!(
                        "{operation} dropped its callbacks without calling either"
                    )))
                }
                Err(_) => {
                    let waited = started.elapsed();
                    if timeout.is_some_and(|limit| waited >= limit) {
                        return Err(Error::new(ErrorKind::Timeout { waited }));
                    }
                    debug!(
                        operation,
                        waited_ms = waited.as_millis() as u64,
                        "still waiting for host response"
                    );
                }
            }
        }
    }
}
