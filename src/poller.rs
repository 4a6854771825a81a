//! Polling the protected resource until a pending payment is recognized.

use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::{
    client::ResourceClient,
    models::{AccessOutcome, Credential, PollConfig, ResourcePayload},
};

/// The live state of a poll cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollStatus {
    /// Still waiting; `attempts_made` attempts have seen the payment pending.
    Polling { attempts_made: u32 },
    Succeeded,
    Exhausted,
    Aborted,
}

/// The bookkeeping of one poll cycle, bound to a single credential.
#[derive(Clone, Debug)]
pub struct PollState {
    pub credential: Credential,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub interval: Duration,
}

/// How a poll cycle ended.
#[derive(Clone, Debug)]
pub enum PollOutcome {
    /// The resource was granted on attempt number `attempts`.
    Succeeded { payload: ResourcePayload, attempts: u32 },

    /// Every attempt saw the payment still pending.
    Exhausted { attempts: u32 },

    /// Polling stopped before the payment was seen or the budget ran out.
    Aborted(PollAbort),
}

/// Why a poll cycle was aborted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollAbort {
    /// The server answered with an error status.
    Failed { status: u16, status_text: String },

    /// The server could not be reached.
    Transport(String),

    /// The cycle was cancelled by its owner.
    Cancelled,

    /// The poll task itself died.
    TaskFailed(String),
}

/// Spawns poll cycles against a resource.
pub struct PaymentPoller {
    client: Arc<dyn ResourceClient>,
    config: PollConfig,
}

impl PaymentPoller {
    pub fn new(client: Arc<dyn ResourceClient>, config: PollConfig) -> Self {
        Self { client, config }
    }

    /// Start polling with `credential` on a background task.
    ///
    /// Cancelling `cancel` (or calling [`PollHandle::cancel`]) stops the cycle before its next
    /// tick acts, including a tick whose request is already in flight. Dropping the handle, or
    /// the future returned by [`PollHandle::outcome`], cancels `cancel` as well.
    pub fn spawn(&self, credential: Credential, cancel: CancellationToken) -> PollHandle {
        let state = PollState {
            credential,
            attempts_made: 0,
            max_attempts: self.config.max_attempts,
            interval: self.config.interval,
        };
        let (status_tx, status_rx) = watch::channel(PollStatus::Polling { attempts_made: 0 });
        let task = tokio::spawn(run(self.client.clone(), state, cancel.clone(), status_tx));
        let guard = cancel.clone().drop_guard();
        PollHandle { cancel, status: status_rx, task, _guard: guard }
    }
}

/// A running poll cycle.
pub struct PollHandle {
    cancel: CancellationToken,
    status: watch::Receiver<PollStatus>,
    task: JoinHandle<PollOutcome>,
    _guard: DropGuard,
}

impl PollHandle {
    /// The current status of the cycle.
    pub fn status(&self) -> PollStatus {
        *self.status.borrow()
    }

    /// A receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<PollStatus> {
        self.status.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the cycle to end.
    pub async fn outcome(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => PollOutcome::Aborted(PollAbort::TaskFailed(e.to_string())),
        }
    }
}

async fn run(
    client: Arc<dyn ResourceClient>,
    mut state: PollState,
    cancel: CancellationToken,
    status: watch::Sender<PollStatus>,
) -> PollOutcome {
    if state.max_attempts == 0 {
        status.send_replace(PollStatus::Exhausted);
        return PollOutcome::Exhausted { attempts: 0 };
    }

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return abort(&status, PollAbort::Cancelled),
            _ = sleep(state.interval) => {}
        }

        let attempt = tokio::select! {
            biased;
            _ = cancel.cancelled() => return abort(&status, PollAbort::Cancelled),
            attempt = client.attempt(Some(&state.credential)) => attempt,
        };
        if cancel.is_cancelled() {
            return abort(&status, PollAbort::Cancelled);
        }

        state.attempts_made += 1;
        debug!(
            "Poll attempt {}/{}: {:?}",
            state.attempts_made,
            state.max_attempts,
            attempt.outcome.kind()
        );
        match attempt.outcome {
            AccessOutcome::Granted(payload) => {
                info!("Payment confirmed after {} poll attempts", state.attempts_made);
                status.send_replace(PollStatus::Succeeded);
                return PollOutcome::Succeeded { payload, attempts: state.attempts_made };
            }
            AccessOutcome::ChallengeIssued(_) if state.attempts_made < state.max_attempts => {
                status.send_replace(PollStatus::Polling { attempts_made: state.attempts_made });
            }
            AccessOutcome::ChallengeIssued(_) => {
                warn!("Payment not confirmed after {} poll attempts", state.attempts_made);
                status.send_replace(PollStatus::Exhausted);
                return PollOutcome::Exhausted { attempts: state.attempts_made };
            }
            AccessOutcome::Failed { status: code, status_text } => {
                return abort(&status, PollAbort::Failed { status: code, status_text });
            }
            AccessOutcome::TransportError(message) => return abort(&status, PollAbort::Transport(message)),
        }
    }
}

fn abort(status: &watch::Sender<PollStatus>, reason: PollAbort) -> PollOutcome {
    if reason != PollAbort::Cancelled {
        warn!("Polling aborted: {reason:?}");
    }
    status.send_replace(PollStatus::Aborted);
    PollOutcome::Aborted(reason)
}
