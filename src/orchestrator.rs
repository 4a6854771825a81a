//! The access lifecycle: attempt, react to a challenge, wait for payment.

use std::{
    fmt::{self, Display},
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    challenge::parse_challenge,
    client::ResourceClient,
    error::{AccessError, ErrorKind, StoreError},
    models::{AccessOutcome, AuthConfig, Credential, PaymentInstruction, ResourcePayload},
    poller::{PaymentPoller, PollAbort, PollOutcome, PollStatus},
    store::CredentialStore,
};

/// Where the orchestrator is in the access lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    Attempting,
    AwaitingPayment,
    Granted,
    GaveUp,
}

impl Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Attempting => write!(f, "attempting"),
            Self::AwaitingPayment => write!(f, "awaiting payment"),
            Self::Granted => write!(f, "granted"),
            Self::GaveUp => write!(f, "gave up"),
        }
    }
}

/// Notifications for the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub enum AuthEvent {
    /// The lifecycle moved to a new state.
    StateChanged(AuthState),

    /// A payment must be made; the credential it unlocks is already stored.
    PaymentRequired(PaymentInstruction),

    /// A poll attempt saw the payment still pending.
    PollProgress { attempt: u32, max_attempts: u32 },

    /// The resource was granted.
    Granted(ResourcePayload),

    /// The cycle ended without access.
    GaveUp { kind: ErrorKind, message: String },
}

/// The terminal result of one access cycle.
#[derive(Debug)]
pub enum AuthOutcome {
    Granted(ResourcePayload),
    GaveUp(AccessError),

    /// The cycle was cancelled, explicitly or by a newer cycle, before it finished.
    Cancelled,
}

struct Cycle {
    generation: u64,
    cancel: CancellationToken,
    state: AuthState,
}

/// Drives access to a payment-gated resource.
///
/// At most one cycle runs at a time: starting a new one cancels the previous cycle, including
/// its poll loop, and the cancelled cycle resolves to [`AuthOutcome::Cancelled`] without
/// touching the state. Cancelling explicitly, or dropping the future of
/// [`request_access`](Self::request_access), stops the cycle and returns an unfinished state
/// to [`AuthState::Idle`].
pub struct AuthOrchestrator {
    client: Arc<dyn ResourceClient>,
    store: Arc<dyn CredentialStore>,
    config: AuthConfig,
    events: mpsc::UnboundedSender<AuthEvent>,
    cycle: Mutex<Cycle>,
}

impl AuthOrchestrator {
    /// Construct an orchestrator along with the receiving end of its event stream.
    pub fn new(
        client: Arc<dyn ResourceClient>,
        store: Arc<dyn CredentialStore>,
        config: AuthConfig,
    ) -> (Self, mpsc::UnboundedReceiver<AuthEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let cycle = Cycle { generation: 0, cancel: CancellationToken::new(), state: AuthState::Idle };
        let orchestrator = Self { client, store, config, events, cycle: Mutex::new(cycle) };
        (orchestrator, receiver)
    }

    pub fn state(&self) -> AuthState {
        self.lock_cycle().state
    }

    /// The credential currently held by the store, if any.
    pub fn stored_credential(&self) -> Option<Credential> {
        match self.store.get(&self.config.credential_key) {
            Ok(credential) => credential,
            Err(e) => {
                warn!("Could not read stored credential, treating it as absent: {e}");
                None
            }
        }
    }

    /// Attempt access right away if a credential is already stored; otherwise stay idle and
    /// wait for [`request_access`](Self::request_access).
    pub async fn start(&self) -> Option<AuthOutcome> {
        if self.stored_credential().is_some() {
            info!("Found stored credential, attempting access");
            Some(self.request_access().await)
        } else {
            debug!("No stored credential, waiting for an access request");
            None
        }
    }

    /// Run a full access cycle, cancelling any cycle already in progress.
    pub async fn request_access(&self) -> AuthOutcome {
        let (generation, cancel) = self.begin_cycle();
        let _cycle = CycleGuard { orchestrator: self, generation };
        self.transition(generation, AuthState::Attempting);

        let credential = self.stored_credential();
        let attempt = tokio::select! {
            biased;
            _ = cancel.cancelled() => return AuthOutcome::Cancelled,
            attempt = self.client.attempt(credential.as_ref()) => attempt,
        };
        if cancel.is_cancelled() {
            return AuthOutcome::Cancelled;
        }

        match attempt.outcome {
            AccessOutcome::Granted(payload) => self.grant(generation, payload),
            AccessOutcome::ChallengeIssued(response) => {
                info!("Received payment challenge");
                let challenge = match parse_challenge(&response.headers, &self.config.challenge) {
                    Ok(challenge) => challenge,
                    Err(e) => return self.give_up(generation, e.into()),
                };
                match self.persist(generation, &challenge.credential) {
                    Ok(true) => {}
                    Ok(false) => return AuthOutcome::Cancelled,
                    Err(e) => return self.give_up(generation, e.into()),
                }
                info!("Stored new credential under key={}", self.config.credential_key);

                if !self.transition(generation, AuthState::AwaitingPayment) {
                    return AuthOutcome::Cancelled;
                }
                self.emit(generation, AuthEvent::PaymentRequired(challenge.instruction));
                self.await_payment(generation, challenge.credential, cancel).await
            }
            AccessOutcome::Failed { status, status_text } => {
                self.give_up(generation, AccessError::Server { status, status_text })
            }
            AccessOutcome::TransportError(message) => self.give_up(generation, AccessError::Network(message)),
        }
    }

    /// Cancel the cycle in progress, if any.
    ///
    /// An unfinished cycle (`Attempting` or `AwaitingPayment`) goes back to `Idle`; a finished one
    /// keeps its state.
    pub fn cancel(&self) {
        let mut cycle = self.lock_cycle();
        self.retire(&mut cycle);
    }

    async fn await_payment(
        &self,
        generation: u64,
        credential: Credential,
        cancel: CancellationToken,
    ) -> AuthOutcome {
        let max_attempts = self.config.poll.max_attempts;
        let poller = PaymentPoller::new(self.client.clone(), self.config.poll.clone());
        let handle = poller.spawn(credential, cancel.child_token());
        let mut status = handle.subscribe();
        let outcome = handle.outcome();
        tokio::pin!(outcome);

        let outcome = loop {
            tokio::select! {
                biased;
                outcome = &mut outcome => break outcome,
                Ok(()) = status.changed() => {
                    let current = *status.borrow_and_update();
                    if let PollStatus::Polling { attempts_made } = current {
                        self.emit(generation, AuthEvent::PollProgress { attempt: attempts_made, max_attempts });
                    }
                }
            }
        };

        match outcome {
            PollOutcome::Succeeded { payload, .. } => self.grant(generation, payload),
            PollOutcome::Exhausted { attempts } => self.give_up(generation, AccessError::PaymentTimeout { attempts }),
            PollOutcome::Aborted(PollAbort::Cancelled) => AuthOutcome::Cancelled,
            PollOutcome::Aborted(PollAbort::Failed { status, status_text }) => {
                self.give_up(generation, AccessError::Server { status, status_text })
            }
            PollOutcome::Aborted(PollAbort::Transport(message)) => {
                self.give_up(generation, AccessError::Network(message))
            }
            PollOutcome::Aborted(PollAbort::TaskFailed(message)) => {
                self.give_up(generation, AccessError::Internal(format!("poll task failed: {message}")))
            }
        }
    }

    fn begin_cycle(&self) -> (u64, CancellationToken) {
        let mut cycle = self.lock_cycle();
        cycle.cancel.cancel();
        cycle.generation += 1;
        cycle.cancel = CancellationToken::new();
        debug!("Starting access cycle {}", cycle.generation);
        (cycle.generation, cycle.cancel.clone())
    }

    /// Store `credential` if `generation` is still the current cycle.
    ///
    /// The write happens under the cycle lock so a superseded cycle can never overwrite the
    /// credential of the cycle that replaced it.
    fn persist(&self, generation: u64, credential: &Credential) -> Result<bool, StoreError> {
        let cycle = self.lock_cycle();
        if cycle.generation != generation || cycle.cancel.is_cancelled() {
            return Ok(false);
        }
        self.store.set(&self.config.credential_key, credential.clone())?;
        Ok(true)
    }

    /// Cancel the current cycle and retire its generation.
    fn retire(&self, cycle: &mut Cycle) {
        cycle.cancel.cancel();
        cycle.generation += 1;
        cycle.cancel = CancellationToken::new();
        if matches!(cycle.state, AuthState::Attempting | AuthState::AwaitingPayment) {
            info!("Access cycle cancelled while {}", cycle.state);
            cycle.state = AuthState::Idle;
            let _ = self.events.send(AuthEvent::StateChanged(AuthState::Idle));
        }
    }

    fn grant(&self, generation: u64, payload: ResourcePayload) -> AuthOutcome {
        if !self.transition(generation, AuthState::Granted) {
            return AuthOutcome::Cancelled;
        }
        info!("Access granted");
        self.emit(generation, AuthEvent::Granted(payload.clone()));
        AuthOutcome::Granted(payload)
    }

    fn give_up(&self, generation: u64, error: AccessError) -> AuthOutcome {
        if !self.transition(generation, AuthState::GaveUp) {
            return AuthOutcome::Cancelled;
        }
        warn!("Access cycle gave up: {error}");
        self.emit(generation, AuthEvent::GaveUp { kind: error.kind(), message: error.to_string() });
        AuthOutcome::GaveUp(error)
    }

    /// Move to `state` if `generation` is still the current cycle.
    fn transition(&self, generation: u64, state: AuthState) -> bool {
        let mut cycle = self.lock_cycle();
        if cycle.generation != generation {
            return false;
        }
        debug!("Access state {} -> {}", cycle.state, state);
        cycle.state = state;
        // Sent under the lock so observers see transitions in order.
        let _ = self.events.send(AuthEvent::StateChanged(state));
        true
    }

    fn emit(&self, generation: u64, event: AuthEvent) {
        let cycle = self.lock_cycle();
        if cycle.generation == generation {
            let _ = self.events.send(event);
        }
    }

    fn lock_cycle(&self) -> MutexGuard<'_, Cycle> {
        // The guarded data is always left consistent, so a poisoned lock is still usable.
        self.cycle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Retires its cycle when `request_access` returns or its future is dropped.
struct CycleGuard<'a> {
    orchestrator: &'a AuthOrchestrator,
    generation: u64,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        let mut cycle = self.orchestrator.lock_cycle();
        if cycle.generation == self.generation {
            self.orchestrator.retire(&mut cycle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::PollConfig,
        store::MemoryCredentialStore,
        testing::{challenge, failed, granted, l402_challenge, ScriptedClient},
    };
    use std::time::Duration;
    use tokio::time::sleep;

    const KEY: &str = AuthConfig::DEFAULT_CREDENTIAL_KEY;
    const INTERVAL: Duration = Duration::from_millis(5000);

    struct Harness {
        orchestrator: Arc<AuthOrchestrator>,
        events: mpsc::UnboundedReceiver<AuthEvent>,
        client: Arc<ScriptedClient>,
        store: Arc<MemoryCredentialStore>,
    }

    fn harness(client: ScriptedClient) -> Harness {
        let client = Arc::new(client);
        let store = Arc::new(MemoryCredentialStore::new());
        let config = AuthConfig { poll: PollConfig { max_attempts: 12, interval: INTERVAL }, ..Default::default() };
        let (orchestrator, events) = AuthOrchestrator::new(client.clone(), store.clone(), config);
        Harness { orchestrator: Arc::new(orchestrator), events, client, store }
    }

    fn drain(events: &mut mpsc::UnboundedReceiver<AuthEvent>) -> Vec<AuthEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = events.try_recv() {
            drained.push(event);
        }
        drained
    }

    #[tokio::test(start_paused = true)]
    async fn challenge_persists_credential_and_starts_polling() {
        let mut h = harness(ScriptedClient::new(|index, _| {
            if index == 0 {
                l402_challenge("abc123", "lnbc1...")
            } else {
                challenge(r#"L402 credential="x", payment="y""#)
            }
        }));

        assert!(h.orchestrator.start().await.is_none());
        assert_eq!(h.orchestrator.state(), AuthState::Idle);
        assert_eq!(h.client.call_count(), 0);

        let orchestrator = h.orchestrator.clone();
        let cycle = tokio::spawn(async move { orchestrator.request_access().await });

        assert_eq!(h.events.recv().await, Some(AuthEvent::StateChanged(AuthState::Attempting)));
        assert_eq!(h.events.recv().await, Some(AuthEvent::StateChanged(AuthState::AwaitingPayment)));
        let instruction = h.events.recv().await;
        // The credential is readable as soon as the instruction is surfaced.
        assert_eq!(h.store.get(KEY).expect("get"), Some(Credential::new("abc123")));
        assert_eq!(instruction, Some(AuthEvent::PaymentRequired(PaymentInstruction::new("lnbc1..."))));
        assert_eq!(h.client.calls()[0].credential, None);

        sleep(INTERVAL + Duration::from_millis(1)).await;
        assert_eq!(h.client.calls()[1].credential, Some(Credential::new("abc123")));
        assert_eq!(h.events.recv().await, Some(AuthEvent::PollProgress { attempt: 1, max_attempts: 12 }));

        h.orchestrator.cancel();
        assert!(matches!(cycle.await.expect("join"), AuthOutcome::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_returns_to_idle() {
        let mut h = harness(ScriptedClient::new(|_, _| l402_challenge("abc123", "lnbc1")));

        let orchestrator = h.orchestrator.clone();
        let cycle = tokio::spawn(async move { orchestrator.request_access().await });
        sleep(INTERVAL + Duration::from_millis(1)).await;
        assert_eq!(h.orchestrator.state(), AuthState::AwaitingPayment);

        h.orchestrator.cancel();
        assert_eq!(h.orchestrator.state(), AuthState::Idle);
        assert!(matches!(cycle.await.expect("join"), AuthOutcome::Cancelled));
        assert_eq!(h.client.call_count(), 2);

        let events = drain(&mut h.events);
        assert_eq!(events.last(), Some(&AuthEvent::StateChanged(AuthState::Idle)));

        sleep(INTERVAL * 20).await;
        assert_eq!(h.client.call_count(), 2);
        assert_eq!(h.orchestrator.state(), AuthState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_finishing_keeps_state() {
        let h = harness(ScriptedClient::new(|_, _| granted("ok")));
        assert!(matches!(h.orchestrator.request_access().await, AuthOutcome::Granted(_)));
        h.orchestrator.cancel();
        assert_eq!(h.orchestrator.state(), AuthState::Granted);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_request_stops_polling() {
        let h = harness(ScriptedClient::new(|_, _| l402_challenge("abc123", "lnbc1")));

        let waited = tokio::time::timeout(INTERVAL * 3 / 2, h.orchestrator.request_access()).await;
        assert!(waited.is_err());
        assert_eq!(h.client.call_count(), 2);
        assert_eq!(h.orchestrator.state(), AuthState::Idle);

        sleep(INTERVAL * 20).await;
        assert_eq!(h.client.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_cycle_does_not_persist() {
        let h = harness(ScriptedClient::new(|_, _| granted("ok")));
        let (stale, _) = h.orchestrator.begin_cycle();
        let (current, _) = h.orchestrator.begin_cycle();

        assert!(!h.orchestrator.persist(stale, &Credential::new("stale")).expect("persist"));
        assert_eq!(h.store.get(KEY).expect("get"), None);

        assert!(h.orchestrator.persist(current, &Credential::new("fresh")).expect("persist"));
        assert_eq!(h.store.get(KEY).expect("get"), Some(Credential::new("fresh")));
    }

    #[tokio::test(start_paused = true)]
    async fn crashed_poll_task_is_an_internal_error() {
        let h = harness(ScriptedClient::new(|index, _| {
            if index == 0 { l402_challenge("abc123", "lnbc1") } else { panic!("client blew up") }
        }));

        match h.orchestrator.request_access().await {
            AuthOutcome::GaveUp(error) => {
                assert_eq!(error.kind(), ErrorKind::Internal);
                assert!(error.to_string().starts_with("internal error: poll task failed"), "{error}");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(h.orchestrator.state(), AuthState::GaveUp);
    }

    #[tokio::test(start_paused = true)]
    async fn stored_credential_is_granted_without_polling() {
        let mut h = harness(ScriptedClient::new(|_, credential| {
            if credential.map(Credential::as_str) == Some("abc123") {
                granted(r#"{"message":"hello"}"#)
            } else {
                l402_challenge("new", "lnbc2")
            }
        }));
        h.store.set(KEY, Credential::new("abc123")).expect("set");

        let outcome = h.orchestrator.start().await.expect("attempted");
        match outcome {
            AuthOutcome::Granted(payload) => assert_eq!(payload.display_text(), "hello"),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(h.orchestrator.state(), AuthState::Granted);
        assert_eq!(h.client.call_count(), 1);

        let events = drain(&mut h.events);
        assert!(!events.iter().any(|e| matches!(e, AuthEvent::PaymentRequired(_) | AuthEvent::PollProgress { .. })));
        assert_eq!(events.last(), Some(&AuthEvent::Granted(ResourcePayload::from_body(r#"{"message":"hello"}"#))));

        sleep(INTERVAL * 3).await;
        assert_eq!(h.client.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn granted_on_twelfth_poll() {
        let mut h = harness(ScriptedClient::new(|index, _| {
            if index == 12 { granted(r#"{"message":"hello"}"#) } else { l402_challenge("abc123", "lnbc1") }
        }));

        let outcome = h.orchestrator.request_access().await;
        assert!(matches!(outcome, AuthOutcome::Granted(_)), "{outcome:?}");
        assert_eq!(h.orchestrator.state(), AuthState::Granted);
        // One direct attempt plus twelve polls.
        assert_eq!(h.client.call_count(), 13);

        let progress = drain(&mut h.events).into_iter().filter(|e| matches!(e, AuthEvent::PollProgress { .. })).count();
        assert_eq!(progress, 11);

        sleep(INTERVAL * 3).await;
        assert_eq!(h.client.call_count(), 13);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_when_payment_never_arrives() {
        let mut h = harness(ScriptedClient::new(|_, _| l402_challenge("abc123", "lnbc1")));

        let outcome = h.orchestrator.request_access().await;
        match outcome {
            AuthOutcome::GaveUp(AccessError::PaymentTimeout { attempts }) => assert_eq!(attempts, 12),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(h.orchestrator.state(), AuthState::GaveUp);
        assert_eq!(h.client.call_count(), 13);

        let events = drain(&mut h.events);
        match events.last() {
            Some(AuthEvent::GaveUp { kind, message }) => {
                assert_eq!(*kind, ErrorKind::PaymentTimeout);
                assert!(message.contains("payment not confirmed in time"), "{message}");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_challenge_writes_nothing() {
        let mut h = harness(ScriptedClient::new(|_, _| challenge(r#"L402 credential="abc123""#)));

        let outcome = h.orchestrator.request_access().await;
        assert!(matches!(outcome, AuthOutcome::GaveUp(AccessError::MalformedChallenge(_))), "{outcome:?}");
        assert_eq!(h.orchestrator.state(), AuthState::GaveUp);
        assert_eq!(h.store.get(KEY).expect("get"), None);
        assert_eq!(h.client.call_count(), 1);
        assert!(!drain(&mut h.events).iter().any(|e| matches!(e, AuthEvent::PaymentRequired(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_challenge_header() {
        let h = harness(ScriptedClient::new(|_, _| {
            let AccessOutcome::ChallengeIssued(mut response) = challenge("L402 x") else { unreachable!() };
            response.headers.clear();
            AccessOutcome::ChallengeIssued(response)
        }));

        let outcome = h.orchestrator.request_access().await;
        assert!(matches!(outcome, AuthOutcome::GaveUp(AccessError::MissingChallenge)), "{outcome:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn server_and_network_errors_give_up() {
        let h = harness(ScriptedClient::new(|_, _| failed(503, "Service Unavailable")));
        match h.orchestrator.request_access().await {
            AuthOutcome::GaveUp(error) => assert_eq!(error.to_string(), "server error 503 Service Unavailable"),
            other => panic!("unexpected outcome {other:?}"),
        }

        let h = harness(ScriptedClient::new(|_, _| AccessOutcome::TransportError("connection refused".into())));
        let outcome = h.orchestrator.request_access().await;
        assert!(matches!(outcome, AuthOutcome::GaveUp(AccessError::Network(_))), "{outcome:?}");
        assert_eq!(h.orchestrator.state(), AuthState::GaveUp);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_server_error_gives_up() {
        let h = harness(ScriptedClient::new(|index, _| {
            if index == 3 { failed(500, "Internal Server Error") } else { l402_challenge("abc123", "lnbc1") }
        }));
        let outcome = h.orchestrator.request_access().await;
        assert!(matches!(outcome, AuthOutcome::GaveUp(AccessError::Server { status: 500, .. })), "{outcome:?}");
        assert_eq!(h.client.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_giving_up_is_allowed() {
        let h = harness(ScriptedClient::new(|index, _| {
            if index == 0 { AccessOutcome::TransportError("timeout".into()) } else { granted("ok") }
        }));
        assert!(matches!(h.orchestrator.request_access().await, AuthOutcome::GaveUp(_)));
        assert!(matches!(h.orchestrator.request_access().await, AuthOutcome::Granted(_)));
        assert_eq!(h.orchestrator.state(), AuthState::Granted);
    }

    #[tokio::test(start_paused = true)]
    async fn new_request_supersedes_running_poll() {
        // The first cycle and its two polls see "first"; the restarted cycle is challenged with
        // "second", which is already paid.
        let h = harness(ScriptedClient::new(|index, credential| match (index, credential.map(Credential::as_str)) {
            (0..=2, _) => l402_challenge("first", "lnbc-first"),
            (3, _) => l402_challenge("second", "lnbc-second"),
            (_, Some("second")) => granted("paid"),
            _ => l402_challenge("first", "lnbc-first"),
        }));

        let orchestrator = h.orchestrator.clone();
        let first = tokio::spawn(async move { orchestrator.request_access().await });
        sleep(INTERVAL * 2 + Duration::from_millis(1)).await;
        assert_eq!(h.orchestrator.state(), AuthState::AwaitingPayment);
        let calls_before = h.client.call_count();
        assert_eq!(calls_before, 3);

        let outcome = h.orchestrator.request_access().await;
        assert!(matches!(outcome, AuthOutcome::Granted(_)), "{outcome:?}");
        assert!(matches!(first.await.expect("join"), AuthOutcome::Cancelled));
        assert_eq!(h.orchestrator.state(), AuthState::Granted);

        // No tick of the first poll ran after the new cycle started.
        let stale = h.client.calls()[calls_before..]
            .iter()
            .filter(|call| call.credential == Some(Credential::new("first")))
            .count();
        assert_eq!(stale, 1, "only the second cycle's direct attempt may carry the old credential");

        sleep(INTERVAL * 5).await;
        let total = h.client.call_count();
        sleep(INTERVAL * 5).await;
        assert_eq!(h.client.call_count(), total);
    }
}
