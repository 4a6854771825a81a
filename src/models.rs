use chrono::{DateTime, Utc};
use reqwest::{header::HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display},
    time::Duration,
};

/// An opaque authorization token issued by the resource server in a challenge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token, exactly as the server issued it.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque payment request (e.g. a lightning invoice) that must be settled out of band.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentInstruction(String);

impl PaymentInstruction {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PaymentInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A parsed payment challenge.
///
/// The instruction is only meaningful together with the credential it was issued with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Challenge {
    /// The credential to present once the payment settles.
    pub credential: Credential,

    /// The payment that unlocks the credential.
    pub instruction: PaymentInstruction,
}

/// The body of a granted resource request.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourcePayload {
    /// The raw response body.
    pub body: String,

    /// The `message` field of the body, when it is a JSON object carrying one.
    pub message: Option<String>,
}

impl ResourcePayload {
    pub fn from_body(body: impl Into<String>) -> Self {
        let body = body.into();
        let message = serde_json::from_str::<MessageBody>(&body).ok().map(|b| b.message);
        Self { body, message }
    }

    /// The text to show for this payload: the `message` field if any, the raw body otherwise.
    pub fn display_text(&self) -> &str {
        self.message.as_deref().unwrap_or(&self.body)
    }
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

/// The raw "payment required" response a challenge is parsed from.
#[derive(Clone, Debug)]
pub struct ChallengeResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// How a single access attempt turned out.
#[derive(Clone, Debug)]
pub enum AccessOutcome {
    /// The server returned a success status.
    Granted(ResourcePayload),

    /// The server returned `402 Payment Required`.
    ChallengeIssued(ChallengeResponse),

    /// The server returned any other status.
    Failed { status: u16, status_text: String },

    /// The request never produced a response.
    TransportError(String),
}

impl AccessOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Granted(_) => OutcomeKind::Granted,
            Self::ChallengeIssued(_) => OutcomeKind::ChallengeIssued,
            Self::Failed { .. } => OutcomeKind::Failed,
            Self::TransportError(_) => OutcomeKind::TransportError,
        }
    }
}

/// The classification of an [`AccessOutcome`], without its data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeKind {
    Granted,
    ChallengeIssued,
    Failed,
    TransportError,
}

/// A single request/response cycle against the protected resource.
#[derive(Clone, Debug)]
pub struct AccessAttempt {
    /// Whether an `Authorization` header was sent.
    pub credential_attached: bool,

    /// The classified response.
    pub outcome: AccessOutcome,

    /// When the request was issued.
    pub attempted_at: DateTime<Utc>,
}

impl AccessAttempt {
    pub fn new(credential_attached: bool, outcome: AccessOutcome) -> Self {
        Self { credential_attached, outcome, attempted_at: Utc::now() }
    }
}

/// The shape of the challenge header and the matching authorization scheme.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChallengeFormat {
    /// The authentication scheme, used both in `WWW-Authenticate` and `Authorization`.
    pub scheme: String,

    /// The name of the first challenge field, carrying the credential.
    pub credential_field: String,

    /// The name of the second challenge field, carrying the payment instruction.
    pub payment_field: String,
}

impl ChallengeFormat {
    /// `L402 credential="...", payment="..."`.
    pub fn l402() -> Self {
        Self { scheme: "L402".into(), credential_field: "credential".into(), payment_field: "payment".into() }
    }

    /// `LSAT macaroon="...", invoice="..."`.
    pub fn lsat() -> Self {
        Self { scheme: "LSAT".into(), credential_field: "macaroon".into(), payment_field: "invoice".into() }
    }
}

impl Default for ChallengeFormat {
    fn default() -> Self {
        Self::l402()
    }
}

/// Polling cadence while waiting for a payment to settle.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// The number of attempts before giving up.
    pub max_attempts: u32,

    /// The delay before each attempt.
    #[serde(with = "millis")]
    pub interval: Duration,
}

impl PollConfig {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 12;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { max_attempts: Self::DEFAULT_MAX_ATTEMPTS, interval: Self::DEFAULT_INTERVAL }
    }
}

/// Orchestrator configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// The key the credential is stored under.
    pub credential_key: String,

    /// The challenge header format.
    pub challenge: ChallengeFormat,

    /// Polling cadence.
    pub poll: PollConfig,
}

impl AuthConfig {
    pub const DEFAULT_CREDENTIAL_KEY: &'static str = "l402_credential";
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credential_key: Self::DEFAULT_CREDENTIAL_KEY.into(),
            challenge: ChallengeFormat::default(),
            poll: PollConfig::default(),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
