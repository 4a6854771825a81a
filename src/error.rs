use std::fmt::{self, Display};

/// An error when extracting a challenge from a "payment required" response.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChallengeError {
    /// The response carried no challenge header at all.
    #[error("challenge header missing")]
    Missing,

    /// A challenge header was present but did not match the expected format.
    #[error("challenge header malformed: {0}")]
    Malformed(String),
}

/// An error when reading or writing a stored credential.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The stored data could not be (de)serialized.
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),

    /// The store's internal lock was poisoned.
    #[error("store lock poisoned")]
    Poisoned,
}

/// The reason an access cycle ended without granting the resource.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// The server asked for payment without saying how.
    #[error("payment challenge header missing from server response")]
    MissingChallenge,

    /// The server's payment challenge could not be understood.
    #[error("payment challenge header malformed: {0}")]
    MalformedChallenge(String),

    /// The server reported an error.
    #[error("server error {status} {status_text}")]
    Server { status: u16, status_text: String },

    /// The server could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The payment was not detected within the polling budget.
    #[error("payment not confirmed in time after {attempts} attempts")]
    PaymentTimeout { attempts: u32 },

    /// The credential from a valid challenge could not be persisted.
    #[error("storing credential: {0}")]
    Store(#[from] StoreError),

    /// A failure inside the client itself, such as a crashed poll task.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AccessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingChallenge => ErrorKind::MissingChallenge,
            Self::MalformedChallenge(_) => ErrorKind::MalformedChallenge,
            Self::Server { .. } => ErrorKind::Server,
            Self::Network(_) => ErrorKind::Network,
            Self::PaymentTimeout { .. } => ErrorKind::PaymentTimeout,
            Self::Store(_) => ErrorKind::Store,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<ChallengeError> for AccessError {
    fn from(e: ChallengeError) -> Self {
        match e {
            ChallengeError::Missing => Self::MissingChallenge,
            ChallengeError::Malformed(reason) => Self::MalformedChallenge(reason),
        }
    }
}

/// A stable code for each [`AccessError`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingChallenge,
    MalformedChallenge,
    Server,
    Network,
    PaymentTimeout,
    Store,
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingChallenge => "missing_challenge",
            Self::MalformedChallenge => "malformed_challenge",
            Self::Server => "server_error",
            Self::Network => "network_error",
            Self::PaymentTimeout => "payment_timeout",
            Self::Store => "store_error",
            Self::Internal => "internal_error",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
