//! Error types for notary-client.

use thiserror::Error;

/// Error parsing or verifying a key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseKeyError {
    #[error("invalid key format: expected 'ed25519:...'")]
    InvalidFormat,

    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Error during signing or verifying with a Nym's key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("wrong passphrase")]
    WrongPassphrase,

    #[error("master key is suspended, cannot sign")]
    MasterKeySuspended,
}

/// Error during wallet/key-store operations.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid credential format: {0}")]
    InvalidFormat(String),
}

/// The error taxonomy from spec §7. Every user-visible failure classifies
/// into exactly one of these; `Internal` is fatal and must never be
/// recovered from in normal operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("insufficient transaction numbers: need {needed}, have {available}")]
    InsufficientNumbers { needed: usize, available: usize },

    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: i64, required: i64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("instrument expired at {valid_to}, now {now}")]
    Expired { valid_to: i64, now: i64 },

    #[error("instrument not yet valid until {valid_from}, now {now}")]
    NotYetValid { valid_from: i64, now: i64 },

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Network/transport-layer failure. Per §7 propagation policy, this
    /// must NOT harvest numbers — reconciliation classifies later.
    #[error("network error: {message}")]
    Network { message: String, retryable: bool },

    /// The server returned an explicit failure reply (message- or
    /// transaction-level). Per §7, reconciliation harvests only auxiliary
    /// numbers in this case, never the primary one.
    #[error("server reported failure: {0}")]
    ReplyFailure(String),

    #[error(transparent)]
    ParseKey(#[from] ParseKeyError),

    #[error(transparent)]
    Signing(#[from] SignerError),

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invariant violation. Implementations must abort rather than attempt
    /// recovery (§7).
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl Error {
    /// The CLI exit-code taxonomy (§6: "non-zero for each distinct error
    /// kind").
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidInput(_) => 1,
            Error::NotFound(_) => 2,
            Error::Unauthorized(_) => 3,
            Error::InsufficientNumbers { .. } => 4,
            Error::InsufficientFunds { .. } => 5,
            Error::Conflict(_) => 6,
            Error::Expired { .. } => 7,
            Error::NotYetValid { .. } => 8,
            Error::AlreadyExists(_) => 9,
            Error::Network { .. } => 10,
            Error::ReplyFailure(_) => 11,
            Error::ParseKey(_) => 12,
            Error::Signing(_) => 13,
            Error::KeyStore(_) => 14,
            Error::Config(_) => 15,
            Error::Json(_) => 16,
            Error::Internal(_) => 99,
        }
    }

    /// Whether reconciliation is allowed to harvest numbers for a failure
    /// of this kind (§7: network errors must not harvest; only reply
    /// failures and successful receipts do, and only per §4.4/§4.5's
    /// conservative rules).
    pub fn permits_harvest(&self) -> bool {
        !matches!(self, Error::Network { .. })
    }
}
