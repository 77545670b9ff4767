//! Error types for ringline.

/// Top-level error type for the service.
///
/// Configuration problems (missing or unparseable list files, unset env
/// vars) are absorbed where they are detected rather than represented here:
/// a degraded list means a degraded routing outcome, never a failed leg.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Notify error: {0}")]
    Notify(#[from] NotifyError),
}

/// Session store errors.
///
/// A conditional-write conflict is deliberately not an error: it is an
/// expected outcome under concurrent legs, reported through
/// [`crate::store::WriteOutcome`] instead.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Session row missing after create: {session}")]
    MissingSession { session: String },
}

/// Voicemail notification errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build notification message: {0}")]
    Build(String),

    #[error("SMTP send failed: {0}")]
    Send(String),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
