use thiserror::Error;

/// The shared error taxonomy surfaced by the facade.
///
/// Backend-specific failures are re-wrapped into these cases at the facade
/// boundary; calling code never branches on backend identity.
#[derive(Debug, Error)]
pub enum PhraseError {
    /// An all-empty translation map was submitted where content is required.
    #[error("translations must contain at least one non-empty locale")]
    InvalidPayload,

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("create failed: {0}")]
    Create(String),

    #[error("update failed: {0}")]
    Update(String),

    #[error("delete failed: {0}")]
    Delete(String),

    /// The remote account is unavailable to the current user. Kept distinct
    /// from generic fetch failure so callers can show a specific message.
    #[error("remote account is unavailable to the current user")]
    AccountUnavailable,
}
