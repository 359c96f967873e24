use thiserror::Error;

/// Error taxonomy surfaced by the booking services.
///
/// Expected outcomes (capacity reached, bad credentials, unknown ids) are
/// variants returned to the caller, never panics. `InvalidCredentials` and
/// `InvalidToken` are deliberately undifferentiated so that login and token
/// checks leak nothing about which part failed.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("invalid range: start is after end")]
    InvalidRange,

    #[error("event not found")]
    EventNotFound,

    #[error("user not found")]
    UnknownUser,

    #[error("username or email already taken")]
    DuplicateUser,

    #[error("event is at capacity")]
    CapacityExceeded,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
