use thiserror::Error;

/// Errors produced by the sync engine.
///
/// These are validation failures caught before anything reaches the network;
/// inbound events never error, they are reconciled or dropped.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SyncError {
    /// An outgoing message had no text content.
    #[error("Message text is empty")]
    EmptyMessage,

    /// An outgoing message exceeded the maximum length.
    #[error("Message text exceeds {0} characters")]
    MessageTooLong(usize),

    /// Location sharing was requested without a known local position.
    #[error("No known position to share")]
    NoKnownPosition,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;
