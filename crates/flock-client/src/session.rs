use flock_shared::types::UserId;

/// The authenticated user this client acts as.
///
/// Authentication itself happens elsewhere; the engine only needs the id
/// (for echo matching and unread accounting) and the display name (stamped
/// on outgoing messages, votes, and location broadcasts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub display_name: String,
}

impl Session {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }
}
