use std::time::Duration;

use flock_shared::constants::TOAST_DISMISS_MS;
use flock_sync::Notification;

/// How long the UI keeps a [`UiEvent::Toast`] on screen before dismissing it.
pub const TOAST_DISMISS: Duration = Duration::from_millis(TOAST_DISMISS_MS);

/// Events surfaced to the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Engine state changed; re-render the affected screen.
    Sync(Notification),
    /// The realtime connection dropped.
    Disconnected,
    /// Transient toast text, auto-dismissed after [`TOAST_DISMISS`].
    Toast(String),
}
