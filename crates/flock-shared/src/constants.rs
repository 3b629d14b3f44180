/// Prefix for client-generated placeholder message ids.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Local typing debounce: stop_typing is emitted this long after the last
/// keystroke if no further input arrives.
pub const TYPING_DEBOUNCE_MS: u64 = 2000;

/// Receiver-side safety net: a remote typing indicator is force-cleared this
/// long after its last refresh, in case the stop event is lost.
pub const REMOTE_TYPING_TIMEOUT_MS: u64 = 5000;

/// Interval between live location broadcasts while sharing is active.
pub const LOCATION_BROADCAST_SECS: u64 = 10;

/// Venue search results are served from the local cache for this long.
pub const SEARCH_CACHE_TTL_SECS: i64 = 300;

/// Toast notifications auto-dismiss after this long.
pub const TOAST_DISMISS_MS: u64 = 2000;

/// Capacity of the socket command and event channels.
pub const SOCKET_CHANNEL_CAPACITY: usize = 256;

/// Maximum accepted message text length (code points).
pub const MAX_MESSAGE_LEN: usize = 4096;
