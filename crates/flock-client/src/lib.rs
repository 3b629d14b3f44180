//! # flock-client
//!
//! Client wiring for the Flock realtime engine: the bridge loop that feeds
//! socket events into [`flock_sync::SyncEngine`], the typing-debounce and
//! location-broadcast timer tasks, the REST backup-persistence client, and
//! configuration.

pub mod api;
pub mod bridge;
pub mod client;
pub mod config;
pub mod events;
pub mod session;
pub mod sharing;
pub mod typing_task;

pub use api::{ApiClient, ApiError};
pub use client::FlockClient;
pub use config::ClientConfig;
pub use events::{UiEvent, TOAST_DISMISS};
pub use session::Session;

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise tracing for binaries and examples embedding this crate.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("flock_client=debug,flock_sync=debug,flock_net=debug,flock_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
