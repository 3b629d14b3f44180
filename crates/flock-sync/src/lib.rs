//! # flock-sync
//!
//! The realtime sync engine: per-conversation message lists reconciled
//! between optimistic local writes and server-confirmed socket events, plus
//! reaction/vote aggregation, live location caches, and typing state.
//!
//! Everything in this crate is pure in-memory state. Time is passed in
//! explicitly wherever a decision depends on it, so the whole engine is
//! deterministic under test. IO (sockets, timers, HTTP) lives in
//! `flock-net` and `flock-client`.

pub mod conversation;
pub mod engine;
pub mod location;
pub mod model;
pub mod reactions;
pub mod typing;
pub mod votes;

mod error;

pub use conversation::{ConversationStore, Reconciliation};
pub use engine::{Draft, Notification, SyncEngine};
pub use error::SyncError;
pub use location::LocationMap;
pub use model::{ConversationPreview, Message, ReactionEntry};
pub use typing::{LocalTyping, RemoteTyping, TypingSignal};
pub use votes::VoteBoard;
