//! # flock-shared
//!
//! Types shared across the Flock client workspace: conversation and user
//! identifiers, the socket wire protocol, timing constants, and error types.

pub mod constants;
pub mod protocol;
pub mod types;

mod error;

pub use error::FlockError;
