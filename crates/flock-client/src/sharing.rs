//! Periodic location broadcast task.
//!
//! While sharing is active for a conversation, one of these tasks emits the
//! local position every 10 seconds. The task stops itself as soon as the
//! engine reports sharing inactive (explicit stop, or the flock left
//! `confirmed`), so an abort is a fast-path, not a correctness requirement.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::debug;

use flock_net::SocketCommand;
use flock_shared::constants::LOCATION_BROADCAST_SECS;
use flock_shared::types::ConversationId;
use flock_sync::SyncEngine;

/// Spawn the broadcast loop for one conversation. The immediate first emit
/// has already been sent by the caller; this task covers the repeats.
pub fn spawn_sharing_task(
    conversation: ConversationId,
    engine: Arc<Mutex<SyncEngine>>,
    socket_tx: mpsc::Sender<SocketCommand>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(LOCATION_BROADCAST_SECS)).await;

            let beat = {
                let engine = match engine.lock() {
                    Ok(engine) => engine,
                    Err(_) => break,
                };
                engine.location_beat(conversation, Utc::now())
            };

            match beat {
                Some(event) => {
                    if socket_tx.send(SocketCommand::Emit(event)).await.is_err() {
                        break;
                    }
                }
                None => {
                    debug!(%conversation, "sharing no longer active, broadcast task ending");
                    break;
                }
            }
        }
    })
}
