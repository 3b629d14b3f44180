//! Socket task with tokio mpsc command/notification pattern.
//!
//! The socket loop runs in a dedicated tokio task. External code talks to it
//! through typed channels: [`SocketCommand`]s go in, [`SocketNotification`]s
//! come out. Payloads are validated into [`ServerEvent`]s at this boundary;
//! anything malformed is logged and dropped, never handed to the engine.
//!
//! Emits are fire-and-forget: a failed emit is logged and forgotten, the
//! optimistic local state is never rolled back.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use flock_shared::constants::SOCKET_CHANNEL_CAPACITY;
use flock_shared::protocol::{ClientEvent, ServerEvent};
use flock_shared::types::ConversationId;

use crate::rooms::RoomTracker;
use crate::transport::Transport;

/// Commands sent *into* the socket task.
#[derive(Debug)]
pub enum SocketCommand {
    /// Emit an event to the server.
    Emit(ClientEvent),
    /// Join a conversation room.
    JoinRoom(ConversationId),
    /// Leave a conversation room (no-op while the room is retained).
    LeaveRoom(ConversationId),
    /// Mark/unmark a room as retained while location sharing is active.
    SetRetained(ConversationId, bool),
    /// Request a snapshot of current room memberships.
    GetRooms(oneshot::Sender<Vec<ConversationId>>),
    /// Gracefully shut down the socket task.
    Shutdown,
}

/// Notifications sent *from* the socket task to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketNotification {
    /// A validated server event.
    Event(ServerEvent),
    /// The transport closed from the far side.
    Disconnected,
}

/// Spawn the socket loop over the given transport.
///
/// Returns `(command_tx, notification_rx)`.
pub fn spawn_socket(
    mut transport: Transport,
) -> (
    mpsc::Sender<SocketCommand>,
    mpsc::Receiver<SocketNotification>,
) {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<SocketCommand>(SOCKET_CHANNEL_CAPACITY);
    let (notif_tx, notif_rx) = mpsc::channel::<SocketNotification>(SOCKET_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut rooms = RoomTracker::new();

        loop {
            tokio::select! {
                // --- Incoming commands ---
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(SocketCommand::Emit(event)) => {
                            emit(&mut transport, &event).await;
                        }
                        Some(SocketCommand::JoinRoom(conversation)) => {
                            if rooms.join(conversation) {
                                emit(&mut transport, &ClientEvent::JoinRoom { conversation }).await;
                            }
                        }
                        Some(SocketCommand::LeaveRoom(conversation)) => {
                            if rooms.leave(conversation) {
                                emit(&mut transport, &ClientEvent::LeaveRoom { conversation }).await;
                            }
                        }
                        Some(SocketCommand::SetRetained(conversation, retained)) => {
                            rooms.set_retained(conversation, retained);
                        }
                        Some(SocketCommand::GetRooms(reply)) => {
                            let _ = reply.send(rooms.joined_rooms());
                        }
                        Some(SocketCommand::Shutdown) => {
                            info!("socket shutdown requested");
                            break;
                        }
                        None => {
                            info!("command channel closed, shutting down socket");
                            break;
                        }
                    }
                }

                // --- Inbound payloads ---
                payload = transport.incoming.recv() => {
                    match payload {
                        Some(payload) => {
                            match ServerEvent::from_json(&payload) {
                                Ok(event) => {
                                    debug!(event = ?event.conversation(), "server event received");
                                    if notif_tx.send(SocketNotification::Event(event)).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => {
                                    warn!(error = %e, len = payload.len(), "malformed server payload dropped");
                                }
                            }
                        }
                        None => {
                            info!("transport closed by server");
                            let _ = notif_tx.send(SocketNotification::Disconnected).await;
                            break;
                        }
                    }
                }
            }
        }

        info!("socket loop terminated");
    });

    (cmd_tx, notif_rx)
}

/// Serialize and send one event. Failures are logged and swallowed.
async fn emit(transport: &mut Transport, event: &ClientEvent) {
    match event.to_json() {
        Ok(json) => {
            if transport.outgoing.send(json).await.is_err() {
                warn!("emit failed, transport closed");
            }
        }
        Err(e) => warn!(error = %e, "failed to serialize client event"),
    }
}
