//! The socket-to-engine bridge.
//!
//! Receives validated socket notifications, applies them to the shared
//! [`SyncEngine`], and forwards the resulting [`UiEvent`]s. Also runs the
//! one-second sweep that force-clears stale remote typing indicators, and
//! performs the IO side of an engine-initiated force-stop of location
//! sharing (releasing room retention and emitting the stop event).

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{info, warn};

use flock_net::{SocketCommand, SocketNotification};
use flock_shared::protocol::ClientEvent;
use flock_sync::{Notification, SyncEngine};

use crate::events::UiEvent;

const TYPING_SWEEP_INTERVAL_MS: u64 = 1000;

/// Spawn the bridge loop.
pub fn spawn_bridge(
    engine: Arc<Mutex<SyncEngine>>,
    socket_tx: mpsc::Sender<SocketCommand>,
    mut notif_rx: mpsc::Receiver<SocketNotification>,
    ui_tx: mpsc::Sender<UiEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sweep = tokio::time::interval(Duration::from_millis(TYPING_SWEEP_INTERVAL_MS));
        info!("socket bridge started");

        loop {
            tokio::select! {
                notification = notif_rx.recv() => {
                    match notification {
                        Some(SocketNotification::Event(event)) => {
                            let notifications = {
                                let mut engine = match engine.lock() {
                                    Ok(engine) => engine,
                                    Err(_) => {
                                        warn!("engine lock poisoned, bridge ending");
                                        break;
                                    }
                                };
                                engine.apply(&event, Utc::now())
                            };
                            if forward(&engine, &socket_tx, &ui_tx, notifications).await.is_err() {
                                break;
                            }
                        }
                        Some(SocketNotification::Disconnected) | None => {
                            let _ = ui_tx.send(UiEvent::Disconnected).await;
                            break;
                        }
                    }
                }

                _ = sweep.tick() => {
                    let cleared = {
                        let mut engine = match engine.lock() {
                            Ok(engine) => engine,
                            Err(_) => break,
                        };
                        engine.poll_remote_typing(Utc::now())
                    };
                    if forward(&engine, &socket_tx, &ui_tx, cleared).await.is_err() {
                        break;
                    }
                }
            }
        }

        info!("socket bridge terminated");
    })
}

/// Forward engine notifications to the UI, handling the ones that need
/// socket side effects on the way through.
async fn forward(
    engine: &Arc<Mutex<SyncEngine>>,
    socket_tx: &mpsc::Sender<SocketCommand>,
    ui_tx: &mpsc::Sender<UiEvent>,
    notifications: Vec<Notification>,
) -> Result<(), ()> {
    for notification in notifications {
        if let Notification::SharingForceStopped { conversation } = &notification {
            let user_id = match engine.lock() {
                Ok(engine) => engine.local_user(),
                Err(_) => return Err(()),
            };
            let _ = socket_tx
                .send(SocketCommand::SetRetained(*conversation, false))
                .await;
            let _ = socket_tx
                .send(SocketCommand::Emit(ClientEvent::StopSharingLocation {
                    conversation: *conversation,
                    user_id,
                }))
                .await;
        }

        if ui_tx.send(UiEvent::Sync(notification)).await.is_err() {
            return Err(());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use flock_net::{loopback, spawn_socket};
    use flock_shared::protocol::ServerEvent;
    use flock_shared::types::{ConversationId, FlockId, FlockStatus, UserId};

    use super::*;

    const CONV: ConversationId = ConversationId::Flock(FlockId(3));

    fn setup() -> (
        Arc<Mutex<SyncEngine>>,
        flock_net::LoopbackServer,
        mpsc::Receiver<UiEvent>,
    ) {
        let (transport, server) = loopback();
        let (cmd_tx, notif_rx) = spawn_socket(transport);
        let engine = Arc::new(Mutex::new(SyncEngine::new(UserId(1), "You")));
        let (ui_tx, ui_rx) = mpsc::channel(64);
        spawn_bridge(engine.clone(), cmd_tx, notif_rx, ui_tx);
        (engine, server, ui_rx)
    }

    #[tokio::test]
    async fn inbound_message_reaches_the_engine_and_the_ui() {
        let (engine, server, mut ui_rx) = setup();

        let event = ServerEvent::UserTyping {
            conversation: CONV,
            user_id: UserId(2),
            user_name: "Ada".into(),
        };
        server
            .push
            .send(serde_json::to_string(&event).unwrap())
            .await
            .unwrap();

        let ui_event = ui_rx.recv().await.unwrap();
        assert_eq!(
            ui_event,
            UiEvent::Sync(Notification::TypingChanged {
                conversation: CONV,
                typing_user: Some("Ada".into()),
            })
        );
        assert_eq!(engine.lock().unwrap().typing_user(CONV), Some("Ada"));
    }

    #[tokio::test]
    async fn force_stop_emits_stop_sharing_on_the_wire() {
        let (engine, mut server, mut ui_rx) = setup();
        {
            let mut engine = engine.lock().unwrap();
            engine.update_local_fix(51.5, -0.1);
            engine.start_sharing(CONV, Utc::now()).unwrap();
        }

        let event = ServerEvent::FlockStatusChanged {
            flock_id: FlockId(3),
            status: FlockStatus::Cancelled,
        };
        server
            .push
            .send(serde_json::to_string(&event).unwrap())
            .await
            .unwrap();

        assert_eq!(
            ui_rx.recv().await.unwrap(),
            UiEvent::Sync(Notification::SharingForceStopped { conversation: CONV })
        );

        let emitted = server.sent.recv().await.unwrap();
        assert!(emitted.contains("\"stop_sharing_location\""), "{emitted}");
        assert!(!engine.lock().unwrap().is_sharing(CONV));
    }

    #[tokio::test]
    async fn disconnect_surfaces_to_the_ui() {
        let (_engine, server, mut ui_rx) = setup();
        drop(server.push);
        assert_eq!(ui_rx.recv().await.unwrap(), UiEvent::Disconnected);
    }
}
