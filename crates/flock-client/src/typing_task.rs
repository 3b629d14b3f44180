//! Local typing debounce task.
//!
//! One task per conversation, fed keystroke/send inputs over a channel. It
//! emits `start_typing` on the idle edge, `stop_typing` when the 2000 ms
//! debounce expires with no further input, and `stop_typing` immediately
//! (cancelling the pending timeout) when the user sends.

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::debug;

use flock_net::SocketCommand;
use flock_shared::constants::TYPING_DEBOUNCE_MS;
use flock_shared::protocol::ClientEvent;
use flock_shared::types::{ConversationId, UserId};

/// Inputs to the typing task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingInput {
    /// The composer text changed.
    Keystroke,
    /// The user sent the message.
    Send,
}

/// Spawn the typing task for one conversation. Dropping the returned sender
/// stops the task (emitting a final stop if one was pending).
pub fn spawn_typing_task(
    conversation: ConversationId,
    user_id: UserId,
    user_name: String,
    socket_tx: mpsc::Sender<SocketCommand>,
) -> mpsc::Sender<TypingInput> {
    let (input_tx, mut input_rx) = mpsc::channel::<TypingInput>(32);

    tokio::spawn(async move {
        let debounce = Duration::from_millis(TYPING_DEBOUNCE_MS);
        let mut deadline: Option<Instant> = None;

        loop {
            let input = match deadline {
                Some(at) => {
                    tokio::select! {
                        _ = sleep_until(at) => {
                            debug!(%conversation, "typing debounce expired");
                            emit_stop(&socket_tx, conversation, user_id).await;
                            deadline = None;
                            continue;
                        }
                        input = input_rx.recv() => input,
                    }
                }
                None => input_rx.recv().await,
            };

            match input {
                Some(TypingInput::Keystroke) => {
                    if deadline.is_none() {
                        let event = ClientEvent::StartTyping {
                            conversation,
                            user_id,
                            user_name: user_name.clone(),
                        };
                        let _ = socket_tx.send(SocketCommand::Emit(event)).await;
                    }
                    deadline = Some(Instant::now() + debounce);
                }
                Some(TypingInput::Send) => {
                    if deadline.take().is_some() {
                        emit_stop(&socket_tx, conversation, user_id).await;
                    }
                }
                None => {
                    if deadline.take().is_some() {
                        emit_stop(&socket_tx, conversation, user_id).await;
                    }
                    break;
                }
            }
        }
    });

    input_tx
}

async fn emit_stop(
    socket_tx: &mpsc::Sender<SocketCommand>,
    conversation: ConversationId,
    user_id: UserId,
) {
    let event = ClientEvent::StopTyping {
        conversation,
        user_id,
    };
    let _ = socket_tx.send(SocketCommand::Emit(event)).await;
}
