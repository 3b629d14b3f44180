//! The raw transport seam.
//!
//! The realtime channel itself (Socket.IO-style, WebSocket, whatever) lives
//! outside this workspace. What the socket task needs from it is just a pair
//! of string-payload channels: one carrying emits to the server, one
//! carrying pushes from it. Any real connector is plugged in by handing its
//! ends to [`spawn_socket`](crate::socket::spawn_socket).

use tokio::sync::mpsc;

use flock_shared::constants::SOCKET_CHANNEL_CAPACITY;

/// The client side of a realtime connection.
pub struct Transport {
    /// JSON payloads emitted to the server.
    pub outgoing: mpsc::Sender<String>,
    /// JSON payloads pushed by the server. The channel closing means the
    /// connection dropped.
    pub incoming: mpsc::Receiver<String>,
}

/// The far end of a [`loopback`] pair, playing the server in tests.
pub struct LoopbackServer {
    /// Payloads the client emitted.
    pub sent: mpsc::Receiver<String>,
    /// Push a payload to the client.
    pub push: mpsc::Sender<String>,
}

/// Build an in-process transport pair: the client half and a server half
/// that observes emits and injects pushes.
pub fn loopback() -> (Transport, LoopbackServer) {
    let (out_tx, out_rx) = mpsc::channel(SOCKET_CHANNEL_CAPACITY);
    let (in_tx, in_rx) = mpsc::channel(SOCKET_CHANNEL_CAPACITY);

    (
        Transport {
            outgoing: out_tx,
            incoming: in_rx,
        },
        LoopbackServer {
            sent: out_rx,
            push: in_tx,
        },
    )
}
