// Socket transport adapter: typed commands in, typed events out.

pub mod rooms;
pub mod socket;
pub mod transport;

pub use rooms::RoomTracker;
pub use socket::{spawn_socket, SocketCommand, SocketNotification};
pub use transport::{loopback, LoopbackServer, Transport};
