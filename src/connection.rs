//! Registered connection
//!
//! Identity metadata plus the write handle for one accepted socket.

use std::net::SocketAddr;

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::{ClientId, DisplayName};

/// A live connection that has completed the handshake
///
/// The socket's write half is owned by a dedicated writer task; `sender`
/// feeds that task, so every write to the socket goes through one place.
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ClientId,
    /// Name fixed during the handshake
    pub name: DisplayName,
    /// Remote address
    pub peer_addr: SocketAddr,
    /// Server → writer task queue
    sender: mpsc::Sender<ServerMessage>,
}

impl Connection {
    pub fn new(
        id: ClientId,
        name: DisplayName,
        peer_addr: SocketAddr,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            id,
            name,
            peer_addr,
            sender,
        }
    }

    /// Queue a message for this connection without waiting
    ///
    /// Fails if the writer's queue is full or the writer has exited.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_connection(capacity: usize) -> (Connection, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        let conn = Connection::new(
            ClientId::next(),
            DisplayName::parse("alice").unwrap(),
            "127.0.0.1:4000".parse().unwrap(),
            tx,
        );
        (conn, rx)
    }

    #[tokio::test]
    async fn test_send_queues_message() {
        let (conn, mut rx) = test_connection(4);
        let msg = ServerMessage::Joined(DisplayName::parse("bob").unwrap());

        conn.send(msg.clone()).unwrap();

        assert_eq!(rx.recv().await, Some(msg));
    }

    #[test]
    fn test_send_reports_full_and_closed() {
        let (conn, rx) = test_connection(1);
        let msg = ServerMessage::Left(DisplayName::parse("bob").unwrap());

        conn.send(msg.clone()).unwrap();
        assert_eq!(conn.send(msg.clone()), Err(SendError::QueueFull));

        drop(rx);
        assert_eq!(conn.send(msg), Err(SendError::ChannelClosed));
    }
}
