//! ChatServer Actor implementation
//!
//! The central actor that owns the client registry. Every registry
//! operation arrives as a `ServerCommand` on one mpsc queue and is handled
//! to completion before the next, so insert, remove and broadcast never
//! observe each other half-done.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::broadcast::{broadcast, BroadcastReport};
use crate::connection::Connection;
use crate::message::ServerMessage;
use crate::registry::ClientRegistry;
use crate::types::ClientId;

/// Commands sent from session handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Register a connection that passed the handshake.
    /// Replies false if the registry is full.
    Connect {
        connection: Connection,
        reply: oneshot::Sender<bool>,
    },
    /// Remove a connection; unknown ids are ignored
    Disconnect { client_id: ClientId },
    /// Deliver a message to everyone except `from`
    Broadcast {
        from: ClientId,
        message: ServerMessage,
    },
    /// Number of registered connections
    ClientCount { reply: oneshot::Sender<usize> },
}

/// The main ChatServer actor
pub struct ChatServer {
    /// Registered connections
    registry: ClientRegistry,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer holding at most `max_clients` connections
    pub fn new(receiver: mpsc::Receiver<ServerCommand>, max_clients: usize) -> Self {
        Self {
            registry: ClientRegistry::new(max_clients),
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { connection, reply } => {
                let added = self.handle_connect(connection);
                let _ = reply.send(added);
            }
            ServerCommand::Disconnect { client_id } => {
                self.handle_disconnect(client_id);
            }
            ServerCommand::Broadcast { from, message } => {
                self.handle_broadcast(from, message);
            }
            ServerCommand::ClientCount { reply } => {
                let _ = reply.send(self.registry.len());
            }
        }
    }

    /// Register a connection and announce it to everyone else
    fn handle_connect(&mut self, connection: Connection) -> bool {
        let client_id = connection.id;
        let name = connection.name.clone();

        if !self.registry.add(connection) {
            debug!(
                "Could not register {} ({} of {} slots in use)",
                client_id,
                self.registry.len(),
                self.registry.capacity()
            );
            return false;
        }

        info!("{} has joined ({})", name, client_id);
        self.handle_broadcast(client_id, ServerMessage::Joined(name));
        debug!("Total clients: {}", self.registry.len());
        true
    }

    /// Handle client disconnection
    fn handle_disconnect(&mut self, client_id: ClientId) {
        if let Some(conn) = self.registry.remove(client_id) {
            info!("Client {} ({}) removed", conn.name, client_id);
        }
        debug!("Total clients: {}", self.registry.len());
    }

    fn handle_broadcast(&self, from: ClientId, message: ServerMessage) -> BroadcastReport {
        let report = broadcast(&self.registry, &message, from);
        if !report.is_complete() {
            debug!(
                "Broadcast from {} reached {} of {} clients",
                from,
                report.delivered,
                report.delivered + report.failed.len()
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DisplayName;

    fn start(max_clients: usize) -> mpsc::Sender<ServerCommand> {
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(ChatServer::new(rx, max_clients).run());
        tx
    }

    async fn connect(
        server: &mpsc::Sender<ServerCommand>,
        name: &str,
    ) -> (ClientId, bool, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(16);
        let id = ClientId::next();
        let connection = Connection::new(
            id,
            DisplayName::parse(name).unwrap(),
            "127.0.0.1:7000".parse().unwrap(),
            tx,
        );
        let (reply, added) = oneshot::channel();
        server
            .send(ServerCommand::Connect { connection, reply })
            .await
            .unwrap();
        (id, added.await.unwrap(), rx)
    }

    async fn count(server: &mpsc::Sender<ServerCommand>) -> usize {
        let (reply, rx) = oneshot::channel();
        server
            .send(ServerCommand::ClientCount { reply })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn test_connect_announces_join_to_others() {
        let server = start(4);
        let (_alice, ok, mut alice_rx) = connect(&server, "alice").await;
        assert!(ok);
        let (_bob, ok, mut bob_rx) = connect(&server, "bob").await;
        assert!(ok);

        assert_eq!(
            alice_rx.recv().await.unwrap(),
            ServerMessage::Joined(DisplayName::parse("bob").unwrap())
        );
        // Newcomer does not hear about itself
        assert_eq!(count(&server).await, 2);
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_connect_rejected_when_full() {
        let server = start(1);
        let (_alice, ok, _alice_rx) = connect(&server, "alice").await;
        assert!(ok);
        let (_bob, ok, _bob_rx) = connect(&server, "bob").await;
        assert!(!ok);
        assert_eq!(count(&server).await, 1);
    }

    #[tokio::test]
    async fn test_disconnect_frees_slot() {
        let server = start(1);
        let (alice, _, _alice_rx) = connect(&server, "alice").await;

        server
            .send(ServerCommand::Disconnect { client_id: alice })
            .await
            .unwrap();
        server
            .send(ServerCommand::Disconnect { client_id: alice })
            .await
            .unwrap();

        assert_eq!(count(&server).await, 0);
        let (_bob, ok, _bob_rx) = connect(&server, "bob").await;
        assert!(ok);
    }

    #[tokio::test]
    async fn test_broadcast_skips_sender() {
        let server = start(4);
        let (alice, _, mut alice_rx) = connect(&server, "alice").await;
        let (_bob, _, mut bob_rx) = connect(&server, "bob").await;
        let _ = alice_rx.recv().await; // bob has joined

        let message = ServerMessage::Relay(std::sync::Arc::from(&b"alice: hi\n"[..]));
        server
            .send(ServerCommand::Broadcast {
                from: alice,
                message: message.clone(),
            })
            .await
            .unwrap();

        assert_eq!(bob_rx.recv().await.unwrap(), message);
        assert_eq!(count(&server).await, 2);
        assert!(alice_rx.try_recv().is_err());
    }
}
