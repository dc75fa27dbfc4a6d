//! Accept loop
//!
//! Spawns the ChatServer actor and one handler task per incoming connection.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::{ServerConfig, CHANNEL_BUFFER_SIZE};
use crate::error::ChatError;
use crate::handler::handle_connection;
use crate::server::{ChatServer, ServerCommand};

/// Start the ChatServer actor and return its command channel
pub fn spawn_chat_server(max_clients: usize) -> mpsc::Sender<ServerCommand> {
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    tokio::spawn(ChatServer::new(cmd_rx, max_clients).run());
    info!("ChatServer actor started");
    cmd_tx
}

/// Accept connections forever, handing each to its own task
///
/// Per-connection failures are logged and never stop the loop.
pub async fn serve(
    listener: TcpListener,
    cmd_tx: mpsc::Sender<ServerCommand>,
    config: Arc<ServerConfig>,
) -> Result<(), ChatError> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();
                let config = Arc::clone(&config);

                tokio::spawn(async move {
                    match handle_connection(stream, addr, cmd_tx, config).await {
                        Ok(()) => {}
                        Err(e @ ChatError::Auth { .. }) => {
                            info!("Incorrect password from {}: {}", addr, e);
                        }
                        Err(e @ ChatError::Protocol(_)) => {
                            info!("Didn't enter the name ({}): {}", addr, e);
                        }
                        Err(e) => {
                            warn!("Connection {} ended with error: {}", addr, e);
                        }
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Bind `config.addr`, start the actor, and serve
pub async fn run(config: ServerConfig) -> Result<(), ChatError> {
    let listener = TcpListener::bind(config.addr).await?;
    info!("Chat server listening on {}", listener.local_addr()?);
    info!("=== WELCOME TO THE CHATROOM ===");

    let cmd_tx = spawn_chat_server(config.max_clients);
    serve(listener, cmd_tx, Arc::new(config)).await
}
