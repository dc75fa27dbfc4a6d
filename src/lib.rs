//! Password-gated TCP Chatroom Library
//!
//! A tokio chat server that relays every line one client sends to all the
//! others, plus the matching terminal client.
//!
//! # Features
//! - Shared-password handshake followed by a display name
//! - Bounded client registry (at most `MAX_CLIENTS`)
//! - Join and leave notices
//! - Verbatim message relay, never echoed to the sender
//! - Client with concurrent send and receive loops and cooperative shutdown
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning the `ClientRegistry`
//! - Each connection has a `handler` task that reads from the socket and a
//!   writer task that is the only thing writing to it
//! - No locks needed - all registry access goes through message passing
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use chatroom::{listener, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::with_port(8080);
//!     let tcp = TcpListener::bind(config.addr).await.unwrap();
//!     let cmd_tx = listener::spawn_chat_server(config.max_clients);
//!     listener::serve(tcp, cmd_tx, Arc::new(config)).await.unwrap();
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod duplex;
pub mod error;
pub mod handler;
pub mod handshake;
pub mod listener;
pub mod message;
pub mod registry;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use broadcast::{broadcast, BroadcastReport};
pub use config::{Args, ServerConfig, MAX_CLIENTS};
pub use connection::Connection;
pub use error::{ChatError, SendError};
pub use handler::{handle_connection, Session, SessionExit};
pub use handshake::{HandshakeState, SessionHandshake};
pub use message::ServerMessage;
pub use registry::ClientRegistry;
pub use server::{ChatServer, ServerCommand};
pub use types::{ClientId, DisplayName};
