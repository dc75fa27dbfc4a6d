//! Error types for the chatroom
//!
//! Defines connection-scoped errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use std::net::SocketAddr;

use thiserror::Error;

/// Application-level errors
///
/// Everything except `Config` is scoped to a single connection: the
/// session that hit it ends, the server keeps accepting.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Bad command line or startup configuration (fatal)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shared password did not match
    #[error("Authentication failed for {peer}")]
    Auth { peer: String },

    /// Handshake data was missing or malformed
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Socket read/write failure
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Registry already holds the maximum number of clients
    #[error("Server full ({max} clients)")]
    Capacity { max: usize },

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,
}

impl ChatError {
    pub fn auth(peer: SocketAddr) -> Self {
        Self::Auth {
            peer: peer.to_string(),
        }
    }
}

/// Message send errors
///
/// Occurs when a message cannot be queued for a connection's writer task.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// Writer is not keeping up; the message was dropped
    #[error("Outbound queue full")]
    QueueFull,

    /// The writer task has exited
    #[error("Channel closed")]
    ChannelClosed,
}
