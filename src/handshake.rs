//! Password-then-name handshake
//!
//! `SessionHandshake` is a pure state machine over received bytes;
//! `perform` drives it against a socket.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::ChatError;
use crate::message::{trim_line, ACK_FAIL, ACK_OK, NAME_SLOT, PASSWORD_BUFFER};
use crate::types::DisplayName;

/// Where a connection is in the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    /// Waiting for the shared secret
    AwaitPassword,
    /// Password accepted, waiting for the name slot
    AwaitName,
    /// Handshake complete
    Registered(DisplayName),
    /// Terminal failure; the connection is closed
    Rejected,
}

/// Handshake state machine for one connection
#[derive(Debug)]
pub struct SessionHandshake<'a> {
    secret: &'a str,
    state: HandshakeState,
}

impl<'a> SessionHandshake<'a> {
    pub fn new(secret: &'a str) -> Self {
        Self {
            secret,
            state: HandshakeState::AwaitPassword,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.state == HandshakeState::Rejected
    }

    /// Check the password bytes and return the reply to send
    ///
    /// Comparison is case-sensitive on the text before the first newline,
    /// looking at no more than `PASSWORD_BUFFER - 1` bytes.
    pub fn on_password(&mut self, received: &[u8]) -> &'static [u8] {
        if self.state != HandshakeState::AwaitPassword {
            self.state = HandshakeState::Rejected;
            return ACK_FAIL;
        }

        let received = &received[..received.len().min(PASSWORD_BUFFER - 1)];
        if trim_line(received) == self.secret.as_bytes() {
            self.state = HandshakeState::AwaitName;
            ACK_OK
        } else {
            self.state = HandshakeState::Rejected;
            ACK_FAIL
        }
    }

    /// Validate the name slot; `None` means the read failed or hit EOF
    pub fn on_name(&mut self, slot: Option<&[u8]>) -> Result<DisplayName, ChatError> {
        let result = match (&self.state, slot) {
            (HandshakeState::AwaitName, Some(slot)) => std::str::from_utf8(trim_line(slot))
                .map_err(|_| ChatError::Protocol("name is not valid UTF-8".into()))
                .and_then(|name| DisplayName::parse(name)),
            (HandshakeState::AwaitName, None) => Err(ChatError::Protocol("name not received".into())),
            (state, _) => Err(ChatError::Protocol(format!("unexpected name in state {:?}", state))),
        };

        self.state = match &result {
            Ok(name) => HandshakeState::Registered(name.clone()),
            Err(_) => HandshakeState::Rejected,
        };
        result
    }
}

/// Run the handshake over a connection's read and write halves
///
/// Returns the validated name, or the reason the connection was rejected.
/// Nothing is written after a bad name; the caller just closes the socket.
pub async fn perform<R, W>(
    reader: &mut R,
    writer: &mut W,
    secret: &str,
    peer_addr: SocketAddr,
) -> Result<DisplayName, ChatError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut handshake = SessionHandshake::new(secret);

    let mut password = [0u8; PASSWORD_BUFFER];
    let n = reader.read(&mut password).await?;
    let reply = handshake.on_password(&password[..n]);
    writer.write_all(reply).await?;
    writer.flush().await?;

    if handshake.is_rejected() {
        return Err(ChatError::auth(peer_addr));
    }
    debug!("Password accepted from {}", peer_addr);

    let mut slot = [0u8; NAME_SLOT];
    let received = match reader.read_exact(&mut slot).await {
        Ok(_) => Some(&slot[..]),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => None,
        Err(e) => return Err(e.into()),
    };
    handshake.on_name(received)
}
