//! TCP connection handler
//!
//! Drives one accepted connection through its whole life: handshake,
//! registration with the ChatServer, steady-state relay, and teardown.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::{ServerConfig, OUTBOUND_QUEUE};
use crate::connection::Connection;
use crate::error::ChatError;
use crate::handshake;
use crate::message::{is_exit, trim_line, ServerMessage, RELAY_BUFFER};
use crate::server::ServerCommand;
use crate::types::{ClientId, DisplayName};

/// Why a session's relay loop stopped
#[derive(Debug)]
pub enum SessionExit {
    /// Peer closed its side (zero-byte read)
    PeerClosed,
    /// Peer sent the exit sentinel
    ExitToken,
    /// The ChatServer actor is gone
    ServerGone,
    /// Read failed
    Transport(std::io::Error),
}

impl SessionExit {
    /// Whether the rest of the room is told this client left
    pub fn announces_leave(&self) -> bool {
        matches!(self, SessionExit::PeerClosed | SessionExit::ExitToken)
    }
}

/// Steady-state state of a registered connection
#[derive(Debug)]
pub struct Session {
    id: ClientId,
    name: DisplayName,
    leaving: bool,
    commands: mpsc::Sender<ServerCommand>,
}

impl Session {
    pub fn new(id: ClientId, name: DisplayName, commands: mpsc::Sender<ServerCommand>) -> Self {
        Self {
            id,
            name,
            leaving: false,
            commands,
        }
    }

    /// Relay everything the peer sends to the other clients until it leaves
    ///
    /// Each received chunk is broadcast verbatim up to its first NUL,
    /// excluding this session.
    pub async fn relay<R>(&mut self, reader: &mut R) -> SessionExit
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; RELAY_BUFFER];
        let mut exit = SessionExit::PeerClosed;

        while !self.leaving {
            let n = match reader.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    debug!("Read from {} failed: {}", self.id, e);
                    self.leaving = true;
                    exit = SessionExit::Transport(e);
                    continue;
                }
            };
            // Only what precedes the first NUL is text
            let end = buf[..n].iter().position(|&b| b == 0).unwrap_or(n);
            let chunk = &buf[..end];

            if n == 0 || is_exit(chunk) {
                exit = if n == 0 {
                    SessionExit::PeerClosed
                } else {
                    SessionExit::ExitToken
                };
                info!("{} has left", self.name);
                self.leaving = true;
                if !self.broadcast(ServerMessage::Left(self.name.clone())).await {
                    exit = SessionExit::ServerGone;
                }
                continue;
            }

            if chunk.is_empty() {
                continue;
            }

            info!("{} -> {}", String::from_utf8_lossy(trim_line(chunk)), self.name);
            if !self.broadcast(ServerMessage::Relay(Arc::from(chunk))).await {
                self.leaving = true;
                exit = SessionExit::ServerGone;
            }
        }

        exit
    }

    async fn broadcast(&self, message: ServerMessage) -> bool {
        self.commands
            .send(ServerCommand::Broadcast {
                from: self.id,
                message,
            })
            .await
            .is_ok()
    }
}

/// Handle a new TCP connection
///
/// Every error is scoped to this connection. The socket is closed on
/// return no matter which branch ended the session.
pub async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    cmd_tx: mpsc::Sender<ServerCommand>,
    config: Arc<ServerConfig>,
) -> Result<(), ChatError> {
    let client_id = ClientId::next();
    debug!("New TCP connection {} from {}", client_id, peer_addr);

    let (mut reader, mut writer) = stream.into_split();

    let name = handshake::perform(&mut reader, &mut writer, &config.password, peer_addr).await?;

    // Channel for server -> client messages, drained by the writer task
    let (msg_tx, msg_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_QUEUE);
    let connection = Connection::new(client_id, name.clone(), peer_addr, msg_tx);

    let (reply, added) = oneshot::channel();
    cmd_tx
        .send(ServerCommand::Connect { connection, reply })
        .await
        .map_err(|_| ChatError::ChannelSend)?;
    if !added.await.map_err(|_| ChatError::ChannelSend)? {
        warn!("Max clients reached. Rejected: {}", peer_addr);
        return Err(ChatError::Capacity {
            max: config.max_clients,
        });
    }

    let write_task = tokio::spawn(write_loop(writer, msg_rx, client_id));

    let mut session = Session::new(client_id, name, cmd_tx.clone());
    let exit = session.relay(&mut reader).await;
    if exit.announces_leave() {
        debug!("Session {} ended: {:?}", client_id, exit);
    } else {
        warn!("Session {} ended without a leave notice: {:?}", client_id, exit);
    }

    // Teardown: removal drops the queue sender, which lets the writer drain
    // and shut the socket down.
    let _ = cmd_tx.send(ServerCommand::Disconnect { client_id }).await;
    drop(reader);
    let _ = write_task.await;

    info!("Client {} disconnected", client_id);

    match exit {
        SessionExit::Transport(e) => Err(ChatError::Transport(e)),
        SessionExit::ServerGone => Err(ChatError::ChannelSend),
        SessionExit::PeerClosed | SessionExit::ExitToken => Ok(()),
    }
}

/// Single writer for one socket
///
/// Writes each queued message in full, so frames from different broadcasters
/// never interleave. Ends when the queue closes or a write fails.
async fn write_loop<W>(mut writer: W, mut msg_rx: mpsc::Receiver<ServerMessage>, client_id: ClientId)
where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = msg_rx.recv().await {
        if let Err(e) = writer.write_all(&msg.to_bytes()).await {
            debug!("Write to {} failed, ending write task: {}", client_id, e);
            break;
        }
    }
    debug!("Write task ended for {}", client_id);

    let _ = writer.shutdown().await;
}
