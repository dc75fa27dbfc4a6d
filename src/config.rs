//! Server configuration and command line arguments

use std::net::{Ipv4Addr, SocketAddr};

use clap::Parser;

use crate::error::ChatError;

/// Shared secret every client must present
pub const DEFAULT_PASSWORD: &str = "12345";

/// Maximum number of registered clients
pub const MAX_CLIENTS: usize = 100;

/// Depth of each connection's outbound message queue
pub const OUTBOUND_QUEUE: usize = 64;

/// Channel buffer size for server commands
pub const CHANNEL_BUFFER_SIZE: usize = 256;

/// Runtime settings for the chat server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub addr: SocketAddr,
    /// Shared handshake secret
    pub password: String,
    /// Registry capacity
    pub max_clients: usize,
}

impl ServerConfig {
    /// Loopback listener on `port` with the built-in password and capacity
    pub fn with_port(port: u16) -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            password: DEFAULT_PASSWORD.to_string(),
            max_clients: MAX_CLIENTS,
        }
    }
}

/// Command line for both the server and the client
#[derive(Parser, Debug)]
#[command(version, about = "Password-gated TCP chatroom")]
pub struct Args {
    /// Port on 127.0.0.1
    pub port: u16,
}

impl Args {
    /// Parse process arguments, turning usage errors into `ChatError::Config`
    ///
    /// `--help` and `--version` print and exit successfully.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::parse_args(std::env::args_os())
    }

    pub fn parse_args<I, T>(args: I) -> Result<Self, ChatError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        match <Self as Parser>::try_parse_from(args) {
            Ok(args) => Ok(args),
            Err(e) if e.use_stderr() => Err(ChatError::Config(e.to_string())),
            Err(e) => e.exit(),
        }
    }
}
