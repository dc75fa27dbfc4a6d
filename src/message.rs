//! Wire protocol definitions
//!
//! Plain ASCII text over TCP. The handshake uses fixed-size slots, steady
//! state traffic is `name: text\n` lines relayed verbatim to other clients.

use std::sync::Arc;

use crate::types::DisplayName;

/// Password read size; only the first `PASSWORD_BUFFER - 1` bytes count
pub const PASSWORD_BUFFER: usize = 50;
/// Fixed size of the name slot sent after a successful password check
pub const NAME_SLOT: usize = 32;
/// Size of the buffer a client reads the handshake reply into
pub const REPLY_BUFFER: usize = 32;
/// Longest operator input sent in a single frame
pub const MESSAGE_MAX: usize = 2047;
/// Server receive buffer for steady state relay
///
/// Holds the largest frame a client builds: the longest name, `": "`,
/// `MESSAGE_MAX` bytes of text and the newline.
pub const RELAY_BUFFER: usize = DisplayName::MAX_LEN - 1 + 2 + MESSAGE_MAX + 1;

/// Password accepted
pub const ACK_OK: &[u8] = b"OK";
/// Password rejected
pub const ACK_FAIL: &[u8] = b"FAIL";
/// Sentinel line that ends a session
pub const EXIT_TOKEN: &str = "exit";

/// Strip everything from the first newline or NUL onward, plus a trailing `\r`.
///
/// Works on raw bytes so it never panics on arbitrary peer input.
pub fn trim_line(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .position(|&b| b == b'\n' || b == 0)
        .unwrap_or(bytes.len());
    let line = &bytes[..end];
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Whether the bytes spell the exit sentinel once trimmed
pub fn is_exit(bytes: &[u8]) -> bool {
    trim_line(bytes) == EXIT_TOKEN.as_bytes()
}

/// Encode a name into its zero-padded handshake slot
pub fn encode_name_slot(name: &DisplayName) -> [u8; NAME_SLOT] {
    let mut slot = [0u8; NAME_SLOT];
    let bytes = name.as_str().as_bytes();
    slot[..bytes.len()].copy_from_slice(bytes);
    slot
}

/// Frame operator input as `name: text\n`, split so no frame carries more
/// than `MESSAGE_MAX` bytes of text. Splits land on char boundaries.
pub fn chat_frames(name: &DisplayName, text: &str) -> Vec<String> {
    let mut frames = Vec::new();
    let mut rest = text;
    loop {
        let mut cut = rest.len().min(MESSAGE_MAX);
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        frames.push(format!("{}: {}\n", name, head));
        if tail.is_empty() {
            break;
        }
        rest = tail;
    }
    frames
}

/// Server → Client message
///
/// Everything a writer task can be asked to put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Bytes received from another client, relayed verbatim
    Relay(Arc<[u8]>),
    /// Another client completed the handshake
    Joined(DisplayName),
    /// Another client left
    Left(DisplayName),
}

impl ServerMessage {
    /// Render the message exactly as it is written to the socket
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ServerMessage::Relay(bytes) => bytes.to_vec(),
            ServerMessage::Joined(name) => format!("{} has joined\n", name).into_bytes(),
            ServerMessage::Left(name) => format!("{} has left\n", name).into_bytes(),
        }
    }
}
