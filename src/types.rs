//! Basic type definitions for the chatroom
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: monotonically assigned connection identifier
//! - `DisplayName`: validated, immutable chat name

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ChatError;

/// Next id handed out by `ClientId::next`
static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(10);

/// Unique connection identifier (newtype pattern)
///
/// Ids are assigned from a process-wide counter and never reused.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl ClientId {
    /// Allocate the next client ID
    pub fn next() -> Self {
        Self(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Display name chosen during the handshake
///
/// Length is measured in bytes and must lie in `[MIN_LEN, MAX_LEN)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayName(String);

impl DisplayName {
    /// Shortest accepted name in bytes
    pub const MIN_LEN: usize = 2;
    /// Names must be strictly shorter than this
    pub const MAX_LEN: usize = 31;

    /// Validate a candidate name
    pub fn parse(name: impl Into<String>) -> Result<Self, ChatError> {
        let name = name.into();
        if name.len() < Self::MIN_LEN || name.len() >= Self::MAX_LEN {
            return Err(ChatError::Protocol(format!(
                "name must be {}-{} bytes, got {}",
                Self::MIN_LEN,
                Self::MAX_LEN - 1,
                name.len()
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
