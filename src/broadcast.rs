//! Fan-out of one message to every registered connection but the sender

use tracing::warn;

use crate::message::ServerMessage;
use crate::registry::ClientRegistry;
use crate::types::ClientId;

/// Outcome of a single broadcast
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the message was queued for
    pub delivered: usize,
    /// Connections whose queue rejected the message
    pub failed: Vec<ClientId>,
}

impl BroadcastReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Queue `msg` for every connection in `registry` except `exclude`
///
/// Best effort: a connection that cannot take the message is logged and
/// skipped. It stays registered; its own session notices the broken socket
/// and tears itself down.
pub fn broadcast(registry: &ClientRegistry, msg: &ServerMessage, exclude: ClientId) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    registry.for_each_except(exclude, |conn| match conn.send(msg.clone()) {
        Ok(()) => report.delivered += 1,
        Err(e) => {
            warn!("Write to {} ({}) failed: {}", conn.name, conn.id, e);
            report.failed.push(conn.id);
        }
    });

    report
}
