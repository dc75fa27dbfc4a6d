//! Bounded client registry
//!
//! Table of connections that have completed the handshake, keyed by id.
//! The registry itself is not synchronized: it is owned by the `ChatServer`
//! actor, which serializes every insert, remove and scan.

use std::collections::HashMap;

use crate::connection::Connection;
use crate::types::ClientId;

/// Fixed-capacity mapping from `ClientId` to `Connection`
#[derive(Debug)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, Connection>,
    capacity: usize,
}

impl ClientRegistry {
    /// Create an empty registry holding at most `capacity` connections
    pub fn new(capacity: usize) -> Self {
        Self {
            clients: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert a connection
    ///
    /// Returns false, leaving the registry untouched, if it is full or the
    /// id is already present.
    pub fn add(&mut self, connection: Connection) -> bool {
        if self.is_full() || self.clients.contains_key(&connection.id) {
            return false;
        }
        self.clients.insert(connection.id, connection);
        true
    }

    /// Remove a connection; absent ids are a no-op
    pub fn remove(&mut self, id: ClientId) -> Option<Connection> {
        self.clients.remove(&id)
    }

    /// Call `f` for every connection except `exclude`
    pub fn for_each_except<F>(&self, exclude: ClientId, mut f: F)
    where
        F: FnMut(&Connection),
    {
        for conn in self.clients.values().filter(|conn| conn.id != exclude) {
            f(conn);
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
