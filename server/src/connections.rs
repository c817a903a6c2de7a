//! Connection tracking for the server
//!
//! This module maps transport addresses to participant identities:
//! - Connection lifecycle (connect, disconnect, timeout)
//! - Liveness monitoring from the last datagram seen per address
//! - Capacity enforcement for new connections
//!
//! It knows nothing about motion; the simulation owns participant state and
//! the network loop keeps both in step.

use log::info;
use shared::ParticipantId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// One live transport endpoint and the participant it controls
#[derive(Debug)]
pub struct Connection {
    /// Identity of the participant owned by this connection
    pub participant_id: ParticipantId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this address
    pub last_seen: Instant,
}

impl Connection {
    pub fn new(participant_id: ParticipantId, addr: SocketAddr) -> Self {
        Self {
            participant_id,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if nothing arrived from this address within `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Registry of all connected addresses
///
/// Keyed by address because every incoming datagram has to be resolved to
/// its participant before it can be applied.
pub struct ConnectionManager {
    connections: HashMap<SocketAddr, Connection>,
    max_clients: usize,
}

impl ConnectionManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            connections: HashMap::new(),
            max_clients,
        }
    }

    pub fn is_full(&self) -> bool {
        self.connections.len() >= self.max_clients
    }

    /// Registers `addr` as the connection for `participant_id`
    ///
    /// Returns false when the server is at capacity. An address that is
    /// already registered must be removed first.
    pub fn add(&mut self, addr: SocketAddr, participant_id: ParticipantId) -> bool {
        if self.is_full() {
            return false;
        }

        info!("Participant {} connected from {}", participant_id, addr);
        self.connections
            .insert(addr, Connection::new(participant_id, addr));
        true
    }

    /// Removes the connection at `addr`, returning the participant it owned
    pub fn remove(&mut self, addr: &SocketAddr) -> Option<ParticipantId> {
        let connection = self.connections.remove(addr)?;
        info!(
            "Participant {} disconnected from {}",
            connection.participant_id, addr
        );
        Some(connection.participant_id)
    }

    pub fn participant_for(&self, addr: &SocketAddr) -> Option<&ParticipantId> {
        self.connections.get(addr).map(|c| &c.participant_id)
    }

    /// Refreshes the liveness of `addr`. Returns false for unknown addresses.
    pub fn touch(&mut self, addr: &SocketAddr) -> bool {
        match self.connections.get_mut(addr) {
            Some(connection) => {
                connection.touch();
                true
            }
            None => false,
        }
    }

    /// Removes and returns every connection silent for longer than `timeout`
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<(SocketAddr, ParticipantId)> {
        let expired: Vec<SocketAddr> = self
            .connections
            .values()
            .filter(|c| c.is_timed_out(timeout))
            .map(|c| c.addr)
            .collect();

        expired
            .into_iter()
            .filter_map(|addr| {
                let connection = self.connections.remove(&addr)?;
                info!(
                    "Participant {} timed out ({}s without packets)",
                    connection.participant_id,
                    timeout.as_secs()
                );
                Some((addr, connection.participant_id))
            })
            .collect()
    }

    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.connections.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
