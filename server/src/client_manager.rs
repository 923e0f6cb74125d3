//! Connection tracking for the arena server
//!
//! Every connected client owns exactly one actor in the world, and the
//! connection is keyed by that actor's id. A connection dies in one of three
//! ways: the client says goodbye, it goes quiet for longer than
//! [`CLIENT_TIMEOUT`], or a send to it fails. The last case only marks it dead;
//! the server loop reaps dead connections between ticks.

use log::{info, warn};
use shared::ActorId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Silence after which a client is considered gone.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct Connection {
    /// Id of the actor this client controls
    pub id: ActorId,
    pub addr: SocketAddr,
    pub name: String,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Cleared when a send to this client fails
    pub alive: bool,
    /// Highest input sequence applied so far
    pub last_input_sequence: Option<u32>,
}

impl Connection {
    pub fn new(id: ActorId, addr: SocketAddr, name: String) -> Self {
        Self {
            id,
            addr,
            name,
            last_seen: Instant::now(),
            alive: true,
            last_input_sequence: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Records `sequence` if it is newer than anything seen so far. Returns
    /// false for duplicates and inputs overtaken by a later one.
    pub fn accept_input(&mut self, sequence: u32) -> bool {
        match self.last_input_sequence {
            Some(last) if sequence <= last => false,
            _ => {
                self.last_input_sequence = Some(sequence);
                true
            }
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

pub struct ClientManager {
    clients: HashMap<ActorId, Connection>,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            max_clients,
        }
    }

    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.max_clients
    }

    /// Registers the client driving actor `id`. Returns false when the server
    /// is at capacity.
    pub fn add_client(&mut self, id: ActorId, addr: SocketAddr, name: String) -> bool {
        if self.is_full() {
            return false;
        }

        info!("Client {} ({}) connected from {}", id, name, addr);
        self.clients.insert(id, Connection::new(id, addr, name));
        true
    }

    pub fn remove_client(&mut self, id: &ActorId) -> Option<Connection> {
        let removed = self.clients.remove(id);
        if let Some(client) = &removed {
            info!("Client {} ({}) disconnected", client.id, client.name);
        }
        removed
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<ActorId> {
        self.clients
            .values()
            .find(|client| client.addr == addr)
            .map(|client| client.id)
    }

    pub fn get_mut(&mut self, id: &ActorId) -> Option<&mut Connection> {
        self.clients.get_mut(id)
    }

    pub fn mark_dead(&mut self, id: &ActorId) {
        if let Some(client) = self.clients.get_mut(id) {
            if client.alive {
                warn!("Lost connection to client {} ({})", client.id, client.addr);
            }
            client.alive = false;
        }
    }

    /// Removes every connection marked dead and returns their actor ids.
    pub fn reap_dead(&mut self) -> Vec<ActorId> {
        let dead: Vec<ActorId> = self
            .clients
            .values()
            .filter(|client| !client.alive)
            .map(|client| client.id)
            .collect();

        for id in &dead {
            self.remove_client(id);
        }
        dead
    }

    /// Removes clients silent for longer than `timeout` and returns their ids.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<ActorId> {
        let timed_out: Vec<ActorId> = self
            .clients
            .values()
            .filter(|client| client.is_timed_out(timeout))
            .map(|client| client.id)
            .collect();

        for id in &timed_out {
            self.remove_client(id);
        }
        timed_out
    }

    /// Addresses of live connections, for broadcasting.
    pub fn get_client_addrs(&self) -> Vec<(ActorId, SocketAddr)> {
        self.clients
            .values()
            .filter(|client| client.alive)
            .map(|client| (client.id, client.addr))
            .collect()
    }

    pub fn drain(&mut self) -> Vec<Connection> {
        self.clients.drain().map(|(_, client)| client).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_connection_creation() {
        let client = Connection::new(3, test_addr(), "alice".into());

        assert_eq!(client.id, 3);
        assert_eq!(client.addr, test_addr());
        assert!(client.alive);
        assert_eq!(client.last_input_sequence, None);
    }

    #[test]
    fn test_input_sequence_filter() {
        let mut client = Connection::new(1, test_addr(), "alice".into());

        assert!(client.accept_input(0));
        assert!(client.accept_input(2));
        assert!(!client.accept_input(2));
        assert!(!client.accept_input(1));
        assert!(client.accept_input(3));
        assert_eq!(client.last_input_sequence, Some(3));
    }

    #[test]
    fn test_client_timeout() {
        let mut client = Connection::new(1, test_addr(), "alice".into());
        assert!(!client.is_timed_out(Duration::from_secs(1)));

        client.last_seen = Instant::now() - Duration::from_secs(2);
        assert!(client.is_timed_out(Duration::from_secs(1)));

        client.touch();
        assert!(!client.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_add_client_max_capacity() {
        let mut manager = ClientManager::new(1);

        assert!(manager.add_client(1, test_addr(), "alice".into()));
        assert!(manager.is_full());
        assert!(!manager.add_client(2, test_addr2(), "bob".into()));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_remove_client() {
        let mut manager = ClientManager::new(2);
        manager.add_client(4, test_addr(), "alice".into());

        assert_eq!(manager.remove_client(&4).map(|c| c.id), Some(4));
        assert!(manager.remove_client(&4).is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_find_client_by_addr() {
        let mut manager = ClientManager::new(2);
        manager.add_client(1, test_addr(), "alice".into());
        manager.add_client(2, test_addr2(), "bob".into());

        assert_eq!(manager.find_client_by_addr(test_addr2()), Some(2));

        let unknown: SocketAddr = "192.168.1.1:9999".parse().unwrap();
        assert_eq!(manager.find_client_by_addr(unknown), None);
    }

    #[test]
    fn test_dead_connections_are_skipped_then_reaped() {
        let mut manager = ClientManager::new(4);
        manager.add_client(1, test_addr(), "alice".into());
        manager.add_client(2, test_addr2(), "bob".into());

        manager.mark_dead(&1);
        assert_eq!(manager.get_client_addrs(), vec![(2, test_addr2())]);
        assert_eq!(manager.len(), 2);

        assert_eq!(manager.reap_dead(), vec![1]);
        assert_eq!(manager.len(), 1);
        assert!(manager.reap_dead().is_empty());
    }

    #[test]
    fn test_check_timeouts() {
        let mut manager = ClientManager::new(4);
        manager.add_client(1, test_addr(), "alice".into());
        manager.add_client(2, test_addr2(), "bob".into());
        manager.get_mut(&2).unwrap().last_seen = Instant::now() - Duration::from_secs(10);

        assert_eq!(manager.check_timeouts(CLIENT_TIMEOUT), vec![2]);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_drain_empties_manager() {
        let mut manager = ClientManager::new(4);
        manager.add_client(1, test_addr(), "alice".into());
        manager.add_client(2, test_addr2(), "bob".into());

        assert_eq!(manager.drain().len(), 2);
        assert!(manager.is_empty());
    }
}
