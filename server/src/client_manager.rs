//! Connection bookkeeping for the UDP transport
//!
//! This module maps network addresses to room session ids:
//! - Session id allocation for new connections
//! - Capacity enforcement
//! - Last-seen tracking and timeout detection
//!
//! Room semantics (roles, names, entities) live in the room itself; the
//! client manager only knows who is connected and where to reach them.

use log::info;
use rand::distributions::Alphanumeric;
use rand::Rng;
use shared::SessionId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Length of generated session ids
pub const SESSION_ID_LEN: usize = 9;

/// A connected client
#[derive(Debug)]
pub struct Client {
    /// Session id assigned by the server
    pub session_id: SessionId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
}

impl Client {
    pub fn new(session_id: SessionId, addr: SocketAddr) -> Self {
        Self {
            session_id,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if nothing arrived from this client within `timeout`.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients
///
/// Enforces the room's capacity and hands out unique session ids. Shared
/// between the event loop, the outbound sender and the timeout checker.
pub struct ClientManager {
    /// Connected clients indexed by session id
    clients: HashMap<SessionId, Client>,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            max_clients,
        }
    }

    /// Registers a connection from `addr`
    ///
    /// Returns the new session id, or None if the server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<SessionId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let session_id = self.generate_session_id();
        info!("Client {} connected from {}", session_id, addr);
        self.clients
            .insert(session_id.clone(), Client::new(session_id.clone(), addr));

        Some(session_id)
    }

    /// Returns true if the client was found and removed.
    pub fn remove_client(&mut self, session_id: &SessionId) -> bool {
        if let Some(client) = self.clients.remove(session_id) {
            info!("Client {} disconnected", client.session_id);
            true
        } else {
            false
        }
    }

    pub fn find_session_by_addr(&self, addr: SocketAddr) -> Option<SessionId> {
        self.clients
            .values()
            .find(|client| client.addr == addr)
            .map(|client| client.session_id.clone())
    }

    pub fn addr_of(&self, session_id: &SessionId) -> Option<SocketAddr> {
        self.clients.get(session_id).map(|client| client.addr)
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.clients.contains_key(session_id)
    }

    /// Refreshes the last-seen time of whoever is connected from `addr`.
    pub fn touch(&mut self, addr: SocketAddr) -> Option<SessionId> {
        let client = self.clients.values_mut().find(|client| client.addr == addr)?;
        client.touch();
        Some(client.session_id.clone())
    }

    /// Removes clients silent for longer than `timeout` and returns their ids.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<SessionId> {
        let timed_out: Vec<SessionId> = self
            .clients
            .values()
            .filter(|client| client.is_timed_out(timeout))
            .map(|client| client.session_id.clone())
            .collect();

        for session_id in &timed_out {
            self.remove_client(session_id);
        }

        timed_out
    }

    /// All session ids and their addresses, for broadcasting.
    pub fn get_client_addrs(&self) -> Vec<(SessionId, SocketAddr)> {
        self.clients
            .values()
            .map(|client| (client.session_id.clone(), client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn generate_session_id(&self) -> SessionId {
        let mut rng = rand::thread_rng();
        loop {
            let candidate: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(SESSION_ID_LEN)
                .map(char::from)
                .collect();
            if !self.clients.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:2567".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:2568".parse().unwrap()
    }

    #[test]
    fn test_client_timeout() {
        let mut client = Client::new("abc".to_string(), test_addr());

        assert!(!client.is_timed_out(Duration::from_secs(1)));

        client.last_seen = Instant::now() - Duration::from_secs(2);
        assert!(client.is_timed_out(Duration::from_secs(1)));

        client.touch();
        assert!(!client.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_client_manager_creation() {
        let manager = ClientManager::new(5);
        assert_eq!(manager.max_clients, 5);
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_add_client_generates_session_id() {
        let mut manager = ClientManager::new(2);

        let session_id = manager.add_client(test_addr()).unwrap();
        assert_eq!(session_id.len(), SESSION_ID_LEN);
        assert!(session_id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(manager.contains(&session_id));
        assert_eq!(manager.addr_of(&session_id), Some(test_addr()));
    }

    #[test]
    fn test_add_multiple_clients() {
        let mut manager = ClientManager::new(3);

        let id1 = manager.add_client(test_addr()).unwrap();
        let id2 = manager.add_client(test_addr2()).unwrap();

        assert_ne!(id1, id2);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_add_client_max_capacity() {
        let mut manager = ClientManager::new(1);

        assert!(manager.add_client(test_addr()).is_some());
        assert!(manager.add_client(test_addr2()).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_remove_client() {
        let mut manager = ClientManager::new(2);
        let session_id = manager.add_client(test_addr()).unwrap();

        assert!(manager.remove_client(&session_id));
        assert!(manager.is_empty());
        assert!(!manager.remove_client(&session_id));
    }

    #[test]
    fn test_find_session_by_addr() {
        let mut manager = ClientManager::new(2);
        let id1 = manager.add_client(test_addr()).unwrap();
        let _id2 = manager.add_client(test_addr2()).unwrap();

        assert_eq!(manager.find_session_by_addr(test_addr()), Some(id1));

        let unknown_addr: SocketAddr = "192.168.1.1:9999".parse().unwrap();
        assert_eq!(manager.find_session_by_addr(unknown_addr), None);
    }

    #[test]
    fn test_touch() {
        let mut manager = ClientManager::new(2);
        let session_id = manager.add_client(test_addr()).unwrap();

        assert_eq!(manager.touch(test_addr()), Some(session_id));
        assert_eq!(manager.touch(test_addr2()), None);
    }

    #[test]
    fn test_check_timeouts() {
        let mut manager = ClientManager::new(2);
        let stale = manager.add_client(test_addr()).unwrap();
        let fresh = manager.add_client(test_addr2()).unwrap();

        if let Some(client) = manager.clients.get_mut(&stale) {
            client.last_seen = Instant::now() - Duration::from_secs(30);
        }

        let timed_out = manager.check_timeouts(Duration::from_secs(10));
        assert_eq!(timed_out, vec![stale.clone()]);
        assert!(!manager.contains(&stale));
        assert!(manager.contains(&fresh));
    }

    #[test]
    fn test_get_client_addrs() {
        let mut manager = ClientManager::new(2);
        let id1 = manager.add_client(test_addr()).unwrap();

        let addrs = manager.get_client_addrs();
        assert_eq!(addrs, vec![(id1, test_addr())]);
    }
}
