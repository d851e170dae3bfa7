//! Authoritative room state: one player entity per joined player session
//!
//! The store has no network awareness. Every mutation raises a "changed"
//! flag that the transport polls to decide when to replicate a snapshot.

use log::{debug, info, warn};
use shared::{Movement, Player, SessionId};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct RoomState {
    players: HashMap<SessionId, Player>,
    changed: bool,
}

impl RoomState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a zeroed player for `session_id`
    ///
    /// A requested name that collides with a present player's name gets
    /// `" (n)"` appended, `n` counting up from 1 until the name is free.
    /// Returns the stored name. A second create for the same session keeps
    /// the existing entity untouched.
    pub fn create_player(
        &mut self,
        session_id: &SessionId,
        requested_name: Option<&str>,
    ) -> Option<String> {
        if let Some(existing) = self.players.get(session_id) {
            warn!("Player for session {} already exists", session_id);
            return existing.name.clone();
        }

        let name = requested_name.map(|name| self.unique_name(name));
        let player = Player::new(name.clone());

        info!("Added player {} ({:?})", session_id, name);
        self.players.insert(session_id.clone(), player);
        self.changed = true;
        name
    }

    pub fn remove_player(&mut self, session_id: &SessionId) -> Option<Player> {
        let removed = self.players.remove(session_id);
        if removed.is_some() {
            info!("Removed player {}", session_id);
            self.changed = true;
        }
        removed
    }

    /// Overwrites position and rotation of the session's player
    ///
    /// Returns false when the session owns no player (observers, or a
    /// session that already left); nothing changes in that case.
    pub fn move_player(&mut self, session_id: &SessionId, movement: &Movement) -> bool {
        match self.players.get_mut(session_id) {
            Some(player) => {
                player.apply_movement(movement);
                self.changed = true;
                debug!(
                    "Moved player {} to ({}, {}, {})",
                    session_id, movement.position.x, movement.position.y, movement.position.z
                );
                true
            }
            None => false,
        }
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&Player> {
        self.players.get(session_id)
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.players.contains_key(session_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SessionId, &Player)> {
        self.players.iter()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Full copy of the replicated player map.
    pub fn snapshot(&self) -> HashMap<SessionId, Player> {
        self.players.clone()
    }

    /// Returns whether anything changed since the last call, and resets the flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn clear(&mut self) {
        if !self.players.is_empty() {
            self.changed = true;
        }
        self.players.clear();
    }

    fn unique_name(&self, requested: &str) -> String {
        let taken: HashSet<&str> = self
            .players
            .values()
            .filter_map(|player| player.name.as_deref())
            .collect();

        let mut candidate = requested.to_string();
        let mut count = 1;
        while taken.contains(candidate.as_str()) {
            candidate = format!("{} ({})", requested, count);
            count += 1;
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Vector3;

    fn sid(id: &str) -> SessionId {
        id.to_string()
    }

    fn movement(x: f32, ry: f32) -> Movement {
        Movement {
            position: Vector3::new(x, 1.0, -x),
            rotation: Vector3::new(0.0, ry, 0.0),
        }
    }

    #[test]
    fn test_create_player_zeroed() {
        let mut state = RoomState::new();
        let name = state.create_player(&sid("a"), Some("Alex"));

        assert_eq!(name.as_deref(), Some("Alex"));
        let player = state.get(&sid("a")).unwrap();
        assert_eq!(player.position, Vector3::default());
        assert_eq!(player.rotation, Vector3::default());
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_create_player_without_name() {
        let mut state = RoomState::new();
        assert_eq!(state.create_player(&sid("a"), None), None);
        assert_eq!(state.create_player(&sid("b"), None), None);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_colliding_names_get_suffixes_in_call_order() {
        let mut state = RoomState::new();
        assert_eq!(state.create_player(&sid("a"), Some("Bob")).unwrap(), "Bob");
        assert_eq!(
            state.create_player(&sid("b"), Some("Bob")).unwrap(),
            "Bob (1)"
        );
        assert_eq!(
            state.create_player(&sid("c"), Some("Bob")).unwrap(),
            "Bob (2)"
        );

        let names: HashSet<String> = state
            .iter()
            .filter_map(|(_, player)| player.name.clone())
            .collect();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_freed_name_is_reused() {
        let mut state = RoomState::new();
        state.create_player(&sid("a"), Some("Alex"));
        state.create_player(&sid("b"), Some("Alex"));
        state.remove_player(&sid("a"));

        assert_eq!(
            state.create_player(&sid("c"), Some("Alex")).unwrap(),
            "Alex"
        );
    }

    #[test]
    fn test_suffix_skips_literal_taken_names() {
        let mut state = RoomState::new();
        state.create_player(&sid("a"), Some("Bob (1)"));
        state.create_player(&sid("b"), Some("Bob"));

        assert_eq!(
            state.create_player(&sid("c"), Some("Bob")).unwrap(),
            "Bob (2)"
        );
    }

    #[test]
    fn test_double_create_keeps_existing_entity() {
        let mut state = RoomState::new();
        state.create_player(&sid("a"), Some("Alex"));
        state.move_player(&sid("a"), &movement(3.0, 0.5));

        let name = state.create_player(&sid("a"), Some("Other"));
        assert_eq!(name.as_deref(), Some("Alex"));
        assert_eq!(state.len(), 1);
        assert_eq!(state.get(&sid("a")).unwrap().position.x, 3.0);
    }

    #[test]
    fn test_remove_player() {
        let mut state = RoomState::new();
        state.create_player(&sid("a"), None);

        assert!(state.remove_player(&sid("a")).is_some());
        assert!(state.is_empty());
        assert!(state.remove_player(&sid("a")).is_none());
    }

    #[test]
    fn test_move_player_overwrites() {
        let mut state = RoomState::new();
        state.create_player(&sid("a"), None);

        assert!(state.move_player(&sid("a"), &movement(2.0, 0.5)));
        assert!(state.move_player(&sid("a"), &movement(-4.0, 1.5)));

        let player = state.get(&sid("a")).unwrap();
        assert_eq!(player.position, Vector3::new(-4.0, 1.0, 4.0));
        assert_eq!(player.rotation, Vector3::new(0.0, 1.5, 0.0));
    }

    #[test]
    fn test_move_absent_player_is_noop() {
        let mut state = RoomState::new();
        state.create_player(&sid("a"), Some("Alex"));
        let before = state.snapshot();
        state.take_changed();

        assert!(!state.move_player(&sid("ghost"), &movement(9.0, 9.0)));
        assert_eq!(state.snapshot(), before);
        assert!(!state.take_changed());
    }

    #[test]
    fn test_changed_flag() {
        let mut state = RoomState::new();
        assert!(!state.take_changed());

        state.create_player(&sid("a"), None);
        assert!(state.take_changed());
        assert!(!state.take_changed());

        state.remove_player(&sid("missing"));
        assert!(!state.take_changed());

        state.clear();
        assert!(state.take_changed());
        assert!(state.is_empty());
    }
}
