//! Per-session metadata that is never replicated to clients

use shared::{Role, SessionId};
use std::collections::HashMap;

/// Display name recorded when a session joins without one.
pub const DEFAULT_DISPLAY_NAME: &str = "Observer";

#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    /// Role given at join; `None` gets observer treatment
    pub role: Option<Role>,
    pub display_name: String,
}

impl SessionInfo {
    pub fn new(role: Option<Role>, display_name: Option<&str>) -> Self {
        let display_name = match display_name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => DEFAULT_DISPLAY_NAME.to_string(),
        };
        Self { role, display_name }
    }

    pub fn is_player(&self) -> bool {
        self.role == Some(Role::Player)
    }
}

/// Metadata for every joined session, players and observers alike
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, SessionInfo>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, session_id: SessionId, info: SessionInfo) {
        self.sessions.insert(session_id, info);
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&SessionInfo> {
        self.sessions.get(session_id)
    }

    pub fn delete(&mut self, session_id: &SessionId) -> Option<SessionInfo> {
        self.sessions.remove(session_id)
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn session_ids(&self) -> impl Iterator<Item = &SessionId> {
        self.sessions.keys()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }
}
