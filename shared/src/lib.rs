use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Connection identifier assigned by the server when a client joins.
pub type SessionId = String;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Join {
        options: JoinOptions,
    },
    Message {
        message: String,
    },
    Move {
        position: Vector3,
        rotation: Vector3,
    },
    Kick {
        session_id: SessionId,
    },
    Heartbeat,
    Leave,

    Joined {
        session_id: SessionId,
    },
    Rejected {
        reason: String,
    },
    Chat {
        sender: String,
        message: String,
    },
    PlayerMoved {
        id: SessionId,
        position: Vector3,
        rotation: Vector3,
    },
    State {
        players: HashMap<SessionId, Player>,
    },
    Disconnected {
        reason: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Player {
    pub position: Vector3,
    pub rotation: Vector3,
    pub name: Option<String>,
}

impl Player {
    pub fn new(name: Option<String>) -> Self {
        Self {
            position: Vector3::default(),
            rotation: Vector3::default(),
            name,
        }
    }

    /// Overwrites position and rotation with the values carried by `movement`.
    pub fn apply_movement(&mut self, movement: &Movement) {
        self.position = movement.position;
        self.rotation = movement.rotation;
    }
}

/// Authoritative position/rotation update sent by the owning session.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Movement {
    pub position: Vector3,
    pub rotation: Vector3,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Player,
    Observer,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct JoinOptions {
    pub role: Option<Role>,
    pub name: Option<String>,
}

impl JoinOptions {
    pub fn player(name: impl Into<String>) -> Self {
        Self {
            role: Some(Role::Player),
            name: Some(name.into()),
        }
    }

    pub fn observer() -> Self {
        Self {
            role: Some(Role::Observer),
            name: None,
        }
    }
}
