//! Room controller: session lifecycle and inbound message routing
//!
//! A [`Room`] owns the replicated [`RoomState`] and the non-replicated
//! [`SessionRegistry`] for its whole lifetime. The hosting transport drives it
//! through the [`RoomHandler`] lifecycle and receives everything the room wants
//! delivered as [`Outbound`] commands on an unbounded channel, in the order the
//! room issued them.
//!
//! All handlers run to completion synchronously. The transport is expected to
//! call them one at a time, so state and registry mutations never interleave.

use crate::config::ServerConfig;
use crate::registry::{SessionInfo, SessionRegistry};
use crate::state::RoomState;
use log::{debug, error, info, warn};
use shared::{JoinOptions, Movement, Packet, Player, Role, SessionId};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

/// Sender tag for server-generated chat lines.
pub const SYSTEM_SENDER: &str = "system";
/// Sender tag for chat from a session with no registry entry.
pub const UNKNOWN_SENDER: &str = "observer";
/// Reason delivered to a kicked session.
pub const KICK_REASON: &str = "Kicked from room";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    Created,
    Active,
    Disposed,
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            RoomPhase::Created => "created",
            RoomPhase::Active => "active",
            RoomPhase::Disposed => "disposed",
        };
        f.write_str(phase)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RoomError {
    #[error("Room is {0} and does not accept joins")]
    NotActive(RoomPhase),

    #[error("Session {0} has already joined")]
    AlreadyJoined(SessionId),
}

/// Inbound room messages, one per client message type
#[derive(Debug, Clone, PartialEq)]
pub enum RoomMessage {
    /// Chat passthrough to every other session
    Chat { message: String },
    /// Authoritative position/rotation overwrite
    Move(Movement),
    /// Privileged disconnect of another session
    Kick { session_id: SessionId },
}

/// Commands from the room to the transport
#[derive(Debug)]
pub enum Outbound {
    Send {
        session_id: SessionId,
        packet: Packet,
    },
    Broadcast {
        packet: Packet,
        except: Option<SessionId>,
    },
    Disconnect {
        session_id: SessionId,
        reason: String,
    },
}

/// Handle the room uses to queue outbound commands
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Broadcaster {
    pub fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, session_id: &SessionId, packet: Packet) {
        self.queue(Outbound::Send {
            session_id: session_id.clone(),
            packet,
        });
    }

    /// Queues `packet` for every connected session except `except`.
    pub fn broadcast(&self, packet: Packet, except: Option<&SessionId>) {
        self.queue(Outbound::Broadcast {
            packet,
            except: except.cloned(),
        });
    }

    pub fn disconnect(&self, session_id: &SessionId, reason: &str) {
        self.queue(Outbound::Disconnect {
            session_id: session_id.clone(),
            reason: reason.to_string(),
        });
    }

    fn queue(&self, command: Outbound) {
        if let Err(e) = self.tx.send(command) {
            error!("Failed to queue outbound command: {}", e);
        }
    }
}

/// Lifecycle the hosting transport drives a room through
pub trait RoomHandler {
    /// Allocates state and starts accepting joins. Runs once.
    fn on_create(&mut self, config: &ServerConfig);

    fn on_join(&mut self, session_id: &SessionId, options: JoinOptions) -> Result<(), RoomError>;

    /// Cleanup for a session that is gone; the transport calls it once per session.
    fn on_leave(&mut self, session_id: &SessionId);

    fn on_message(&mut self, session_id: &SessionId, message: RoomMessage);

    /// Releases everything; the room ignores all later calls.
    fn on_dispose(&mut self);
}

pub struct Room {
    phase: RoomPhase,
    state: RoomState,
    sessions: SessionRegistry,
    broadcaster: Broadcaster,
}

impl Room {
    pub fn new(broadcaster: Broadcaster) -> Self {
        Self {
            phase: RoomPhase::Created,
            state: RoomState::new(),
            sessions: SessionRegistry::new(),
            broadcaster,
        }
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    pub fn state(&self) -> &RoomState {
        &self.state
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// True while `session_id` is joined (between on_join and on_leave).
    pub fn has_session(&self, session_id: &SessionId) -> bool {
        self.sessions.contains(session_id)
    }

    pub fn snapshot(&self) -> HashMap<SessionId, Player> {
        self.state.snapshot()
    }

    pub fn take_state_changed(&mut self) -> bool {
        self.state.take_changed()
    }

    fn system_chat(&self, message: String) {
        self.broadcaster.broadcast(
            Packet::Chat {
                sender: SYSTEM_SENDER.to_string(),
                message,
            },
            None,
        );
    }

    fn handle_chat(&self, session_id: &SessionId, message: String) {
        let sender = self
            .sessions
            .get(session_id)
            .map(|info| info.display_name.clone())
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string());

        self.broadcaster
            .broadcast(Packet::Chat { sender, message }, Some(session_id));
    }

    fn handle_move(&mut self, session_id: &SessionId, movement: Movement) {
        if !self.state.move_player(session_id, &movement) {
            debug!("Ignoring movement from {} without a player", session_id);
        }

        self.broadcaster.broadcast(
            Packet::PlayerMoved {
                id: session_id.clone(),
                position: movement.position,
                rotation: movement.rotation,
            },
            Some(session_id),
        );
    }

    /// Only sessions without a player entity may kick.
    fn handle_kick(&mut self, session_id: &SessionId, target: &SessionId) {
        if self.state.contains(session_id) {
            warn!("Unauthorized kick attempt by {}", session_id);
            return;
        }

        if !self.sessions.contains(target) {
            warn!("Invalid kick request for {}", target);
            return;
        }

        self.broadcaster.disconnect(target, KICK_REASON);
        info!("Player {} was kicked by {}", target, session_id);
        self.on_leave(target);
    }
}

impl RoomHandler for Room {
    fn on_create(&mut self, config: &ServerConfig) {
        if self.phase != RoomPhase::Created {
            warn!("Ignoring create for a room that is {}", self.phase);
            return;
        }

        self.state = RoomState::new();
        self.sessions = SessionRegistry::new();
        self.phase = RoomPhase::Active;
        info!("Room created! {:?}", config);
    }

    fn on_join(&mut self, session_id: &SessionId, options: JoinOptions) -> Result<(), RoomError> {
        if self.phase != RoomPhase::Active {
            return Err(RoomError::NotActive(self.phase));
        }
        if self.sessions.contains(session_id) {
            return Err(RoomError::AlreadyJoined(session_id.clone()));
        }

        info!("{} joined with options: {:?}", session_id, options);
        let info = SessionInfo::new(options.role, options.name.as_deref());

        match options.role {
            Some(Role::Player) => {
                // The registry keeps the requested name; only the entity is suffixed
                let resolved = self
                    .state
                    .create_player(session_id, Some(info.display_name.as_str()))
                    .unwrap_or_else(|| info.display_name.clone());
                let announcement = format!("{} : joined the chat.", resolved);
                self.sessions.set(session_id.clone(), info);
                self.system_chat(announcement);
            }
            Some(Role::Observer) => {
                info!("Observer {} added to the server control", session_id);
                self.sessions.set(session_id.clone(), info);
            }
            None => {
                info!("Session {} joined without a role", session_id);
                self.sessions.set(session_id.clone(), info);
            }
        }

        Ok(())
    }

    fn on_leave(&mut self, session_id: &SessionId) {
        if self.phase != RoomPhase::Active {
            warn!("Ignoring leave of {} from a room that is {}", session_id, self.phase);
            return;
        }

        info!("{} left!", session_id);

        match self.sessions.get(session_id) {
            Some(info) if info.is_player() => {
                self.system_chat(format!("{} : left the chat.", info.display_name));
                self.state.remove_player(session_id);
            }
            Some(info) if info.role == Some(Role::Observer) => {
                info!("Observer {} disconnected", session_id);
            }
            _ => {}
        }

        self.sessions.delete(session_id);
    }

    fn on_message(&mut self, session_id: &SessionId, message: RoomMessage) {
        if self.phase != RoomPhase::Active {
            warn!("Ignoring message from {} in a room that is {}", session_id, self.phase);
            return;
        }

        match message {
            RoomMessage::Chat { message } => self.handle_chat(session_id, message),
            RoomMessage::Move(movement) => self.handle_move(session_id, movement),
            RoomMessage::Kick { session_id: target } => self.handle_kick(session_id, &target),
        }
    }

    fn on_dispose(&mut self) {
        if self.phase == RoomPhase::Disposed {
            return;
        }

        info!("Dispose Room");
        self.state.clear();
        self.sessions.clear();
        self.phase = RoomPhase::Disposed;
    }
}
