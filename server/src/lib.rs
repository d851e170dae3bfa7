//! # Room Server Library
//!
//! This library provides the authoritative server for a shared multiplayer
//! room. Clients join the room, each player session owns one entity in the
//! shared state, and the server keeps every client's view in sync through
//! targeted broadcasts and periodic state snapshots.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! The server holds the definitive player map. Clients report their own
//! position and rotation, the server overwrites the stored values and relays
//! the update to everyone else.
//!
//! ### Session Lifecycle
//! Handles joining and leaving, including:
//! - Role bookkeeping (`player` or `observer`) per session
//! - Display-name defaults and uniqueness among players
//! - Join/leave announcements in the room chat
//! - Privileged disconnects (kicks) issued by non-player sessions
//!
//! ### State Broadcasting
//! Whenever the player map changes, a full snapshot is replicated to every
//! connected client on the next patch tick.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! Every inbound packet, timeout and patch tick for the room is processed on
//! one loop, in arrival order. Room handlers never suspend, so state and
//! registry mutations never race.
//!
//! ### UDP-Based Communication
//! Packets are `bincode`-encoded [`shared::Packet`] values carried over UDP.
//! The room itself never touches the socket: it queues [`room::Outbound`]
//! commands that a dedicated sender task delivers in order.
//!
//! ## Module Organization
//!
//! ### State Module (`state`)
//! The replicated player map with name resolution and movement updates.
//!
//! ### Registry Module (`registry`)
//! Non-replicated per-session role and display name.
//!
//! ### Room Module (`room`)
//! The room controller: lifecycle, message routing and kick authorization.
//!
//! ### Client Manager Module (`client_manager`)
//! Address to session id mapping, capacity and timeouts for the transport.
//!
//! ### Network Module (`network`)
//! UDP socket tasks and the room event loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     // 16 clients, 20 state patches per second, 10 second timeout
//!     let config = ServerConfig::new(16, 20, 10).with_bind_addr("127.0.0.1:2567");
//!     let mut server = Server::new(config).await?;
//!
//!     // Runs until a shutdown message arrives on `server.shutdown_handle()`
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod network;
pub mod registry;
pub mod room;
pub mod state;
