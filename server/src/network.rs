//! Server network layer handling UDP communications and the room event loop

use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::room::{Broadcaster, Outbound, Room, RoomHandler, RoomMessage};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{JoinOptions, Movement, Packet, SessionId};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Reason sent to a client that joins a full room.
pub const ROOM_FULL_REASON: &str = "Room is full";
/// Reason sent to every client when the server stops.
pub const SHUTDOWN_REASON: &str = "Server shutting down";

const RECV_BUFFER_SIZE: usize = 65536;

/// Messages sent from network tasks to the room event loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { session_id: SessionId },
    Shutdown,
}

/// Maps a client packet to the room message it carries, if any.
pub fn room_message(packet: Packet) -> Option<RoomMessage> {
    match packet {
        Packet::Message { message } => Some(RoomMessage::Chat { message }),
        Packet::Move { position, rotation } => {
            Some(RoomMessage::Move(Movement { position, rotation }))
        }
        Packet::Kick { session_id } => Some(RoomMessage::Kick { session_id }),
        _ => None,
    }
}

/// Hosts one room over UDP
///
/// Inbound packets, timeouts and replication ticks are all handled on a single
/// loop, so the room sees one event at a time in arrival order.
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    room: Room,
    config: ServerConfig,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    broadcaster: Broadcaster,
    outbound_rx: Option<mpsc::UnboundedReceiver<Outbound>>,
}

impl Server {
    pub async fn new(
        config: ServerConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let socket = Arc::new(UdpSocket::bind(&config.bind_addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (broadcaster, outbound_rx) = Broadcaster::channel();

        let mut room = Room::new(broadcaster.clone());
        room.on_create(&config);

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_clients))),
            room,
            config,
            server_tx,
            server_rx,
            broadcaster,
            outbound_rx: Some(outbound_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Sender that stops the event loop when given [`ServerMessage::Shutdown`].
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; RECV_BUFFER_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that delivers the room's outbound commands in order
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let Some(mut outbound_rx) = self.outbound_rx.take() else {
            warn!("Network sender already running");
            return;
        };

        tokio::spawn(async move {
            while let Some(command) = outbound_rx.recv().await {
                match command {
                    Outbound::Send { session_id, packet } => {
                        let addr = clients.read().await.addr_of(&session_id);
                        match addr {
                            Some(addr) => {
                                if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await
                                {
                                    error!("Failed to send packet to {}: {}", session_id, e);
                                }
                            }
                            None => debug!("Dropping packet for unknown session {}", session_id),
                        }
                    }
                    Outbound::Broadcast { packet, except } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (session_id, addr) in client_addrs {
                            if except.as_ref() == Some(&session_id) {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", session_id, e);
                            }
                        }
                    }
                    Outbound::Disconnect { session_id, reason } => {
                        let addr = {
                            let mut clients_guard = clients.write().await;
                            let addr = clients_guard.addr_of(&session_id);
                            clients_guard.remove_client(&session_id);
                            addr
                        };

                        if let Some(addr) = addr {
                            let packet = Packet::Disconnected { reason };
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to notify {} of disconnect: {}", session_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();
        let timeout = self.config.client_timeout;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts(timeout)
                };

                for session_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { session_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    /// Processes incoming packets and routes them to the room
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        let session_id = self.clients.write().await.touch(addr);

        match packet {
            Packet::Join { options } => self.handle_join(options, session_id, addr).await,

            Packet::Leave => {
                if let Some(session_id) = session_id {
                    self.drop_session(&session_id).await;
                }
            }

            Packet::Heartbeat => {}

            packet => {
                let Some(session_id) = session_id else {
                    warn!("Packet from unknown client at {}", addr);
                    return;
                };
                if !self.room.has_session(&session_id) {
                    warn!("Ignoring packet from {} which is not in the room", session_id);
                    return;
                }

                match room_message(packet) {
                    Some(message) => self.room.on_message(&session_id, message),
                    None => warn!("Unexpected packet type from client {}", session_id),
                }
            }
        }
    }

    async fn handle_join(
        &mut self,
        options: JoinOptions,
        existing: Option<SessionId>,
        addr: SocketAddr,
    ) {
        // A second join from the same address replaces the old session
        if let Some(existing) = existing {
            info!("Replacing session {} from {}", existing, addr);
            self.drop_session(&existing).await;
        }

        let session_id = {
            let mut clients = self.clients.write().await;
            clients.add_client(addr)
        };

        let Some(session_id) = session_id else {
            let packet = Packet::Rejected {
                reason: ROOM_FULL_REASON.to_string(),
            };
            if let Err(e) = Self::send_packet_impl(&self.socket, &packet, addr).await {
                error!("Failed to reject {}: {}", addr, e);
            }
            return;
        };

        self.broadcaster.send(
            &session_id,
            Packet::Joined {
                session_id: session_id.clone(),
            },
        );

        if let Err(e) = self.room.on_join(&session_id, options) {
            warn!("Join of {} refused: {}", session_id, e);
            self.broadcaster.disconnect(&session_id, &e.to_string());
            return;
        }

        self.broadcaster.send(
            &session_id,
            Packet::State {
                players: self.room.snapshot(),
            },
        );
    }

    /// Forgets the client and runs the room's leave path once
    async fn drop_session(&mut self, session_id: &SessionId) {
        self.clients.write().await.remove_client(session_id);
        if self.room.has_session(session_id) {
            self.room.on_leave(session_id);
        }
    }

    /// Broadcasts the player map if it changed since the last tick
    fn replicate_state(&mut self) {
        if !self.room.take_state_changed() {
            return;
        }

        let players = self.room.snapshot();
        debug!("Replicating state with {} players", players.len());
        self.broadcaster.broadcast(Packet::State { players }, None);
    }

    /// Disconnects everyone and disposes the room
    async fn shutdown(&mut self) {
        info!("Server shutting down");

        let client_addrs = {
            let mut clients = self.clients.write().await;
            let addrs = clients.get_client_addrs();
            for (session_id, _) in &addrs {
                clients.remove_client(session_id);
            }
            addrs
        };

        let packet = Packet::Disconnected {
            reason: SHUTDOWN_REASON.to_string(),
        };
        for (session_id, addr) in client_addrs {
            if let Err(e) = Self::send_packet_impl(&self.socket, &packet, addr).await {
                error!("Failed to notify {} of shutdown: {}", session_id, e);
            }
        }

        self.room.on_dispose();
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut patch_interval = interval(self.config.patch_interval);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { session_id }) => {
                            info!("Client {} timed out", session_id);
                            if self.room.has_session(&session_id) {
                                self.room.on_leave(&session_id);
                            }
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            self.shutdown().await;
                            break;
                        }
                    }
                },

                _ = patch_interval.tick() => {
                    self.replicate_state();
                },
            }
        }

        Ok(())
    }
}
