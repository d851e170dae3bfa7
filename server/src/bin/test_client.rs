//! Interactive command-line client for poking at a running room server
//!
//! Lines typed on stdin are sent as chat. Commands:
//! - `/move x y z [rx ry rz]` sends a movement update
//! - `/kick <session id>` asks the server to disconnect someone
//! - `/quit` leaves the room

use bincode::{deserialize, serialize};
use clap::{Parser, ValueEnum};
use shared::{JoinOptions, Packet, Role, Vector3};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Player,
    Observer,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:2567")]
    server: String,

    /// Role to join with
    #[arg(short, long, value_enum)]
    role: Option<RoleArg>,

    /// Display name
    #[arg(short, long)]
    name: Option<String>,
}

fn parse_command(line: &str) -> Option<Packet> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "/move" => {
            let values: Vec<f32> = parts.filter_map(|v| v.parse().ok()).collect();
            let component = |i: usize| values.get(i).copied().unwrap_or(0.0);
            Some(Packet::Move {
                position: Vector3::new(component(0), component(1), component(2)),
                rotation: Vector3::new(component(3), component(4), component(5)),
            })
        }
        "/kick" => Some(Packet::Kick {
            session_id: parts.next()?.to_string(),
        }),
        "/quit" => Some(Packet::Leave),
        _ => Some(Packet::Message {
            message: line.to_string(),
        }),
    }
}

async fn send(socket: &UdpSocket, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
    socket.send(&serialize(packet)?).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let server_addr: SocketAddr = args.server.parse()?;

    let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
    socket.connect(server_addr).await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    let options = JoinOptions {
        role: args.role.map(|role| match role {
            RoleArg::Player => Role::Player,
            RoleArg::Observer => Role::Observer,
        }),
        name: args.name,
    };
    println!("Joining {} with {:?}", server_addr, options);
    send(&socket, &Packet::Join { options }).await?;

    let receiver = Arc::clone(&socket);
    tokio::spawn(async move {
        let mut buf = vec![0u8; 65536];
        loop {
            let len = match receiver.recv(&mut buf).await {
                Ok(len) => len,
                Err(e) => {
                    println!("Error receiving: {}", e);
                    continue;
                }
            };

            match deserialize::<Packet>(&buf[..len]) {
                Ok(Packet::Joined { session_id }) => println!("Joined as {}", session_id),
                Ok(Packet::Chat { sender, message }) => println!("[{}] {}", sender, message),
                Ok(Packet::PlayerMoved { id, position, .. }) => {
                    println!("{} moved to ({}, {}, {})", id, position.x, position.y, position.z)
                }
                Ok(Packet::State { players }) => {
                    println!("State: {} players", players.len());
                    for (id, player) in players {
                        println!("  {} {:?} at {:?}", id, player.name, player.position);
                    }
                }
                Ok(Packet::Rejected { reason }) | Ok(Packet::Disconnected { reason }) => {
                    println!("Disconnected: {}", reason);
                    std::process::exit(0);
                }
                Ok(other) => println!("Unexpected packet: {:?}", other),
                Err(e) => println!("Failed to deserialize packet: {}", e),
            }
        }
    });

    let heartbeat = Arc::clone(&socket);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(2));
        loop {
            interval.tick().await;
            if let Ok(data) = serialize(&Packet::Heartbeat) {
                let _ = heartbeat.send(&data).await;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(packet) = parse_command(line.trim()) else {
            continue;
        };
        let leaving = matches!(packet, Packet::Leave);
        send(&socket, &packet).await?;
        if leaving {
            break;
        }
    }

    println!("Test client finished");
    Ok(())
}
