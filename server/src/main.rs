use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::{Server, ServerMessage};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "2567")]
    port: u16,

    /// Maximum number of clients in the room
    #[arg(short, long, default_value_t = ServerConfig::DEFAULT_MAX_CLIENTS)]
    max_clients: usize,

    /// State patches per second
    #[arg(long, default_value_t = ServerConfig::DEFAULT_PATCH_RATE)]
    patch_rate: u32,

    /// Seconds without packets before a client is dropped
    #[arg(long, default_value_t = ServerConfig::DEFAULT_CLIENT_TIMEOUT_SECS)]
    client_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = ServerConfig::new(args.max_clients, args.patch_rate, args.client_timeout)
        .with_bind_addr(format!("{}:{}", args.host, args.port));

    info!("Starting room server...");
    info!(
        "Max clients: {}, patch rate: {}Hz, client timeout: {}s",
        args.max_clients, args.patch_rate, args.client_timeout
    );

    let mut server = Server::new(config).await?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, game server is going down");
                if let Err(e) = shutdown.send(ServerMessage::Shutdown) {
                    error!("Failed to request shutdown: {}", e);
                }
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    server.run().await?;

    Ok(())
}
