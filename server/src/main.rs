use clap::Parser;
use log::{error, info};
use server::health;
use server::network::{Server, ServerMessage};
use server::ServerConfig;
use shared::{MotionConfig, DEFAULT_PORT, SNAPSHOT_RATE_HZ, TICK_RATE_HZ};
use std::time::Duration;
use tokio::net::TcpListener;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Port for the UDP game socket and the TCP health endpoint
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Simulation ticks per second
    #[arg(short, long, default_value_t = TICK_RATE_HZ)]
    tick_rate: u32,
    /// Snapshot broadcasts per second
    #[arg(short, long, default_value_t = SNAPSHOT_RATE_HZ)]
    snapshot_rate: u32,
    /// Maximum concurrent participants
    #[arg(short, long, default_value = "32")]
    max_clients: usize,
    /// Seconds of silence before a participant is dropped
    #[arg(long, default_value = "5")]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig {
        tick_rate: args.tick_rate,
        snapshot_rate: args.snapshot_rate,
        max_clients: args.max_clients,
        client_timeout: Duration::from_secs(args.timeout_secs),
        motion: MotionConfig::default(),
    };

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, config).await?;

    let health_listener = TcpListener::bind(&address).await?;
    tokio::spawn(async move {
        if let Err(e) = health::serve(health_listener).await {
            error!("Health endpoint stopped: {}", e);
        }
    });

    // Handle shutdown gracefully
    let shutdown = server.message_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            let _ = shutdown.send(ServerMessage::Shutdown);
        }
    });

    server.run().await
}
