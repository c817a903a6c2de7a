use clap::Parser;
use client::game::LogSink;
use client::input::{MappingPreset, Script, ScriptedInput};
use client::network::{Client, ClientMessage};
use client::ClientConfig;
use log::info;
use shared::{INPUT_RATE_HZ, INTERPOLATION_DELAY_MS};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:5174")]
    server: String,

    /// Simulate network latency in milliseconds (round trip)
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Input records sent per second
    #[arg(long, default_value_t = INPUT_RATE_HZ)]
    input_rate: u32,

    /// Frames per second
    #[arg(long, default_value = "60")]
    frame_rate: u32,

    /// Remote interpolation delay in milliseconds
    #[arg(long, default_value_t = INTERPOLATION_DELAY_MS)]
    interp_delay: u64,

    /// Controller axis mapping
    #[arg(short = 'm', long, value_enum, default_value = "standard")]
    axis_mapping: MappingPreset,

    /// Scripted movement driving this client
    #[arg(long, value_enum, default_value = "circle")]
    script: Script,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }
    info!("Input: {:?} script, {:?} mapping", args.script, args.axis_mapping);

    let config = ClientConfig {
        server_addr: args.server,
        fake_ping_ms: args.fake_ping,
        input_rate: args.input_rate,
        frame_rate: args.frame_rate,
        interp_delay: Duration::from_millis(args.interp_delay),
        mapping: args.axis_mapping.mapping(),
        ..ClientConfig::default()
    };
    let log_every = config.frame_rate.max(1) as u64;

    let mut client = Client::new(
        config,
        Box::new(ScriptedInput::new(args.script)),
        Box::new(LogSink::new(log_every)),
    )
    .await?;

    let shutdown = client.message_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown.send(ClientMessage::Shutdown);
        }
    });

    client.run().await?;

    Ok(())
}
