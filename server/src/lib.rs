//! # Participant Sync Server
//!
//! Authoritative server for the shared 3D space. It owns the true position of
//! every connected participant, integrates their motion from the control
//! inputs they send, and broadcasts compact snapshots for clients to
//! reconcile and interpolate against.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Motion
//! Positions are integrated here with the shared motion model at a fixed
//! tick rate. Each participant's most recent input is reused every tick
//! until a newer one arrives, so a late or lost input never stalls anyone.
//! Orientation is the exception: it is adopted verbatim from the client.
//!
//! ### Connection Lifecycle
//! A `Connect` datagram allocates a participant at the spawn point and is
//! answered with a `Welcome`. Leaving, whether by `Disconnect` or by going
//! silent past the timeout, removes the participant and triggers an
//! immediate snapshot so peers see the departure without waiting for the
//! next broadcast.
//!
//! ### Snapshot Broadcasting
//! Snapshots go out at their own cadence (20Hz by default), decoupled from
//! the 60Hz integration tick. Bandwidth stays low while motion stays smooth.
//!
//! ### Clock Probes
//! `TimeProbe { c }` is echoed back as `TimeEcho { c, s }` with the server
//! clock, letting clients estimate their offset from server time.
//!
//! ## Module Organization
//!
//! - `connections`: address to participant mapping and liveness
//! - `simulation`: participant records, integration and snapshots
//! - `network`: UDP transport and the single-task event loop
//! - `health`: HTTP health endpoint
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("0.0.0.0:5174", ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod connections;
pub mod health;
pub mod network;
pub mod simulation;

use shared::{MotionConfig, SNAPSHOT_RATE_HZ, TICK_RATE_HZ};
use std::time::Duration;

/// Tunables of a running server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Integration ticks per second
    pub tick_rate: u32,
    /// Scheduled snapshot broadcasts per second
    pub snapshot_rate: u32,
    pub max_clients: usize,
    /// Silence after which a participant is dropped
    pub client_timeout: Duration,
    pub motion: MotionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE_HZ,
            snapshot_rate: SNAPSHOT_RATE_HZ,
            max_clients: 32,
            client_timeout: Duration::from_secs(5),
            motion: MotionConfig::default(),
        }
    }
}
