//! # Participant Sync Client
//!
//! Headless client for the shared 3D space. It connects to the
//! authoritative server, predicts its own motion locally and shows everyone
//! else slightly in the past, smoothly interpolated between snapshots.
//!
//! ## Architecture Overview
//!
//! ### Client-Side Prediction
//! The local participant moves immediately with the same motion model the
//! server runs. When a snapshot reports the authoritative position, the
//! prediction is pulled a fixed fraction of the way toward it every frame.
//! There is no input replay; the pull is soft and continuous.
//!
//! ### Remote Interpolation
//! Each remote participant keeps a short history of snapshot samples. They
//! are rendered at `server_now - delay`, blending between the two samples
//! that bracket that time and holding the nearest one at the edges.
//!
//! ### Clock Synchronization
//! Periodic probes measure round-trip time and estimate the offset between
//! the local and server clocks, smoothed with an exponential moving average.
//!
//! ## Module Organization
//!
//! - `clock`: server clock offset estimation
//! - `prediction`: local motion and soft reconciliation
//! - `interpolation`: per-remote sample buffers and the remote registry
//! - `input`: axis mapping, snap turns and input sources
//! - `game`: per-frame pipeline and packet handling, no I/O
//! - `network`: UDP socket and the client event loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::LogSink;
//! use client::input::{Script, ScriptedInput};
//! use client::network::Client;
//! use client::ClientConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new(
//!         ClientConfig::default(),
//!         Box::new(ScriptedInput::new(Script::Circle)),
//!         Box::new(LogSink::new(60)),
//!     )
//!     .await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod game;
pub mod input;
pub mod interpolation;
pub mod network;
pub mod prediction;

use input::AxisMapping;
use shared::{MotionConfig, DEFAULT_PORT, INPUT_RATE_HZ, INTERPOLATION_DELAY_MS};
use std::time::Duration;

/// Tunables of a running client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address as `host:port`
    pub server_addr: String,
    /// Simulated round trip; half is added in each direction
    pub fake_ping_ms: u64,
    /// Input records sent per second
    pub input_rate: u32,
    /// Frames per second
    pub frame_rate: u32,
    /// How far behind server time remotes are shown
    pub interp_delay: Duration,
    pub mapping: AxisMapping,
    pub motion: MotionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            fake_ping_ms: 0,
            input_rate: INPUT_RATE_HZ,
            frame_rate: 60,
            interp_delay: Duration::from_millis(INTERPOLATION_DELAY_MS),
            mapping: AxisMapping::standard(),
            motion: MotionConfig::default(),
        }
    }
}
