//! Code shared by the server and the client: the motion model both sides
//! integrate with, the wire protocol, and the timing constants that tie the
//! two halves together.
//!
//! The motion model must stay identical on both ends. The server integrates
//! it authoritatively at [`TICK_RATE_HZ`]; the client runs the very same
//! function every frame to predict its own participant. Any change to
//! [`motion::MotionConfig`] defaults therefore changes both sides at once.

pub mod math;
pub mod motion;
pub mod protocol;

pub use math::{Quat, Vec3};
pub use motion::{MotionConfig, MotionState};
pub use protocol::{
    HandPose, HandTransforms, InputRecord, Packet, ParticipantId, PlayerView, Snapshot,
    PROTOCOL_VERSION,
};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Where every participant appears on connect, in meters.
pub const SPAWN_POINT: [f32; 3] = [0.0, 1.2, 0.0];

/// Server integration rate.
pub const TICK_RATE_HZ: u32 = 60;
/// Server snapshot broadcast rate, independent of the integration rate.
pub const SNAPSHOT_RATE_HZ: u32 = 20;
/// Client input send rate. Inputs are sent even when nothing changed.
pub const INPUT_RATE_HZ: u32 = 30;

pub const CLOCK_PROBE_INTERVAL_MS: u64 = 3000;
/// EMA factor applied to every clock sample after the first.
pub const CLOCK_SMOOTHING: f64 = 0.2;

/// How far behind the corrected server clock remote participants are rendered.
pub const INTERPOLATION_DELAY_MS: u64 = 120;
/// Samples kept per remote participant.
pub const SAMPLE_CAPACITY: usize = 10;
/// Fraction of the predicted/authoritative gap closed per client frame.
pub const RECONCILE_BLEND: f32 = 0.1;

pub const DEFAULT_PORT: u16 = 5174;
pub const MAX_PACKET_SIZE: usize = 8192;

/// Wall-clock milliseconds since the unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// Duration of one period at `rate_hz`, never zero.
pub fn period(rate_hz: u32) -> Duration {
    Duration::from_secs_f64(1.0 / rate_hz.max(1) as f64)
}
