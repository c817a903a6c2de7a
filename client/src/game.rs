//! Client-side view of the shared space
//!
//! [`ClientGameState`] glues the pieces together: it reacts to server
//! packets, runs the per-frame pipeline (input, prediction, interpolation)
//! and builds the input records the network loop sends out. It does no I/O
//! itself, which keeps it easy to drive from tests.

use crate::clock::ClockSync;
use crate::input::{hand_transforms, AxisMapping, InputMapper, RawInput};
use crate::interpolation::RemoteRegistry;
use crate::prediction::PredictionController;
use log::{info, warn};
use shared::math::{quat_to_array, vec3_to_array};
use shared::{
    HandTransforms, InputRecord, MotionConfig, Packet, ParticipantId, Quat, Vec3,
    INTERPOLATION_DELAY_MS,
};
use std::time::Duration;

/// Longest step a single frame may integrate, in seconds
pub const MAX_FRAME_DT: f32 = 0.05;

/// Welcomed clients that hear no snapshot for this long assume the session
/// is gone and connect again.
pub const SERVER_SILENCE_TIMEOUT_MS: u64 = 5000;

/// Identity assigned by the server in `Welcome`
#[derive(Debug, Clone, PartialEq)]
pub struct LocalIdentity {
    pub id: ParticipantId,
    pub name: String,
    pub color: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteView {
    pub id: ParticipantId,
    pub name: String,
    pub color: u32,
    pub position: Vec3,
    pub orientation: Quat,
    pub controllers: Option<HandTransforms>,
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameView {
    /// Server time the remotes are shown at
    pub render_time: f64,
    pub position: Vec3,
    pub orientation: Quat,
    pub hands: HandTransforms,
    /// Sorted by id
    pub remotes: Vec<RemoteView>,
    pub rtt: Option<u64>,
}

/// Receives finished frames. Rendering lives behind this.
pub trait FrameSink {
    fn present(&mut self, frame: &FrameView);
}

/// Sink for headless runs: logs a summary line every `every` frames
pub struct LogSink {
    frames: u64,
    every: u64,
}

impl LogSink {
    pub fn new(every: u64) -> Self {
        Self {
            frames: 0,
            every: every.max(1),
        }
    }
}

impl FrameSink for LogSink {
    fn present(&mut self, frame: &FrameView) {
        self.frames += 1;
        if self.frames % self.every != 0 {
            return;
        }

        let p = frame.position;
        info!(
            "pos [{:.2}, {:.2}, {:.2}] | {} remote(s) | rtt {}",
            p.x,
            p.y,
            p.z,
            frame.remotes.len(),
            frame
                .rtt
                .map(|rtt| format!("{}ms", rtt))
                .unwrap_or_else(|| "-".to_string())
        );
        for remote in &frame.remotes {
            let r = remote.position;
            info!("  {} ({}) at [{:.2}, {:.2}, {:.2}]", remote.name, remote.id, r.x, r.y, r.z);
        }
    }
}

pub struct ClientGameState {
    clock: ClockSync,
    prediction: PredictionController,
    remotes: RemoteRegistry,
    mapper: InputMapper,
    identity: Option<LocalIdentity>,
    /// Latest hand transforms, shared between frames and input records
    hands: HandTransforms,
    /// Snap turns applied locally but not yet reported
    pending_turn: f32,
    interp_delay_ms: f64,
    /// Local time of the last welcome or snapshot
    last_heard: Option<u64>,
}

impl ClientGameState {
    pub fn new(mapping: AxisMapping, motion: MotionConfig, interp_delay: Duration) -> Self {
        Self {
            clock: ClockSync::new(),
            prediction: PredictionController::new(motion),
            remotes: RemoteRegistry::new(),
            mapper: InputMapper::new(mapping),
            identity: None,
            hands: HandTransforms::desktop_fallback(),
            pending_turn: 0.0,
            interp_delay_ms: interp_delay.as_secs_f64() * 1000.0,
            last_heard: None,
        }
    }

    /// Applies one server packet received at local time `received_at`.
    pub fn handle_packet(&mut self, packet: Packet, received_at: u64) {
        match packet {
            Packet::Welcome { id, name, color } => {
                info!("Welcome! Joined as {} ({}), colour #{:06x}", name, id, color);
                if self.identity.as_ref().is_some_and(|me| me.id != id) {
                    self.end_session();
                }
                self.identity = Some(LocalIdentity { id, name, color });
                self.last_heard = Some(received_at);
            }

            Packet::Snapshot(snapshot) => {
                self.last_heard = Some(received_at);
                let self_id = self.identity.as_ref().map(|me| me.id.as_str());
                self.remotes.apply_snapshot(&snapshot, self_id);
                if let Some(id) = self_id {
                    self.prediction.apply_snapshot(&snapshot, id);
                }
            }

            Packet::TimeEcho { c, s } => {
                self.clock.record_echo(c, s, received_at);
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.end_session();
            }

            other => {
                warn!("Unexpected {} packet from server", other.kind());
            }
        }
    }

    /// Drops the session when no snapshot arrived for
    /// [`SERVER_SILENCE_TIMEOUT_MS`]. Returns true if it did.
    pub fn expire_if_silent(&mut self, local_now: u64) -> bool {
        let Some(last_heard) = self.last_heard else {
            return false;
        };
        let silent_for = local_now.saturating_sub(last_heard);
        if self.identity.is_none() || silent_for < SERVER_SILENCE_TIMEOUT_MS {
            return false;
        }

        warn!("No snapshot for {} ms, reconnecting", silent_for);
        self.end_session();
        true
    }

    /// Forgets everything tied to the current connection. The clock starts
    /// over so the next probe sets the offset outright.
    fn end_session(&mut self) {
        self.identity = None;
        self.last_heard = None;
        self.pending_turn = 0.0;
        self.clock = ClockSync::new();
        self.prediction.reset();
        self.remotes = RemoteRegistry::new();
    }

    /// Runs one frame at local time `local_now`.
    ///
    /// Order matters: snap turn, prediction, hands, then remotes at
    /// `server_now - interp_delay`.
    pub fn frame(&mut self, raw: &RawInput, dt: f32, local_now: u64) -> FrameView {
        let dt = dt.clamp(0.0, MAX_FRAME_DT);

        let sample = self.mapper.sample(raw, &self.prediction.orientation());
        if sample.turn != 0.0 {
            self.prediction.apply_turn(sample.turn);
            self.pending_turn += sample.turn;
        }
        self.prediction.step(dt, sample.thrust, sample.fast);
        self.hands = hand_transforms(raw);

        let render_time = self.clock.corrected(local_now) - self.interp_delay_ms;
        self.remotes.update(render_time);

        let mut remotes: Vec<RemoteView> = self
            .remotes
            .iter()
            .map(|remote| RemoteView {
                id: remote.id.clone(),
                name: remote.name.clone(),
                color: remote.color,
                position: remote.position,
                orientation: remote.orientation,
                controllers: remote.controllers.clone(),
            })
            .collect();
        remotes.sort_by(|a, b| a.id.cmp(&b.id));

        FrameView {
            render_time,
            position: self.prediction.position(),
            orientation: sample.orientation,
            hands: self.hands.clone(),
            remotes,
            rtt: self.clock.rtt(),
        }
    }

    /// Builds the next input record, or `None` before the server welcomed us.
    pub fn input_record(&mut self, raw: &RawInput, local_now: u64) -> Option<InputRecord> {
        self.identity.as_ref()?;

        let sample = self.mapper.map_motion(raw, &self.prediction.orientation());
        let turn = std::mem::take(&mut self.pending_turn);

        Some(InputRecord {
            t: local_now,
            thrust: vec3_to_array(&sample.thrust),
            fast: sample.fast,
            turn: (turn != 0.0).then_some(turn),
            quat: Some(quat_to_array(&sample.orientation)),
            controllers: Some(self.hands.clone()),
        })
    }

    pub fn identity(&self) -> Option<&LocalIdentity> {
        self.identity.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.identity.is_some()
    }

    pub fn clock(&self) -> &ClockSync {
        &self.clock
    }

    pub fn prediction(&self) -> &PredictionController {
        &self.prediction
    }

    pub fn remotes(&self) -> &RemoteRegistry {
        &self.remotes
    }
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new(
            AxisMapping::standard(),
            MotionConfig::default(),
            Duration::from_millis(INTERPOLATION_DELAY_MS),
        )
    }
}
