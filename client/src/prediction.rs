//! Local client-side prediction with soft reconciliation.
//!
//! The local participant is moved every frame with the same motion model the
//! server runs, so input takes effect immediately. Snapshots then provide an
//! authoritative position, and each step pulls the predicted position a fixed
//! fraction of the way toward it. There is no input history and no replay.

use shared::math::{vec3_from_array, yaw_rotation};
use shared::{MotionConfig, MotionState, Quat, Snapshot, Vec3, RECONCILE_BLEND, SPAWN_POINT};

pub struct PredictionController {
    motion: MotionConfig,
    state: MotionState,
    /// Yaw of the local rig, changed only by snap turns.
    orientation: Quat,
    authoritative: Option<Vec3>,
    blend: f32,
}

impl PredictionController {
    pub fn new(motion: MotionConfig) -> Self {
        Self {
            motion,
            state: MotionState::at_rest(vec3_from_array(SPAWN_POINT)),
            orientation: Quat::identity(),
            authoritative: None,
            blend: RECONCILE_BLEND,
        }
    }

    pub fn with_blend(mut self, blend: f32) -> Self {
        self.blend = blend.clamp(0.0, 1.0);
        self
    }

    /// Runs one local step: integrate, advance, then reconcile.
    pub fn step(&mut self, dt: f32, thrust: Vec3, fast: bool) {
        self.motion.step(&mut self.state, thrust, fast, dt);
        self.reconcile();
    }

    /// Rotates the rig about the vertical axis. Positive degrees turn right.
    pub fn apply_turn(&mut self, degrees: f32) {
        if degrees == 0.0 {
            return;
        }
        self.orientation = yaw_rotation(-degrees.to_radians()) * self.orientation;
    }

    pub fn set_authoritative(&mut self, position: Vec3) {
        self.authoritative = Some(position);
    }

    /// Takes the local participant's entry from `snapshot` as the new target.
    ///
    /// Returns false when the snapshot does not mention `self_id`.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot, self_id: &str) -> bool {
        match snapshot.find(self_id) {
            Some(view) => {
                self.set_authoritative(vec3_from_array(view.position));
                true
            }
            None => false,
        }
    }

    /// Moves the predicted position `blend` of the way toward the target.
    pub fn reconcile(&mut self) {
        if let Some(target) = self.authoritative {
            self.state.position = self.state.position.lerp(&target, self.blend);
        }
    }

    /// Drops the target and returns to spawn, as after losing the connection.
    pub fn reset(&mut self) {
        self.state = MotionState::at_rest(vec3_from_array(SPAWN_POINT));
        self.authoritative = None;
    }

    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.state.velocity
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn authoritative(&self) -> Option<Vec3> {
        self.authoritative
    }

    pub fn state_mut(&mut self) -> &mut MotionState {
        &mut self.state
    }
}

impl Default for PredictionController {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}
