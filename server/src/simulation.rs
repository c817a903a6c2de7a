//! Authoritative participant state and fixed-timestep integration.

use log::{debug, info};
use rand::distributions::Alphanumeric;
use rand::Rng;
use shared::math::{quat_from_array, quat_to_array, vec3_from_array, vec3_to_array};
use shared::{
    InputRecord, MotionConfig, MotionState, ParticipantId, PlayerView, Quat, Snapshot, Vec3,
    SPAWN_POINT,
};
use std::collections::HashMap;

const IDENTITY_LEN: usize = 16;

/// Server-side record of one connected participant.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    /// Velocity stays on the server; only position goes out in snapshots.
    pub motion: MotionState,
    /// Adopted verbatim from the client's inputs.
    pub orientation: Quat,
    pub color: u32,
    pub name: String,
    /// Last input received, reused every tick until replaced.
    pub input: InputRecord,
}

impl Participant {
    pub fn spawn(id: ParticipantId, color: u32, name: String) -> Self {
        Self {
            id,
            motion: MotionState::at_rest(vec3_from_array(SPAWN_POINT)),
            orientation: Quat::identity(),
            color,
            name,
            input: InputRecord::default(),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.motion.position
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id.clone(),
            position: vec3_to_array(&self.motion.position),
            quaternion: Some(quat_to_array(&self.orientation)),
            color: self.color,
            name: self.name.clone(),
            controllers: self.input.controllers.clone(),
        }
    }
}

/// Owns every participant and advances them in lockstep.
///
/// Iteration order for snapshots is join order.
pub struct ServerSimulation {
    participants: HashMap<ParticipantId, Participant>,
    join_order: Vec<ParticipantId>,
    motion: MotionConfig,
    pub tick: u64,
}

impl ServerSimulation {
    pub fn new(motion: MotionConfig) -> Self {
        Self {
            participants: HashMap::new(),
            join_order: Vec::new(),
            motion,
            tick: 0,
        }
    }

    /// Spawns a participant with a fresh identity, random colour and name.
    pub fn add_participant<R: Rng>(&mut self, rng: &mut R) -> &Participant {
        let mut id = random_identity(rng);
        while self.participants.contains_key(&id) {
            id = random_identity(rng);
        }
        let color = rng.gen_range(0..=0xff_ffff);
        let name = format!("cube_{:04}", rng.gen_range(0..10_000));

        self.insert(Participant::spawn(id, color, name))
    }

    /// Inserts an already-built participant, replacing any with the same id.
    pub fn insert(&mut self, participant: Participant) -> &Participant {
        let id = participant.id.clone();
        info!(
            "Added participant {} ({}) at {:?}",
            id,
            participant.name,
            vec3_to_array(&participant.motion.position)
        );

        if self.participants.insert(id.clone(), participant).is_none() {
            self.join_order.push(id.clone());
        }
        &self.participants[&id]
    }

    pub fn remove_participant(&mut self, id: &str) -> Option<Participant> {
        let removed = self.participants.remove(id)?;
        self.join_order.retain(|joined| joined != id);
        info!("Removed participant {}", id);
        Some(removed)
    }

    /// Stores `record` as the participant's current input (last write wins).
    ///
    /// A record carrying a usable orientation is adopted immediately. Thrust
    /// axes are clamped to [-1, 1] and non-finite ones read as 0. Returns
    /// false when the participant is unknown; such input is dropped.
    pub fn apply_input(&mut self, id: &str, mut record: InputRecord) -> bool {
        let Some(participant) = self.participants.get_mut(id) else {
            debug!("Dropping input for unknown participant {}", id);
            return false;
        };

        if let Some(orientation) = record.quat.and_then(quat_from_array) {
            participant.orientation = orientation;
        }
        record.thrust = sanitize_thrust(record.thrust);
        participant.input = record;
        true
    }

    /// Advances every participant by `dt` seconds using its stored input.
    pub fn tick(&mut self, dt: f32) {
        let motion = self.motion;
        for participant in self.participants.values_mut() {
            let control = vec3_from_array(participant.input.thrust);
            motion.step(&mut participant.motion, control, participant.input.fast, dt);
        }
        self.tick += 1;
    }

    pub fn snapshot(&self, t: u64) -> Snapshot {
        Snapshot {
            t,
            players: self
                .join_order
                .iter()
                .filter_map(|id| self.participants.get(id))
                .map(Participant::view)
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.participants.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn motion_config(&self) -> &MotionConfig {
        &self.motion
    }
}

impl Default for ServerSimulation {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}

fn sanitize_thrust(thrust: [f32; 3]) -> [f32; 3] {
    thrust.map(|axis| if axis.is_finite() { axis.clamp(-1.0, 1.0) } else { 0.0 })
}

fn random_identity<R: Rng>(rng: &mut R) -> ParticipantId {
    (0..IDENTITY_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}
