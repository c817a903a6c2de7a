//! Delayed playback of remote participants.
//!
//! Each remote keeps a short ring of samples stamped with the server time of
//! the snapshot they came from. Rendering looks up the pair of samples that
//! brackets a render time slightly in the past and blends between them:
//! positions linearly, orientations along the shortest arc. Outside the
//! buffered span the nearest sample is held; nothing is extrapolated.

use shared::math::{quat_from_array, slerp_shortest, vec3_from_array};
use shared::{HandTransforms, ParticipantId, Quat, Snapshot, Vec3, SAMPLE_CAPACITY};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Server timestamp of the snapshot the sample came from, in ms.
    pub t: u64,
    pub position: Vec3,
    pub orientation: Option<Quat>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    /// `None` when neither bracketing sample carried an orientation.
    pub orientation: Option<Quat>,
}

/// Fixed-capacity sample history of one participant.
#[derive(Debug, Clone)]
pub struct InterpolationBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl InterpolationBuffer {
    pub fn new() -> Self {
        Self::with_capacity(SAMPLE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Appends `sample`, evicting the oldest arrival past capacity.
    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Reconstructs the pose at `render_time` (server ms).
    ///
    /// Samples are sorted by timestamp first, so arrival order does not
    /// matter. Returns `None` only when the buffer is empty.
    pub fn sample_at(&mut self, render_time: f64) -> Option<Pose> {
        if self.samples.is_empty() {
            return None;
        }

        let samples = self.samples.make_contiguous();
        samples.sort_by_key(|s| s.t);

        let (a, b) = samples
            .windows(2)
            .find(|pair| pair[0].t as f64 <= render_time && pair[1].t as f64 >= render_time)
            .map(|pair| (pair[0], pair[1]))
            .unwrap_or((samples[0], samples[samples.len() - 1]));

        let span = (b.t.saturating_sub(a.t) as f64).max(1.0);
        let t = ((render_time - a.t as f64) / span).clamp(0.0, 1.0) as f32;

        let position = a.position.lerp(&b.position, t);
        let orientation = match (a.orientation.or(b.orientation), b.orientation.or(a.orientation)) {
            (Some(qa), Some(qb)) => Some(slerp_shortest(&qa, &qb, t)),
            _ => None,
        };

        Some(Pose {
            position,
            orientation,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for InterpolationBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// A participant controlled by someone else, as this client renders it.
#[derive(Debug, Clone)]
pub struct RemoteParticipant {
    pub id: ParticipantId,
    pub color: u32,
    pub name: String,
    /// Latest auxiliary hand transforms; `None` hides the hands.
    pub controllers: Option<HandTransforms>,
    pub position: Vec3,
    /// Last known orientation, held while samples carry none.
    pub orientation: Quat,
    buffer: InterpolationBuffer,
}

impl RemoteParticipant {
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// All remote participants seen in the most recent snapshot.
#[derive(Debug)]
pub struct RemoteRegistry {
    remotes: HashMap<ParticipantId, RemoteParticipant>,
    capacity: usize,
}

impl RemoteRegistry {
    pub fn new() -> Self {
        Self::with_capacity(SAMPLE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            remotes: HashMap::new(),
            capacity,
        }
    }

    /// Records one snapshot.
    ///
    /// Remotes missing from it are dropped; `exclude` (normally the local
    /// participant) is never tracked.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot, exclude: Option<&str>) {
        let is_tracked = |id: &str| Some(id) != exclude;

        self.remotes
            .retain(|id, _| is_tracked(id.as_str()) && snapshot.contains(id));

        for view in snapshot.players.iter().filter(|p| is_tracked(p.id.as_str())) {
            let sample = Sample {
                t: snapshot.t,
                position: vec3_from_array(view.position),
                orientation: view.quaternion.and_then(quat_from_array),
            };

            let capacity = self.capacity;
            let remote = self
                .remotes
                .entry(view.id.clone())
                .or_insert_with(|| RemoteParticipant {
                    id: view.id.clone(),
                    color: view.color,
                    name: view.name.clone(),
                    controllers: None,
                    position: sample.position,
                    orientation: sample.orientation.unwrap_or_else(Quat::identity),
                    buffer: InterpolationBuffer::with_capacity(capacity),
                });

            remote.controllers = view.controllers.clone();
            remote.buffer.push(sample);
        }
    }

    /// Moves every remote to its interpolated pose at `render_time`.
    pub fn update(&mut self, render_time: f64) {
        for remote in self.remotes.values_mut() {
            if let Some(pose) = remote.buffer.sample_at(render_time) {
                remote.position = pose.position;
                if let Some(orientation) = pose.orientation {
                    remote.orientation = orientation;
                }
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&RemoteParticipant> {
        self.remotes.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteParticipant> {
        self.remotes.values()
    }

    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }
}

impl Default for RemoteRegistry {
    fn default() -> Self {
        Self::new()
    }
}
