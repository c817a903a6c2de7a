//! Wire messages exchanged between server and clients.
//!
//! Every datagram carries exactly one bincode-encoded [`Packet`]. Vectors
//! travel as plain `[x, y, z]` arrays and quaternions as `[x, y, z, w]`.

use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;

/// Opaque per-connection identity assigned by the server.
pub type ParticipantId = String;

/// Tracked pose of one hand, used only to draw remote avatars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandPose {
    pub position: [f32; 3],
    pub quaternion: [f32; 4],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandTransforms {
    pub left: Option<HandPose>,
    pub right: Option<HandPose>,
}

impl HandTransforms {
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Hands held at the sides, used when no tracked controllers are present.
    pub fn desktop_fallback() -> Self {
        Self {
            left: Some(HandPose {
                position: [-0.4, -1.0, -0.2],
                quaternion: [0.0, 0.0, 0.0, 1.0],
            }),
            right: Some(HandPose {
                position: [0.4, -1.0, -0.2],
                quaternion: [0.0, 0.0, 0.0, 1.0],
            }),
        }
    }
}

/// A client's latest control intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Sender's uncorrected clock, in ms.
    pub t: u64,
    /// Desired thrust, each axis in [-1, 1].
    pub thrust: [f32; 3],
    pub fast: bool,
    /// Snap-turn step in degrees, positive to the right.
    pub turn: Option<f32>,
    /// Sender's current head orientation.
    pub quat: Option<[f32; 4]>,
    pub controllers: Option<HandTransforms>,
}

/// Display state of one participant inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: ParticipantId,
    pub position: [f32; 3],
    pub quaternion: Option<[f32; 4]>,
    pub color: u32,
    pub name: String,
    pub controllers: Option<HandTransforms>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Server clock at emission, in ms.
    pub t: u64,
    /// Participants in join order.
    pub players: Vec<PlayerView>,
}

impl Snapshot {
    pub fn find(&self, id: &str) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    // Client -> server
    Connect { client_version: u32 },
    StateInput(InputRecord),
    TimeProbe { c: u64 },
    Disconnect,

    // Server -> client
    Welcome { id: ParticipantId, name: String, color: u32 },
    Snapshot(Snapshot),
    TimeEcho { c: u64, s: u64 },
    Disconnected { reason: String },
}

impl Packet {
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Connect { .. } => "connect",
            Packet::StateInput(_) => "state_input",
            Packet::TimeProbe { .. } => "ts_probe",
            Packet::Disconnect => "disconnect",
            Packet::Welcome { .. } => "welcome",
            Packet::Snapshot(_) => "snapshot",
            Packet::TimeEcho { .. } => "ts_echo",
            Packet::Disconnected { .. } => "disconnected",
        }
    }
}
