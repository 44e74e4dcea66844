//! Tracked mobile entity snapshots.

use serde::{Deserialize, Serialize};
use tap_protocol::AddActor;

/// One entity as last seen on the wire. Replaced wholesale on every
/// update, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Session-scoped id used by movement packets.
    pub runtime_id: u64,
    /// Identity-stable id used by link packets.
    pub unique_id: i64,
    pub entity_type: String,
    pub position: [f32; 3],
    pub pitch: f32,
    pub yaw: f32,
    pub head_yaw: f32,
    pub velocity: [f32; 3],
    pub attributes: Vec<(String, f32)>,
}

impl Entity {
    #[must_use]
    pub fn from_add_actor(packet: &AddActor) -> Self {
        Self {
            runtime_id: packet.entity_runtime_id,
            unique_id: packet.entity_unique_id,
            entity_type: packet.actor_type.clone(),
            position: packet.position,
            pitch: packet.pitch,
            yaw: packet.yaw,
            head_yaw: packet.head_yaw,
            velocity: packet.velocity,
            attributes: packet.attributes.clone(),
        }
    }

    /// Planar (x/z) distance in blocks from a point.
    #[must_use]
    pub fn planar_distance(&self, x: f32, z: f32) -> f32 {
        let dx = self.position[0] - x;
        let dz = self.position[2] - z;
        (dx * dx + dz * dz).sqrt()
    }
}
