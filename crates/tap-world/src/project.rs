//! Distance-bounded projection of one store into another.

use tap_chunk::{BlockRegistry, Column};
use tap_protocol::{BlockPos, ChunkPos};
use tracing::debug;

use crate::store::WorldStore;

/// Copy a geometrically filtered subset of `source` into `destination`.
///
/// A negative `radius_chunks` means unlimited. Columns within the
/// Euclidean chunk radius of `center_block` are copied and reported with
/// `Some`; columns outside it are reported with `None` so the consumer
/// can unload them. Entities are copied when already present in the
/// destination or within `radius_chunks * 16` blocks; once handed to a
/// consumer an entity is never retracted.
///
/// One-way and non-destructive: `source` is only touched by the cull
/// pass that runs first.
pub fn project<F>(
    source: &mut WorldStore,
    destination: &mut WorldStore,
    registry: &BlockRegistry,
    center_block: BlockPos,
    radius_chunks: i32,
    mut on_chunk: F,
) where
    F: FnMut(ChunkPos, Option<&Column>),
{
    source.cull(registry);

    let center_chunk = center_block.chunk();
    let unlimited = radius_chunks < 0;

    let mut copied = 0usize;
    for (pos, column) in source.chunks() {
        let dx = f64::from(pos.x - center_chunk.x);
        let dz = f64::from(pos.z - center_chunk.z);
        let within = unlimited || dx.hypot(dz) <= f64::from(radius_chunks);
        if within {
            destination.store_column(pos, column.clone());
            copied += 1;
            on_chunk(pos, Some(column));
        } else {
            on_chunk(pos, None);
        }
    }

    let block_radius = radius_chunks as f32 * 16.0;
    for entity in source.entities() {
        let keep = destination.get_entity(entity.runtime_id).is_some()
            || unlimited
            || entity.planar_distance(center_block.x as f32, center_block.z as f32)
                <= block_radius;
        if keep {
            destination.store_entity(entity.clone());
        }
    }

    for (mount, riders) in source.links() {
        if destination.runtime_id_of(mount).is_some() {
            destination.merge_links(mount, riders);
        }
    }

    debug!(
        copied,
        entities = destination.entity_count(),
        radius = radius_chunks,
        "projected world subset"
    );
}
