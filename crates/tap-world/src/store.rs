//! The spatial store itself.

use rustc_hash::{FxHashMap, FxHashSet};
use tap_chunk::{BlockNbt, BlockRegistry, Column};
use tap_protocol::ChunkPos;
use tracing::debug;

use crate::entity::Entity;

/// Link mutation applied by [`WorldStore::link_entities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOp {
    Add,
    Remove,
}

/// Render state of one in-game map item.
///
/// Reserved: the upstream persistence path for map items is disabled, so
/// this only retains the last texture push best-effort.
#[derive(Debug, Clone, Default)]
pub struct MapState {
    pub scale: u8,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// In-memory world state for one session, keyed by horizontal chunk
/// coordinate. All mutation happens under the session's exclusive
/// section; the store itself carries no lock.
#[derive(Debug, Default)]
pub struct WorldStore {
    chunks: FxHashMap<ChunkPos, Column>,
    pending_nbt: FxHashMap<ChunkPos, Vec<(BlockNbt, bool)>>,
    entities: FxHashMap<u64, Entity>,
    entity_links: FxHashMap<i64, FxHashSet<i64>>,
    unique_id_index: FxHashMap<i64, u64>,
    maps: FxHashMap<i64, MapState>,
}

impl WorldStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a decoded column; last write wins. Metadata blobs that
    /// arrived ahead of the column attach now, in arrival order.
    pub fn store_column(&mut self, pos: ChunkPos, column: Column) {
        self.chunks.insert(pos, column);
        if let Some(pending) = self.pending_nbt.remove(&pos) {
            if let Some(column) = self.chunks.get_mut(&pos) {
                for (nbt, merge) in pending {
                    column.set_block_nbt(nbt, merge);
                }
            }
        }
    }

    #[must_use]
    pub fn load_column(&self, pos: ChunkPos) -> Option<&Column> {
        self.chunks.get(&pos)
    }

    pub fn column_mut(&mut self, pos: ChunkPos) -> Option<&mut Column> {
        self.chunks.get_mut(&pos)
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> impl Iterator<Item = (ChunkPos, &Column)> {
        self.chunks.iter().map(|(pos, column)| (*pos, column))
    }

    /// Attach a block metadata blob to the column owning its position.
    ///
    /// A blob for a position without a stored column is held back and
    /// attached once that column arrives.
    pub fn set_block_nbt(&mut self, nbt: BlockNbt, merge: bool) {
        let pos = nbt.pos.chunk();
        match self.chunks.get_mut(&pos) {
            Some(column) => column.set_block_nbt(nbt, merge),
            None => {
                debug!(?pos, id = %nbt.id, "block metadata ahead of its column, held back");
                self.pending_nbt.entry(pos).or_default().push((nbt, merge));
            }
        }
    }

    /// Store an entity snapshot, replacing any previous one wholesale.
    pub fn store_entity(&mut self, entity: Entity) {
        self.unique_id_index
            .insert(entity.unique_id, entity.runtime_id);
        self.entities.insert(entity.runtime_id, entity);
    }

    #[must_use]
    pub fn get_entity(&self, runtime_id: u64) -> Option<&Entity> {
        self.entities.get(&runtime_id)
    }

    pub fn entity_mut(&mut self, runtime_id: u64) -> Option<&mut Entity> {
        self.entities.get_mut(&runtime_id)
    }

    pub fn remove_entity(&mut self, runtime_id: u64) {
        if let Some(entity) = self.entities.remove(&runtime_id) {
            self.unique_id_index.remove(&entity.unique_id);
        }
    }

    /// Current runtime id for an identity-stable unique id.
    #[must_use]
    pub fn runtime_id_of(&self, unique_id: i64) -> Option<u64> {
        self.unique_id_index.get(&unique_id).copied()
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Mutate the mount-to-riders relation. Duplicate adds collapse;
    /// removing an absent rider is a silent no-op.
    pub fn link_entities(&mut self, mount_unique_id: i64, rider_unique_id: i64, op: LinkOp) {
        match op {
            LinkOp::Add => {
                self.entity_links
                    .entry(mount_unique_id)
                    .or_default()
                    .insert(rider_unique_id);
            }
            LinkOp::Remove => {
                if let Some(riders) = self.entity_links.get_mut(&mount_unique_id) {
                    riders.remove(&rider_unique_id);
                    if riders.is_empty() {
                        self.entity_links.remove(&mount_unique_id);
                    }
                }
            }
        }
    }

    #[must_use]
    pub fn riders_of(&self, mount_unique_id: i64) -> Option<&FxHashSet<i64>> {
        self.entity_links.get(&mount_unique_id)
    }

    pub(crate) fn links(&self) -> impl Iterator<Item = (i64, &FxHashSet<i64>)> {
        self.entity_links.iter().map(|(mount, riders)| (*mount, riders))
    }

    pub(crate) fn merge_links(&mut self, mount_unique_id: i64, riders: &FxHashSet<i64>) {
        self.entity_links
            .entry(mount_unique_id)
            .or_default()
            .extend(riders.iter().copied());
    }

    /// Best-effort retention of a map item texture push.
    pub fn store_map(&mut self, map_id: i64, state: MapState) {
        self.maps.insert(map_id, state);
    }

    #[must_use]
    pub fn map_state(&self, map_id: i64) -> Option<&MapState> {
        self.maps.get(&map_id)
    }

    /// Drop every column whose every slab is pure air. Such columns were
    /// decoded but carry no content and must not retain memory or show
    /// up in spatial queries. Returns the number of columns dropped.
    pub fn cull(&mut self, registry: &BlockRegistry) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|_, column| !column.is_all_air(registry));
        let culled = before - self.chunks.len();
        if culled > 0 {
            debug!(culled, remaining = self.chunks.len(), "culled empty columns");
        }
        culled
    }
}
