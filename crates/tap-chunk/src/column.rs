//! Decoded vertical chunk column.

use rustc_hash::FxHashMap;
use tap_protocol::BlockPos;

use crate::nbt::BlockNbt;
use crate::paletted::PalettedStorage;
use crate::registry::BlockRegistry;
use crate::slab::Slab;
use crate::DimensionRange;

/// Per-column biome data; the legacy form is a flat 16x16 grid, the
/// modern form is one paletted grid per slab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Biomes {
    Legacy(Box<[u8; 256]>),
    Paletted(Vec<PalettedStorage>),
}

/// One decoded vertical chunk: a stack of 16-block slabs over a
/// dimension range, biomes, and per-position block metadata.
///
/// A column only exists once its header packet decoded; slabs may still
/// be pending (`None`) while streamed subchunk packets arrive.
#[derive(Debug, Clone)]
pub struct Column {
    range: DimensionRange,
    slabs: Vec<Option<Slab>>,
    pub biomes: Biomes,
    pub block_entities: FxHashMap<BlockPos, BlockNbt>,
}

impl Column {
    #[must_use]
    pub fn new(range: DimensionRange) -> Self {
        Self {
            range,
            slabs: vec![None; range.slab_count()],
            biomes: Biomes::Legacy(Box::new([0; 256])),
            block_entities: FxHashMap::default(),
        }
    }

    #[must_use]
    pub const fn range(&self) -> DimensionRange {
        self.range
    }

    #[must_use]
    pub fn slabs(&self) -> &[Option<Slab>] {
        &self.slabs
    }

    #[must_use]
    pub fn slab(&self, index: usize) -> Option<&Slab> {
        self.slabs.get(index).and_then(Option::as_ref)
    }

    /// Install one vertical slab. Out-of-range indices are ignored by
    /// callers that validated against the dimension range already.
    pub fn set_slab(&mut self, index: usize, slab: Slab) {
        if let Some(entry) = self.slabs.get_mut(index) {
            *entry = Some(slab);
        }
    }

    /// Runtime id at local x/z and world y; air when nothing is stored.
    #[must_use]
    pub fn block_at(&self, x: u8, y: i32, z: u8, registry: &BlockRegistry) -> u32 {
        let air = registry.air_id();
        let Some(index) = self.range.slab_index(y) else {
            return air;
        };
        self.slab(index).map_or(air, |slab| {
            slab.block(x, (y & 0xF) as u8, z, 0, air)
        })
    }

    /// Write one block, creating the slab if needed. Test/tooling helper.
    pub fn set_block(&mut self, x: u8, y: i32, z: u8, value: u32, registry: &BlockRegistry) {
        let Some(index) = self.range.slab_index(y) else {
            return;
        };
        let air = registry.air_id();
        let slab = self.slabs[index].get_or_insert_with(|| Slab::filled(air));
        slab.set_block(x, (y & 0xF) as u8, z, value, air);
    }

    /// World y of the highest non-air block, optionally counting liquid
    /// surfaces, or `None` for an all-air column position.
    #[must_use]
    pub fn top_block_y(
        &self,
        x: u8,
        z: u8,
        registry: &BlockRegistry,
        include_liquid: bool,
    ) -> Option<i32> {
        for y in (self.range.min_y..=self.range.max_y).rev() {
            let rid = self.block_at(x, y, z, registry);
            if registry.is_air(rid) {
                continue;
            }
            if !include_liquid && registry.is_liquid(rid) {
                continue;
            }
            return Some(y);
        }
        None
    }

    /// True when every stored slab is pure air. Such a column carries no
    /// information and is dropped by the store's cull pass.
    #[must_use]
    pub fn is_all_air(&self, registry: &BlockRegistry) -> bool {
        self.slabs
            .iter()
            .flatten()
            .all(|slab| slab.is_empty(registry))
    }

    /// Attach or update a block metadata blob.
    ///
    /// With `merge` the new blob's fields overwrite the old blob's
    /// field-by-field; without it the blob is replaced wholesale.
    pub fn set_block_nbt(&mut self, nbt: BlockNbt, merge: bool) {
        match self.block_entities.get_mut(&nbt.pos) {
            Some(existing) if merge => existing.merge(nbt),
            _ => {
                self.block_entities.insert(nbt.pos, nbt);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nbt::NbtValue;

    fn registry() -> BlockRegistry {
        BlockRegistry::vanilla()
    }

    #[test]
    fn fresh_column_is_all_air() {
        let reg = registry();
        let column = Column::new(DimensionRange::OVERWORLD);
        assert!(column.is_all_air(&reg));
        assert_eq!(column.block_at(0, 64, 0, &reg), reg.air_id());
        assert_eq!(column.top_block_y(0, 0, &reg, true), None);
    }

    #[test]
    fn set_block_is_visible_and_defeats_cull() {
        let reg = registry();
        let stone = reg.id_for("minecraft:stone").unwrap();
        let mut column = Column::new(DimensionRange::OVERWORLD);
        column.set_block(3, 100, 9, stone, &reg);
        assert_eq!(column.block_at(3, 100, 9, &reg), stone);
        assert!(!column.is_all_air(&reg));
        assert_eq!(column.top_block_y(3, 9, &reg, true), Some(100));
    }

    #[test]
    fn liquid_surface_is_skipped_for_solid_height() {
        let reg = registry();
        let stone = reg.id_for("minecraft:stone").unwrap();
        let water = reg.id_for("minecraft:water").unwrap();
        let mut column = Column::new(DimensionRange::OVERWORLD);
        column.set_block(0, 60, 0, stone, &reg);
        for y in 61..=63 {
            column.set_block(0, y, 0, water, &reg);
        }
        assert_eq!(column.top_block_y(0, 0, &reg, true), Some(63));
        assert_eq!(column.top_block_y(0, 0, &reg, false), Some(60));
    }

    #[test]
    fn nbt_merge_vs_replace() {
        let mut column = Column::new(DimensionRange::OVERWORLD);
        let pos = BlockPos::new(1, 64, 1);

        let mut original = BlockNbt::new("Sign", pos);
        original
            .extra
            .insert("Text".into(), NbtValue::String("hello".into()));
        column.set_block_nbt(original, false);

        let mut update = BlockNbt::new("Sign", pos);
        update.extra.insert("Color".into(), NbtValue::Int(4));
        column.set_block_nbt(update.clone(), true);

        let stored = &column.block_entities[&pos];
        assert_eq!(stored.extra["Text"], NbtValue::String("hello".into()));
        assert_eq!(stored.extra["Color"], NbtValue::Int(4));

        column.set_block_nbt(update, false);
        let stored = &column.block_entities[&pos];
        assert!(!stored.extra.contains_key("Text"));
    }
}
