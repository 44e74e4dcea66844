//! Block palette registry: runtime id to block identity and map color.
//!
//! Runtime ids are dense indices into the palette in the default mode,
//! or FNV-1a hashes of the block name when the server negotiates hashed
//! ids. Colors here feed the top-down map raster only.

use rustc_hash::FxHashMap;

/// FNV-1a 32-bit, the hash used for hashed block runtime ids.
#[must_use]
pub(crate) fn fnv1a32(name: &str) -> u32 {
    let mut hash = 0x811C_9DC5u32;
    for byte in name.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// One block palette entry.
#[derive(Debug, Clone)]
pub struct BlockEntry {
    pub name: String,
    /// Top-down map color.
    pub color: [u8; 4],
    pub is_air: bool,
    pub is_liquid: bool,
}

/// The session's block palette.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    entries: Vec<BlockEntry>,
    by_hash: FxHashMap<u32, usize>,
    hashed: bool,
}

/// Name, color, air, liquid.
const VANILLA: &[(&str, [u8; 4], bool, bool)] = &[
    ("minecraft:air", [0, 0, 0, 0], true, false),
    ("minecraft:stone", [112, 112, 112, 255], false, false),
    ("minecraft:grass_block", [98, 142, 66, 255], false, false),
    ("minecraft:dirt", [134, 96, 67, 255], false, false),
    ("minecraft:water", [44, 81, 201, 255], false, true),
    ("minecraft:lava", [207, 91, 19, 255], false, true),
    ("minecraft:sand", [219, 207, 163, 255], false, false),
    ("minecraft:gravel", [127, 124, 123, 255], false, false),
    ("minecraft:oak_log", [103, 82, 49, 255], false, false),
    ("minecraft:oak_leaves", [58, 95, 32, 255], false, false),
    ("minecraft:snow", [249, 254, 254, 255], false, false),
    ("minecraft:bedrock", [60, 60, 60, 255], false, false),
    ("minecraft:deepslate", [80, 80, 82, 255], false, false),
    ("minecraft:netherrack", [97, 38, 38, 255], false, false),
];

const UNKNOWN_COLOR: [u8; 4] = [255, 0, 255, 255];

impl BlockRegistry {
    /// Registry with the vanilla palette plus the session's custom blocks.
    #[must_use]
    pub fn new(custom_blocks: &[String], hashed: bool) -> Self {
        let mut entries: Vec<BlockEntry> = VANILLA
            .iter()
            .map(|&(name, color, is_air, is_liquid)| BlockEntry {
                name: name.to_owned(),
                color,
                is_air,
                is_liquid,
            })
            .collect();
        for name in custom_blocks {
            entries.push(BlockEntry {
                name: name.clone(),
                color: UNKNOWN_COLOR,
                is_air: false,
                is_liquid: false,
            });
        }
        let by_hash = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (fnv1a32(&e.name), i))
            .collect();
        Self {
            entries,
            by_hash,
            hashed,
        }
    }

    #[must_use]
    pub fn vanilla() -> Self {
        Self::new(&[], false)
    }

    /// Whether runtime ids are FNV-1a hashes.
    #[must_use]
    pub const fn hashed(&self) -> bool {
        self.hashed
    }

    /// The runtime id of air in the current id mode.
    #[must_use]
    pub fn air_id(&self) -> u32 {
        if self.hashed {
            fnv1a32("minecraft:air")
        } else {
            0
        }
    }

    /// Runtime id for a block name, in the current id mode.
    #[must_use]
    pub fn id_for(&self, name: &str) -> Option<u32> {
        if self.hashed {
            let hash = fnv1a32(name);
            self.by_hash.contains_key(&hash).then_some(hash)
        } else {
            self.entries
                .iter()
                .position(|e| e.name == name)
                .map(|i| i as u32)
        }
    }

    #[must_use]
    pub fn lookup(&self, runtime_id: u32) -> Option<&BlockEntry> {
        if self.hashed {
            self.by_hash
                .get(&runtime_id)
                .and_then(|&i| self.entries.get(i))
        } else {
            self.entries.get(runtime_id as usize)
        }
    }

    #[must_use]
    pub fn is_air(&self, runtime_id: u32) -> bool {
        self.lookup(runtime_id).is_some_and(|e| e.is_air)
    }

    #[must_use]
    pub fn is_liquid(&self, runtime_id: u32) -> bool {
        self.lookup(runtime_id).is_some_and(|e| e.is_liquid)
    }

    /// Map color for a runtime id; unknown blocks get a loud magenta.
    #[must_use]
    pub fn color(&self, runtime_id: u32) -> [u8; 4] {
        self.lookup(runtime_id).map_or(UNKNOWN_COLOR, |e| e.color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_ids_index_the_palette() {
        let registry = BlockRegistry::vanilla();
        assert_eq!(registry.air_id(), 0);
        assert!(registry.is_air(0));
        assert!(!registry.is_air(1));
        let water = registry.id_for("minecraft:water").unwrap();
        assert!(registry.is_liquid(water));
    }

    #[test]
    fn hashed_ids_resolve_by_name_hash() {
        let registry = BlockRegistry::new(&[], true);
        let stone = registry.id_for("minecraft:stone").unwrap();
        assert_eq!(stone, fnv1a32("minecraft:stone"));
        assert_eq!(registry.lookup(stone).unwrap().name, "minecraft:stone");
        assert!(registry.is_air(registry.air_id()));
    }

    #[test]
    fn custom_blocks_are_appended() {
        let registry = BlockRegistry::new(&["custom:gizmo".to_owned()], false);
        let id = registry.id_for("custom:gizmo").unwrap();
        assert_eq!(id as usize, VANILLA.len());
        assert_eq!(registry.color(id), UNKNOWN_COLOR);
    }

    #[test]
    fn unknown_id_gets_fallback_color() {
        let registry = BlockRegistry::vanilla();
        assert_eq!(registry.color(9999), UNKNOWN_COLOR);
    }
}
