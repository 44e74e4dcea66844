//! One 16-block vertical slab of a column.

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::paletted::PalettedStorage;
use crate::registry::BlockRegistry;
use crate::{ChunkError, Result};

/// Current slab encoding version (carries its own vertical index).
const VERSION_INDEXED: u8 = 9;
/// Layered encoding without a vertical index byte.
const VERSION_LAYERED: u8 = 8;
/// Legacy single-layer encoding.
const VERSION_SINGLE: u8 = 1;

/// A 16x16x16 block slab. Layer 0 is the primary block layer; layer 1,
/// when present, carries waterlogging and similar overlays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slab {
    layers: Vec<PalettedStorage>,
}

impl Slab {
    #[must_use]
    pub fn new(layers: Vec<PalettedStorage>) -> Self {
        Self { layers }
    }

    /// Slab holding a single uniform block.
    #[must_use]
    pub fn filled(value: u32) -> Self {
        Self {
            layers: vec![PalettedStorage::filled(value)],
        }
    }

    #[must_use]
    pub fn layers(&self) -> &[PalettedStorage] {
        &self.layers
    }

    /// Runtime id at local coordinates in the given layer, or the air id
    /// when the layer does not exist.
    #[must_use]
    pub fn block(&self, x: u8, y: u8, z: u8, layer: usize, air: u32) -> u32 {
        self.layers
            .get(layer)
            .map_or(air, |storage| storage.at(x, y, z))
    }

    pub fn set_block(&mut self, x: u8, y: u8, z: u8, value: u32, air: u32) {
        if self.layers.is_empty() {
            self.layers.push(PalettedStorage::filled(air));
        }
        self.layers[0].set(x, y, z, value);
    }

    /// True when every layer's palette contains nothing but air.
    #[must_use]
    pub fn is_empty(&self, registry: &BlockRegistry) -> bool {
        self.layers.iter().all(|layer| {
            layer
                .palette()
                .iter()
                .all(|&rid| registry.is_air(rid))
        })
    }

    /// Decode a slab.
    ///
    /// `y_index` carries the slab's vertical index: for version 9 the
    /// encoded absolute index overwrites it, for older versions the
    /// caller-provided value stands.
    pub fn decode<R: Read>(reader: &mut R, y_index: &mut u8) -> Result<Self> {
        let version = reader.read_u8()?;
        match version {
            VERSION_SINGLE => Ok(Self {
                layers: vec![PalettedStorage::decode(reader)?],
            }),
            VERSION_LAYERED | VERSION_INDEXED => {
                let layer_count = reader.read_u8()?;
                if version == VERSION_INDEXED {
                    *y_index = reader.read_u8()?;
                }
                let mut layers = Vec::with_capacity(layer_count as usize);
                for _ in 0..layer_count {
                    layers.push(PalettedStorage::decode(reader)?);
                }
                Ok(Self { layers })
            }
            other => Err(ChunkError::UnsupportedSlabVersion(other)),
        }
    }

    /// Encode in the current (index-carrying) version.
    pub fn encode<W: Write>(&self, writer: &mut W, y_index: u8) -> Result<()> {
        writer.write_u8(VERSION_INDEXED)?;
        writer.write_u8(self.layers.len() as u8)?;
        writer.write_u8(y_index)?;
        for layer in &self.layers {
            layer.encode(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versioned_roundtrip_restores_index_and_blocks() {
        let mut slab = Slab::filled(0);
        slab.set_block(1, 2, 3, 77, 0);
        let mut buf = Vec::new();
        slab.encode(&mut buf, 12).unwrap();

        let mut index = 0u8;
        let decoded = Slab::decode(&mut buf.as_slice(), &mut index).unwrap();
        assert_eq!(index, 12);
        assert_eq!(decoded.block(1, 2, 3, 0, 0), 77);
        assert_eq!(decoded.block(0, 0, 0, 0, 0), 0);
    }

    #[test]
    fn legacy_version_keeps_caller_index() {
        let storage = PalettedStorage::filled(5);
        let mut buf = vec![1u8]; // version 1, single storage
        storage.encode(&mut buf).unwrap();

        let mut index = 7u8;
        let decoded = Slab::decode(&mut buf.as_slice(), &mut index).unwrap();
        assert_eq!(index, 7);
        assert_eq!(decoded.block(0, 0, 0, 0, 0), 5);
    }

    #[test]
    fn unknown_version_is_an_error() {
        let buf = [3u8];
        let mut index = 0u8;
        assert!(matches!(
            Slab::decode(&mut buf.as_slice(), &mut index),
            Err(ChunkError::UnsupportedSlabVersion(3))
        ));
    }
}
