//! Binary chunk/subchunk codec.
//!
//! Decodes the wire representation of a vertical voxel column (paletted
//! block storage, biomes, embedded block metadata blobs) into in-memory
//! [`Column`] values. Pure transformation: no shared state, no IO beyond
//! the buffers handed in.

use thiserror::Error;

mod column;
mod decode;
mod nbt;
mod paletted;
mod registry;
mod slab;

pub use column::{Biomes, Column};
pub use decode::{
    decode_network_chunk, decode_sub_chunk_entry, encode_network_chunk, ChunkDecodeOptions,
};
pub use nbt::{BlockNbt, NbtValue};
pub use paletted::PalettedStorage;
pub use registry::{BlockEntry, BlockRegistry};
pub use slab::Slab;

/// Vertical block range of a dimension, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionRange {
    pub min_y: i32,
    pub max_y: i32,
}

impl DimensionRange {
    /// Overworld range after the caves-and-cliffs expansion.
    pub const OVERWORLD: Self = Self {
        min_y: -64,
        max_y: 319,
    };
    /// Nether range.
    pub const NETHER: Self = Self { min_y: 0, max_y: 127 };

    #[must_use]
    pub const fn for_dimension(dimension: i32) -> Self {
        match dimension {
            1 => Self::NETHER,
            2 => Self::NETHER, // the end shares the 128-block range on the wire
            _ => Self::OVERWORLD,
        }
    }

    #[must_use]
    pub const fn height(&self) -> i32 {
        self.max_y - self.min_y + 1
    }

    /// Number of 16-block vertical slabs.
    #[must_use]
    pub const fn slab_count(&self) -> usize {
        (self.height() / 16) as usize
    }

    /// Lowest vertical slab index (in 16-block units).
    #[must_use]
    pub const fn min_slab(&self) -> i32 {
        self.min_y >> 4
    }

    /// Slab index within the column for a world Y, if in range.
    #[must_use]
    pub const fn slab_index(&self, y: i32) -> Option<usize> {
        let shifted = y - self.min_y;
        if shifted < 0 || shifted >= self.height() {
            None
        } else {
            Some((shifted >> 4) as usize)
        }
    }
}

/// Chunk decode failure. Always fatal for the packet being processed:
/// it means the reader is desynchronized with the wire format.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] tap_protocol::ProtocolError),

    #[error("unsupported slab version: {0}")]
    UnsupportedSlabVersion(u8),

    #[error("bad paletted storage header: {0:#04x}")]
    BadStorageHeader(u8),

    #[error("slab index {0} outside dimension range")]
    SlabIndexOutOfRange(i32),

    #[error("unknown nbt tag: {0}")]
    UnknownNbtTag(u8),

    #[error("block metadata blob missing field: {0}")]
    MissingNbtField(&'static str),
}

pub type Result<T> = std::result::Result<T, ChunkError>;
