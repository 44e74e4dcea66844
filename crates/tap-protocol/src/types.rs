//! Shared coordinate and direction types.

use std::fmt;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::io_ext::{read_vari32, write_vari32};
use crate::Result;

/// Horizontal chunk coordinate. Unique key into all chunk-indexed maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing the given block X/Z coordinates.
    #[must_use]
    pub const fn of_block(bx: i32, bz: i32) -> Self {
        Self {
            x: bx >> 4,
            z: bz >> 4,
        }
    }

    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            x: read_vari32(reader)?,
            z: read_vari32(reader)?,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_vari32(writer, self.x)?;
        write_vari32(writer, self.z)
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Exact 3D block position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The chunk that owns this block position.
    #[must_use]
    pub const fn chunk(&self) -> ChunkPos {
        ChunkPos::of_block(self.x, self.z)
    }

    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            x: read_vari32(reader)?,
            y: read_vari32(reader)?,
            z: read_vari32(reader)?,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_vari32(writer, self.x)?;
        write_vari32(writer, self.y)?;
        write_vari32(writer, self.z)
    }
}

/// Which side of the session a packet travels toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    ToServer,
    ToClient,
}

impl Direction {
    #[must_use]
    pub const fn to_server(self) -> bool {
        matches!(self, Self::ToServer)
    }

    #[must_use]
    pub const fn from_to_server(to_server: bool) -> Self {
        if to_server {
            Self::ToServer
        } else {
            Self::ToClient
        }
    }
}

/// Per-entry result code in a subchunk packet.
///
/// Only `Success` carries a payload. `SuccessAllAir` means the slab
/// exists but is empty; the rest are defined skips, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubChunkResult {
    Undefined,
    Success,
    NotFound,
    OutOfBounds,
    SuccessAllAir,
}

impl SubChunkResult {
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Success,
            2 => Self::NotFound,
            5 => Self::OutOfBounds,
            6 => Self::SuccessAllAir,
            _ => Self::Undefined,
        }
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Undefined => 0,
            Self::Success => 1,
            Self::NotFound => 2,
            Self::OutOfBounds => 5,
            Self::SuccessAllAir => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_pos_maps_to_owning_chunk() {
        assert_eq!(BlockPos::new(0, 0, 0).chunk(), ChunkPos::new(0, 0));
        assert_eq!(BlockPos::new(15, 64, 15).chunk(), ChunkPos::new(0, 0));
        assert_eq!(BlockPos::new(16, 64, 31).chunk(), ChunkPos::new(1, 1));
        // Arithmetic shift keeps negatives correct.
        assert_eq!(BlockPos::new(-1, 0, -16).chunk(), ChunkPos::new(-1, -1));
        assert_eq!(BlockPos::new(-17, 0, -33).chunk(), ChunkPos::new(-2, -3));
    }

    #[test]
    fn sub_chunk_result_codes_roundtrip() {
        for result in [
            SubChunkResult::Undefined,
            SubChunkResult::Success,
            SubChunkResult::NotFound,
            SubChunkResult::OutOfBounds,
            SubChunkResult::SuccessAllAir,
        ] {
            assert_eq!(SubChunkResult::from_code(result.code()), result);
        }
        // Unknown codes collapse to Undefined.
        assert_eq!(SubChunkResult::from_code(99), SubChunkResult::Undefined);
    }
}
