//! The worlds handler: consumes a session's packet stream, rebuilds the
//! world in a [`tap_world::WorldStore`], and feeds the map preview.

use serde::{Deserialize, Serialize};
use tap_protocol::ChunkPos;
use thiserror::Error;

mod handler;

pub use handler::{SessionWorld, WorldsHandler};

/// Per-session behavior switches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorldSettings {
    /// Track mobile entities alongside terrain.
    pub save_entities: bool,
    /// Attach decoded block metadata blobs to their columns.
    pub save_block_nbt: bool,
    /// Drive the live map preview.
    pub render_preview: bool,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            save_entities: true,
            save_block_nbt: true,
            render_preview: true,
        }
    }
}

/// Progress reporting collaborator, implemented by the UI layer. Called
/// with the running chunk total after every stored column.
pub trait ProgressSink: Send + Sync {
    fn chunk_count(&self, count: usize);
}

/// Fatal world-reconstruction failure. Anything here means the session's
/// stored state can no longer be trusted.
#[derive(Debug, Error)]
pub enum WorldsError {
    /// Protocol ordering violation: slab data arrived for a position
    /// whose column was never stored.
    #[error("subchunk received before chunk at {pos:?}")]
    SubChunkBeforeChunk { pos: ChunkPos },

    #[error("chunk decode failed: {0}")]
    Chunk(#[from] tap_chunk::ChunkError),
}

pub type Result<T> = std::result::Result<T, WorldsError>;
