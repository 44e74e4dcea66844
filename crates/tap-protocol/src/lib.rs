//! Wire-level protocol support for voxeltap.
//!
//! Everything here is a pure transformation between bytes and typed
//! values: little-endian varint primitives, the packet set the world
//! reconstruction pipeline consumes, and the deflate batch codec that
//! frames packets on the wire (and inside replay captures).

use std::io;

use thiserror::Error;

mod batch;
mod io_ext;
mod packets;
mod types;

pub use batch::{BATCH_HEADER, BatchCodec};
pub use io_ext::{
    read_string, read_vari32, read_vari64, read_varu32, read_varu64, write_string, write_vari32,
    write_vari64, write_varu32, write_varu64,
};
pub use packets::{
    ActorLink, ActorLinkKind, AddActor, Animate, InventoryContent, ItemInstance, LevelChunk,
    MapInfoRequest, MapItemData, MoveActorAbsolute, MovePlayer, Packet, RemoveActor, SetActorLink,
    StartGame, SubChunk, SubChunkEntry, SubChunkRequest, ANIMATE_ACTION_SWING_ARM,
    MAP_UPDATE_INITIALISATION, MAP_UPDATE_TEXTURE, SUB_CHUNK_COUNT_LIMITED,
    SUB_CHUNK_COUNT_LIMITLESS,
};
pub use types::{BlockPos, ChunkPos, Direction, SubChunkResult};

/// Protocol-level decode/encode error.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// IO error while reading or writing.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A varint ran past its maximum width.
    #[error("varint too large")]
    VarIntTooLarge,

    /// A length-prefixed string was not valid UTF-8.
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Batch payload did not start with the batch header byte.
    #[error("bad batch header: {0:#04x}")]
    BadBatchHeader(u8),

    /// An enum field carried a value outside its known variants.
    #[error("invalid enum variant: {0}")]
    InvalidEnumVariant(i32),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
