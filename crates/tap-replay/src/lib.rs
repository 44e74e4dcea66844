//! Framed replay container and the driver that feeds a capture through
//! the same handler interface a live session uses.

use thiserror::Error;

mod drive;
mod format;

pub use drive::{replay, replay_file, ReplayStats};
pub use format::{Frame, ReplayReader, ReplayWriter, CURRENT_VERSION, MAGIC};

/// Replay container failure. Frame numbers are 1-based.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame start sentinel mismatch: the stream is desynchronized.
    #[error("wrong magic at frame {frame}")]
    WrongMagic { frame: u64 },

    /// Frame end sentinel mismatch.
    #[error("wrong magic2 at frame {frame}")]
    WrongEndMagic { frame: u64 },

    /// The file ended mid-frame.
    #[error("truncated at frame {frame}")]
    Truncated { frame: u64 },

    /// A frame payload failed to decode as a packet batch.
    #[error("protocol error: {0}")]
    Protocol(#[from] tap_protocol::ProtocolError),
}

pub type Result<T> = std::result::Result<T, ReplayError>;
