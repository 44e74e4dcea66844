//! The on-disk capture format.
//!
//! Layout: an optional 8-byte header (magic plus little-endian format
//! version), then frames back to back. Each frame is a start sentinel,
//! a payload length, a direction byte, a millisecond timestamp from
//! version 2 on, the raw batch payload, and an end sentinel. A file
//! that does not open with the magic is a version-1 capture whose first
//! four bytes already belong to frame 1.

use std::io::{Read, Seek, SeekFrom, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tap_protocol::Direction;

use crate::{ReplayError, Result};

pub const MAGIC: [u8; 4] = *b"VTRP";
pub const CURRENT_VERSION: u32 = 2;

const FRAME_START: u32 = 0xAAAA_AAAA;
const FRAME_END: u32 = 0xBBBB_BBBB;

/// One captured packet batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub direction: Direction,
    /// Capture time; `UNIX_EPOCH` in version-1 files, which carry none.
    pub timestamp: SystemTime,
    pub payload: Vec<u8>,
}

/// Sequential capture writer. The header goes out on construction.
pub struct ReplayWriter<W: Write> {
    inner: W,
}

impl<W: Write> ReplayWriter<W> {
    pub fn new(mut inner: W) -> Result<Self> {
        inner.write_all(&MAGIC)?;
        inner.write_u32::<LittleEndian>(CURRENT_VERSION)?;
        Ok(Self { inner })
    }

    pub fn write_frame(
        &mut self,
        direction: Direction,
        timestamp: SystemTime,
        payload: &[u8],
    ) -> Result<()> {
        let millis = timestamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as i64;
        self.inner.write_u32::<LittleEndian>(FRAME_START)?;
        self.inner.write_u32::<LittleEndian>(payload.len() as u32)?;
        self.inner.write_u8(u8::from(direction.to_server()))?;
        self.inner.write_i64::<LittleEndian>(millis)?;
        self.inner.write_all(payload)?;
        self.inner.write_u32::<LittleEndian>(FRAME_END)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Sequential capture reader. Single pass; the only seek is the initial
/// rewind when the header probe finds no magic.
pub struct ReplayReader<R: Read + Seek> {
    inner: R,
    version: u32,
    frame: u64,
}

impl<R: Read + Seek> ReplayReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let mut probe = [0u8; 4];
        let n = fill(&mut inner, &mut probe)?;
        let version = if n == 4 && probe == MAGIC {
            inner.read_u32::<LittleEndian>()?
        } else {
            // Headerless capture: those bytes belong to frame 1.
            inner.seek(SeekFrom::Current(-(n as i64)))?;
            1
        };
        Ok(Self {
            inner,
            version,
            frame: 0,
        })
    }

    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Read the next frame; `None` at a clean end of file.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut start = [0u8; 4];
        let n = fill(&mut self.inner, &mut start)?;
        if n == 0 {
            return Ok(None);
        }
        self.frame += 1;
        if n < 4 {
            return Err(ReplayError::Truncated { frame: self.frame });
        }
        if u32::from_le_bytes(start) != FRAME_START {
            return Err(ReplayError::WrongMagic { frame: self.frame });
        }

        let len = self.read_or_truncated(|r| r.read_u32::<LittleEndian>())? as usize;
        let to_server = self.read_or_truncated(ReadBytesExt::read_u8)? != 0;
        let timestamp = if self.version >= 2 {
            let millis = self.read_or_truncated(|r| r.read_i64::<LittleEndian>())?;
            UNIX_EPOCH + Duration::from_millis(millis.max(0) as u64)
        } else {
            UNIX_EPOCH
        };

        let mut payload = vec![0u8; len];
        self.read_or_truncated(|r| r.read_exact(&mut payload))?;

        let end = self.read_or_truncated(|r| r.read_u32::<LittleEndian>())?;
        if end != FRAME_END {
            return Err(ReplayError::WrongEndMagic { frame: self.frame });
        }

        Ok(Some(Frame {
            direction: Direction::from_to_server(to_server),
            timestamp,
            payload,
        }))
    }

    fn read_or_truncated<T>(
        &mut self,
        read: impl FnOnce(&mut R) -> std::io::Result<T>,
    ) -> Result<T> {
        read(&mut self.inner).map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                ReplayError::Truncated { frame: self.frame }
            } else {
                ReplayError::Io(err)
            }
        })
    }
}

/// Read up to `buf.len()` bytes, returning how many arrived before EOF.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
