//! Packed paletted storage, the unit both block layers and modern
//! biome grids are encoded with.
//!
//! Wire layout: one header byte (`bits_per_entry << 1 | 1` for network
//! encoding), then ceil(4096 / entries_per_word) little-endian u32
//! words, then a zigzag-varint palette size and palette entries.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tap_protocol::{read_vari32, write_vari32};

use crate::{ChunkError, Result};

const ENTRIES: usize = 4096;
const NETWORK_FLAG: u8 = 1;

/// Minimum bits per entry able to index a palette of the given size.
const fn bits_for_palette(len: usize) -> u8 {
    match len {
        0..=1 => 0,
        2 => 1,
        3..=4 => 2,
        5..=8 => 3,
        9..=16 => 4,
        17..=32 => 5,
        33..=64 => 6,
        65..=256 => 8,
        _ => 16,
    }
}

/// 16x16x16 entries packed into u32 words, indexing a palette of
/// runtime ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalettedStorage {
    bits: u8,
    words: Vec<u32>,
    palette: Vec<u32>,
}

impl PalettedStorage {
    /// Storage filled with a single palette entry.
    #[must_use]
    pub fn filled(value: u32) -> Self {
        Self {
            bits: 0,
            words: Vec::new(),
            palette: vec![value],
        }
    }

    #[must_use]
    pub fn palette(&self) -> &[u32] {
        &self.palette
    }

    /// Entry index for local coordinates, each in `0..16`.
    const fn index(x: u8, y: u8, z: u8) -> usize {
        ((x as usize) << 8) | ((z as usize) << 4) | (y as usize)
    }

    /// Palette value at local coordinates.
    #[must_use]
    pub fn at(&self, x: u8, y: u8, z: u8) -> u32 {
        if self.bits == 0 {
            return self.palette.first().copied().unwrap_or_default();
        }
        let per_word = 32 / self.bits as usize;
        let index = Self::index(x, y, z);
        let word = self.words[index / per_word];
        let shift = (index % per_word) * self.bits as usize;
        let mask = (1u32 << self.bits) - 1;
        let palette_index = ((word >> shift) & mask) as usize;
        self.palette.get(palette_index).copied().unwrap_or_default()
    }

    /// Set the value at local coordinates, growing the palette as needed.
    pub fn set(&mut self, x: u8, y: u8, z: u8, value: u32) {
        let palette_index = match self.palette.iter().position(|&v| v == value) {
            Some(i) => i,
            None => {
                self.palette.push(value);
                self.repack_for_palette();
                self.palette.len() - 1
            }
        };
        if self.bits == 0 {
            return; // single-entry storage, nothing to write
        }
        let per_word = 32 / self.bits as usize;
        let index = Self::index(x, y, z);
        let shift = (index % per_word) * self.bits as usize;
        let mask = (1u32 << self.bits) - 1;
        let word = &mut self.words[index / per_word];
        *word = (*word & !(mask << shift)) | ((palette_index as u32 & mask) << shift);
    }

    /// Widen the packed words if the palette outgrew the current width.
    fn repack_for_palette(&mut self) {
        let needed = bits_for_palette(self.palette.len());
        if needed <= self.bits {
            return;
        }
        let old = self.clone();
        self.bits = needed;
        let per_word = 32 / needed as usize;
        self.words = vec![0u32; ENTRIES.div_ceil(per_word)];
        for x in 0..16u8 {
            for z in 0..16u8 {
                for y in 0..16u8 {
                    let value = old.at(x, y, z);
                    let palette_index =
                        self.palette.iter().position(|&v| v == value).unwrap_or(0) as u32;
                    let index = Self::index(x, y, z);
                    let shift = (index % per_word) * needed as usize;
                    let mask = (1u32 << needed) - 1;
                    let word = &mut self.words[index / per_word];
                    *word = (*word & !(mask << shift)) | ((palette_index & mask) << shift);
                }
            }
        }
    }

    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let header = reader.read_u8()?;
        if header & NETWORK_FLAG == 0 {
            return Err(ChunkError::BadStorageHeader(header));
        }
        let bits = header >> 1;
        if bits > 16 {
            return Err(ChunkError::BadStorageHeader(header));
        }

        let words = if bits == 0 {
            Vec::new()
        } else {
            let per_word = 32 / bits as usize;
            let word_count = ENTRIES.div_ceil(per_word);
            let mut words = Vec::with_capacity(word_count);
            for _ in 0..word_count {
                words.push(reader.read_u32::<LittleEndian>()?);
            }
            words
        };

        let palette_len = if bits == 0 { 1 } else { read_vari32(reader)? };
        // The length comes off the wire; never reserve more than a full
        // storage could reference.
        let mut palette = Vec::with_capacity((palette_len.max(0) as usize).min(ENTRIES));
        for _ in 0..palette_len {
            palette.push(read_vari32(reader)? as u32);
        }
        Ok(Self {
            bits,
            words,
            palette,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8((self.bits << 1) | NETWORK_FLAG)?;
        for word in &self.words {
            writer.write_u32::<LittleEndian>(*word)?;
        }
        if self.bits != 0 {
            write_vari32(writer, self.palette.len() as i32)?;
        }
        for entry in &self.palette {
            write_vari32(writer, *entry as i32)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_storage_reads_same_value_everywhere() {
        let storage = PalettedStorage::filled(42);
        assert_eq!(storage.at(0, 0, 0), 42);
        assert_eq!(storage.at(15, 15, 15), 42);
    }

    #[test]
    fn set_grows_palette_and_keeps_old_entries() {
        let mut storage = PalettedStorage::filled(1);
        storage.set(3, 7, 9, 2);
        storage.set(0, 0, 0, 3);
        assert_eq!(storage.at(3, 7, 9), 2);
        assert_eq!(storage.at(0, 0, 0), 3);
        assert_eq!(storage.at(5, 5, 5), 1);
        assert_eq!(storage.palette().len(), 3);
    }

    #[test]
    fn wide_palette_roundtrips() {
        let mut storage = PalettedStorage::filled(0);
        // Force several bit-width bumps.
        for i in 0..40u32 {
            storage.set((i % 16) as u8, (i / 16) as u8, 0, 1000 + i);
        }
        let mut buf = Vec::new();
        storage.encode(&mut buf).unwrap();
        let decoded = PalettedStorage::decode(&mut buf.as_slice()).unwrap();
        for i in 0..40u32 {
            assert_eq!(decoded.at((i % 16) as u8, (i / 16) as u8, 0), 1000 + i);
        }
    }

    #[test]
    fn single_entry_roundtrip() {
        let storage = PalettedStorage::filled(7);
        let mut buf = Vec::new();
        storage.encode(&mut buf).unwrap();
        assert_eq!(buf[0], 1); // bits 0, network flag
        let decoded = PalettedStorage::decode(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded.at(8, 8, 8), 7);
    }

    #[test]
    fn hostile_palette_length_fails_instead_of_reserving() {
        // bits 1, full word block, then a palette length claiming far
        // more entries than the buffer holds.
        let mut buf = vec![0x03u8];
        buf.extend_from_slice(&[0u8; 128 * 4]);
        write_vari32(&mut buf, i32::MAX).unwrap();
        assert!(PalettedStorage::decode(&mut buf.as_slice()).is_err());
    }

    #[test]
    fn persistence_header_is_rejected() {
        // Header without the network flag bit set.
        let buf = [0x02u8];
        assert!(matches!(
            PalettedStorage::decode(&mut buf.as_slice()),
            Err(ChunkError::BadStorageHeader(0x02))
        ));
    }
}
