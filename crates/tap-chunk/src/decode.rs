//! Network decode of full chunks and streamed subchunk entries.

use std::io::Read;

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::column::{Biomes, Column};
use crate::nbt::BlockNbt;
use crate::paletted::PalettedStorage;
use crate::slab::Slab;
use crate::{DimensionRange, Result};

/// Encoding variations negotiated at session start.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkDecodeOptions {
    /// Biomes are the flat pre-caves-and-cliffs 16x16 grid.
    pub legacy_biomes: bool,
    /// Block palette entries are FNV-1a hashes instead of dense ids.
    pub hashed_ids: bool,
}

/// Decode a full-chunk wire payload into a [`Column`].
///
/// `sub_chunk_count` must already be resolved by the caller: the
/// limited/limitless sentinels decode zero slabs up front and rely on
/// follow-up subchunk packets. An empty payload is a defined no-op and
/// yields `None` ("empty chunk", not an error).
pub fn decode_network_chunk(
    payload: &[u8],
    sub_chunk_count: u32,
    range: DimensionRange,
    opts: ChunkDecodeOptions,
) -> Result<Option<Column>> {
    if payload.is_empty() {
        return Ok(None);
    }

    let mut cursor = payload;
    let mut column = Column::new(range);

    for i in 0..sub_chunk_count {
        let mut y_index = i as u8;
        let slab = Slab::decode(&mut cursor, &mut y_index)?;
        // Version-9 slabs carry an absolute vertical chunk coordinate;
        // older versions count up from the bottom of the range.
        let index = if y_index == i as u8 {
            i as usize
        } else {
            let absolute = i32::from(y_index as i8);
            let relative = absolute - range.min_slab();
            usize::try_from(relative)
                .map_err(|_| crate::ChunkError::SlabIndexOutOfRange(absolute))?
        };
        column.set_slab(index, slab);
    }

    column.biomes = decode_biomes(&mut cursor, range, opts.legacy_biomes)?;

    // Border blocks: count byte plus payload, carried but unused here.
    let border_len = cursor.read_u8()? as usize;
    let mut border = vec![0u8; border_len];
    cursor.read_exact(&mut border)?;

    while !cursor.is_empty() {
        let nbt = BlockNbt::decode(&mut cursor)?;
        column.set_block_nbt(nbt, false);
    }

    Ok(Some(column))
}

fn decode_biomes(cursor: &mut &[u8], range: DimensionRange, legacy: bool) -> Result<Biomes> {
    if legacy {
        let mut grid = [0u8; 256];
        cursor.read_exact(&mut grid)?;
        Ok(Biomes::Legacy(Box::new(grid)))
    } else {
        let mut grids = Vec::with_capacity(range.slab_count());
        for _ in 0..range.slab_count() {
            grids.push(PalettedStorage::decode(cursor)?);
        }
        Ok(Biomes::Paletted(grids))
    }
}

/// Decode one subchunk entry payload: a single slab followed by any
/// number of block metadata blobs in the same buffer.
///
/// `y_index` carries the absolute vertical chunk coordinate in and out;
/// a version-9 slab overwrites it from the wire.
pub fn decode_sub_chunk_entry(
    payload: &[u8],
    y_index: &mut u8,
) -> Result<(Slab, Vec<BlockNbt>)> {
    let mut cursor = payload;
    let slab = Slab::decode(&mut cursor, y_index)?;

    let mut blobs = Vec::new();
    while !cursor.is_empty() {
        blobs.push(BlockNbt::decode(&mut cursor)?);
    }
    Ok((slab, blobs))
}

/// Re-encode a column into a full-chunk wire payload.
///
/// Every slab position is emitted (missing slabs as uniform air), so the
/// result decodes with `sub_chunk_count = range.slab_count()`.
pub fn encode_network_chunk(
    column: &Column,
    air_id: u32,
    opts: ChunkDecodeOptions,
) -> Result<(Vec<u8>, u32)> {
    let range = column.range();
    let mut payload = Vec::new();

    for i in 0..range.slab_count() {
        let absolute = (range.min_slab() + i as i32) as u8;
        match column.slab(i) {
            Some(slab) => slab.encode(&mut payload, absolute)?,
            None => Slab::filled(air_id).encode(&mut payload, absolute)?,
        }
    }

    // The biome layout follows the negotiated encoding, not whatever
    // the column happens to hold; a mismatch falls back to zero biomes.
    match (&column.biomes, opts.legacy_biomes) {
        (Biomes::Legacy(grid), true) => payload.extend_from_slice(grid.as_ref()),
        (Biomes::Paletted(_), true) => payload.extend_from_slice(&[0u8; 256]),
        (Biomes::Paletted(grids), false) => {
            for grid in grids {
                grid.encode(&mut payload)?;
            }
        }
        (Biomes::Legacy(_), false) => {
            for _ in 0..range.slab_count() {
                PalettedStorage::filled(0).encode(&mut payload)?;
            }
        }
    }

    payload.write_u8(0)?; // no border blocks

    for nbt in column.block_entities.values() {
        nbt.encode(&mut payload)?;
    }

    Ok((payload, range.slab_count() as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BlockRegistry;
    use tap_protocol::BlockPos;

    fn build_column(reg: &BlockRegistry) -> Column {
        let stone = reg.id_for("minecraft:stone").unwrap();
        let grass = reg.id_for("minecraft:grass_block").unwrap();
        let mut column = Column::new(DimensionRange::OVERWORLD);
        for x in 0..16u8 {
            for z in 0..16u8 {
                for y in 0..4 {
                    column.set_block(x, y, z, stone, reg);
                }
                column.set_block(x, 4, z, grass, reg);
            }
        }
        column.set_block_nbt(BlockNbt::new("Chest", BlockPos::new(3, 2, 3)), false);
        column
    }

    #[test]
    fn empty_payload_is_a_defined_no_op() {
        let out = decode_network_chunk(
            &[],
            4,
            DimensionRange::OVERWORLD,
            ChunkDecodeOptions::default(),
        )
        .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn full_chunk_roundtrip_preserves_slab_data() {
        let reg = BlockRegistry::vanilla();
        let column = build_column(&reg);
        let opts = ChunkDecodeOptions::default();

        let (payload, count) = encode_network_chunk(&column, reg.air_id(), opts).unwrap();
        let decoded = decode_network_chunk(&payload, count, column.range(), opts)
            .unwrap()
            .unwrap();

        // Reference property: decode -> encode -> decode is identical
        // at the slab level.
        let (payload2, count2) = encode_network_chunk(&decoded, reg.air_id(), opts).unwrap();
        assert_eq!(count, count2);
        let decoded2 = decode_network_chunk(&payload2, count2, column.range(), opts)
            .unwrap()
            .unwrap();
        assert_eq!(decoded.slabs(), decoded2.slabs());

        let stone = reg.id_for("minecraft:stone").unwrap();
        assert_eq!(decoded.block_at(7, 1, 7, &reg), stone);
        assert!(decoded
            .block_entities
            .contains_key(&BlockPos::new(3, 2, 3)));
    }

    #[test]
    fn truncated_payload_fails_hard() {
        let reg = BlockRegistry::vanilla();
        let column = build_column(&reg);
        let opts = ChunkDecodeOptions::default();
        let (payload, count) = encode_network_chunk(&column, reg.air_id(), opts).unwrap();

        let err = decode_network_chunk(&payload[..payload.len() / 2], count, column.range(), opts);
        assert!(err.is_err());
    }

    #[test]
    fn sub_chunk_entry_carries_trailing_blobs() {
        let reg = BlockRegistry::vanilla();
        let stone = reg.id_for("minecraft:stone").unwrap();
        let mut slab = Slab::filled(reg.air_id());
        slab.set_block(0, 0, 0, stone, reg.air_id());

        let mut payload = Vec::new();
        slab.encode(&mut payload, 2).unwrap();
        BlockNbt::new("Sign", BlockPos::new(0, 32, 0))
            .encode(&mut payload)
            .unwrap();

        let mut y_index = 0u8;
        let (decoded, blobs) = decode_sub_chunk_entry(&payload, &mut y_index).unwrap();
        assert_eq!(y_index, 2);
        assert_eq!(decoded.block(0, 0, 0, 0, reg.air_id()), stone);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].id, "Sign");
    }
}
