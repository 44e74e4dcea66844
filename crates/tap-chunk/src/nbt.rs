//! Typed block metadata blobs.
//!
//! Blocks that carry extra state (containers, signs, spawners) attach a
//! small key-value record keyed by its exact block position. The wire
//! form is a network-little-endian tagged compound: tag byte, varuint
//! length-prefixed name, value; zigzag varints for integers; a zero tag
//! terminates the compound.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use tap_protocol::{
    read_string, read_vari32, read_vari64, write_string, write_vari32, write_vari64, BlockPos,
};

use crate::{ChunkError, Result};

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_STRING: u8 = 8;

/// One declared extra field of a block metadata blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NbtValue {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl NbtValue {
    const fn tag(&self) -> u8 {
        match self {
            Self::Byte(_) => TAG_BYTE,
            Self::Short(_) => TAG_SHORT,
            Self::Int(_) => TAG_INT,
            Self::Long(_) => TAG_LONG,
            Self::Float(_) => TAG_FLOAT,
            Self::Double(_) => TAG_DOUBLE,
            Self::String(_) => TAG_STRING,
        }
    }

    fn decode<R: Read>(tag: u8, reader: &mut R) -> Result<Self> {
        Ok(match tag {
            TAG_BYTE => Self::Byte(reader.read_i8()?),
            TAG_SHORT => Self::Short(reader.read_i16::<LittleEndian>()?),
            TAG_INT => Self::Int(read_vari32(reader)?),
            TAG_LONG => Self::Long(read_vari64(reader)?),
            TAG_FLOAT => Self::Float(reader.read_f32::<LittleEndian>()?),
            TAG_DOUBLE => Self::Double(reader.read_f64::<LittleEndian>()?),
            TAG_STRING => Self::String(read_string(reader)?),
            other => return Err(ChunkError::UnknownNbtTag(other)),
        })
    }

    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Self::Byte(v) => writer.write_i8(*v)?,
            Self::Short(v) => writer.write_i16::<LittleEndian>(*v)?,
            Self::Int(v) => write_vari32(writer, *v)?,
            Self::Long(v) => write_vari64(writer, *v)?,
            Self::Float(v) => writer.write_f32::<LittleEndian>(*v)?,
            Self::Double(v) => writer.write_f64::<LittleEndian>(*v)?,
            Self::String(v) => write_string(writer, v)?,
        }
        Ok(())
    }
}

/// A block metadata blob: identifier, owning position, declared extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockNbt {
    /// Block entity identifier, e.g. `Chest`.
    pub id: String,
    pub pos: BlockPos,
    pub extra: BTreeMap<String, NbtValue>,
}

impl BlockNbt {
    #[must_use]
    pub fn new(id: impl Into<String>, pos: BlockPos) -> Self {
        Self {
            id: id.into(),
            pos,
            extra: BTreeMap::new(),
        }
    }

    /// Merge `other` into `self`: every field present in `other` wins,
    /// fields only present in `self` survive.
    pub fn merge(&mut self, other: Self) {
        self.id = other.id;
        self.pos = other.pos;
        for (key, value) in other.extra {
            self.extra.insert(key, value);
        }
    }

    /// Decode one compound from the reader.
    ///
    /// The `id` and position fields are required; everything else lands
    /// in `extra`.
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let mut id = None;
        let mut x = None;
        let mut y = None;
        let mut z = None;
        let mut extra = BTreeMap::new();

        loop {
            let tag = reader.read_u8()?;
            if tag == TAG_END {
                break;
            }
            let name = read_string(reader)?;
            let value = NbtValue::decode(tag, reader)?;
            match (name.as_str(), &value) {
                ("id", NbtValue::String(s)) => id = Some(s.clone()),
                ("x", NbtValue::Int(v)) => x = Some(*v),
                ("y", NbtValue::Int(v)) => y = Some(*v),
                ("z", NbtValue::Int(v)) => z = Some(*v),
                _ => {
                    extra.insert(name, value);
                }
            }
        }

        Ok(Self {
            id: id.ok_or(ChunkError::MissingNbtField("id"))?,
            pos: BlockPos::new(
                x.ok_or(ChunkError::MissingNbtField("x"))?,
                y.ok_or(ChunkError::MissingNbtField("y"))?,
                z.ok_or(ChunkError::MissingNbtField("z"))?,
            ),
            extra,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        let write_field = |writer: &mut W, name: &str, value: &NbtValue| -> Result<()> {
            writer.write_u8(value.tag())?;
            write_string(writer, name)?;
            value.encode(writer)
        };
        write_field(writer, "id", &NbtValue::String(self.id.clone()))?;
        write_field(writer, "x", &NbtValue::Int(self.pos.x))?;
        write_field(writer, "y", &NbtValue::Int(self.pos.y))?;
        write_field(writer, "z", &NbtValue::Int(self.pos.z))?;
        for (name, value) in &self.extra {
            write_field(writer, name, value)?;
        }
        writer.write_u8(TAG_END)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chest() -> BlockNbt {
        let mut nbt = BlockNbt::new("Chest", BlockPos::new(5, 70, -3));
        nbt.extra
            .insert("CustomName".into(), NbtValue::String("loot".into()));
        nbt.extra.insert("Items".into(), NbtValue::Int(3));
        nbt
    }

    #[test]
    fn compound_roundtrip() {
        let nbt = chest();
        let mut buf = Vec::new();
        nbt.encode(&mut buf).unwrap();
        let decoded = BlockNbt::decode(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, nbt);
    }

    #[test]
    fn missing_position_is_an_error() {
        let mut buf = Vec::new();
        buf.push(TAG_STRING);
        write_string(&mut buf, "id").unwrap();
        write_string(&mut buf, "Sign").unwrap();
        buf.push(TAG_END);
        assert!(matches!(
            BlockNbt::decode(&mut buf.as_slice()),
            Err(ChunkError::MissingNbtField("x"))
        ));
    }

    #[test]
    fn merge_overwrites_common_fields_and_keeps_the_rest() {
        let mut base = chest();
        let mut update = BlockNbt::new("Chest", BlockPos::new(5, 70, -3));
        update
            .extra
            .insert("Items".into(), NbtValue::Int(9));

        base.merge(update);
        assert_eq!(base.extra["Items"], NbtValue::Int(9));
        // Field absent from the update survives.
        assert_eq!(base.extra["CustomName"], NbtValue::String("loot".into()));
    }

    #[test]
    fn unknown_tag_fails_hard() {
        let buf = [42u8, 0u8];
        assert!(matches!(
            BlockNbt::decode(&mut buf.as_slice()),
            Err(ChunkError::UnknownNbtTag(42))
        ));
    }
}
