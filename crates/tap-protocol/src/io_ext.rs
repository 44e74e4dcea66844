//! Little-endian varint and string primitives.
//!
//! The wire format uses unsigned LEB128 varints; signed values are
//! zigzag-encoded on top of them. Strings are varuint-length-prefixed
//! UTF-8.

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::{ProtocolError, Result};

pub fn read_varu32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut result = 0u32;
    let mut shift = 0;
    loop {
        let byte = reader.read_u8()?;
        result |= u32::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 35 {
            return Err(ProtocolError::VarIntTooLarge);
        }
    }
}

pub fn write_varu32<W: Write>(writer: &mut W, mut value: u32) -> Result<()> {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        writer.write_u8(byte)?;
        if value == 0 {
            return Ok(());
        }
    }
}

pub fn read_varu64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0;
    loop {
        let byte = reader.read_u8()?;
        result |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 70 {
            return Err(ProtocolError::VarIntTooLarge);
        }
    }
}

pub fn write_varu64<W: Write>(writer: &mut W, mut value: u64) -> Result<()> {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        writer.write_u8(byte)?;
        if value == 0 {
            return Ok(());
        }
    }
}

/// Zigzag-encoded signed 32-bit varint.
pub fn read_vari32<R: Read>(reader: &mut R) -> Result<i32> {
    let raw = read_varu32(reader)?;
    Ok(((raw >> 1) as i32) ^ -((raw & 1) as i32))
}

pub fn write_vari32<W: Write>(writer: &mut W, value: i32) -> Result<()> {
    write_varu32(writer, (value.wrapping_shl(1) ^ (value >> 31)) as u32)
}

/// Zigzag-encoded signed 64-bit varint.
pub fn read_vari64<R: Read>(reader: &mut R) -> Result<i64> {
    let raw = read_varu64(reader)?;
    Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
}

pub fn write_vari64<W: Write>(writer: &mut W, value: i64) -> Result<()> {
    write_varu64(writer, (value.wrapping_shl(1) ^ (value >> 63)) as u64)
}

pub fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = read_varu32(reader)? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}

pub fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    write_varu32(writer, value.len() as u32)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}
