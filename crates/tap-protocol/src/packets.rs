//! Packet definitions for the world-reconstruction pipeline.
//!
//! Only the packets the core consumes are given typed layouts; everything
//! else passes through as [`Packet::Unknown`] so captures and replays stay
//! lossless.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::io_ext::{
    read_string, read_vari32, read_vari64, read_varu32, read_varu64, write_string, write_vari32,
    write_vari64, write_varu32, write_varu64,
};
use crate::types::{BlockPos, ChunkPos, SubChunkResult};
use crate::Result;

/// `sub_chunk_count` sentinel: vertical range is streamed, bounded by
/// the highest-subchunk field.
pub const SUB_CHUNK_COUNT_LIMITED: u32 = u32::MAX - 1;
/// `sub_chunk_count` sentinel: vertical range is streamed, unbounded.
pub const SUB_CHUNK_COUNT_LIMITLESS: u32 = u32::MAX;

/// Map update flag: packet carries a pixel texture.
pub const MAP_UPDATE_TEXTURE: u32 = 1 << 1;
/// Map update flag: first announcement of a map item.
pub const MAP_UPDATE_INITIALISATION: u32 = 1 << 3;

/// Animate action for an arm swing (used as the zoom gesture).
pub const ANIMATE_ACTION_SWING_ARM: i32 = 1;

const ID_START_GAME: u32 = 0x0B;
const ID_ADD_ACTOR: u32 = 0x0D;
const ID_REMOVE_ACTOR: u32 = 0x0E;
const ID_MOVE_ACTOR_ABSOLUTE: u32 = 0x12;
const ID_MOVE_PLAYER: u32 = 0x13;
const ID_SET_ACTOR_LINK: u32 = 0x29;
const ID_ANIMATE: u32 = 0x2C;
const ID_INVENTORY_CONTENT: u32 = 0x31;
const ID_LEVEL_CHUNK: u32 = 0x3A;
const ID_MAP_ITEM_DATA: u32 = 0x43;
const ID_MAP_INFO_REQUEST: u32 = 0x44;
const ID_SUB_CHUNK: u32 = 0xAE;
const ID_SUB_CHUNK_REQUEST: u32 = 0xAF;

fn read_f32<R: Read>(reader: &mut R) -> Result<f32> {
    Ok(reader.read_f32::<LittleEndian>()?)
}

fn write_f32<W: Write>(writer: &mut W, value: f32) -> Result<()> {
    writer.write_f32::<LittleEndian>(value)?;
    Ok(())
}

fn read_vec3<R: Read>(reader: &mut R) -> Result<[f32; 3]> {
    Ok([read_f32(reader)?, read_f32(reader)?, read_f32(reader)?])
}

fn write_vec3<W: Write>(writer: &mut W, value: [f32; 3]) -> Result<()> {
    for v in value {
        write_f32(writer, v)?;
    }
    Ok(())
}

fn read_payload<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let len = read_varu32(reader)? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn write_payload<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    write_varu32(writer, payload.len() as u32)?;
    writer.write_all(payload)?;
    Ok(())
}

/// Connection bring-up packet carrying the per-session world context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartGame {
    pub entity_unique_id: i64,
    pub entity_runtime_id: u64,
    pub player_position: [f32; 3],
    pub pitch: f32,
    pub yaw: f32,
    pub world_seed: i64,
    pub dimension: i32,
    pub world_spawn: BlockPos,
    pub world_name: String,
    pub base_game_version: String,
    /// Server sends the pre-caves-and-cliffs 2D biome grid.
    pub legacy_biomes: bool,
    /// Block palette entries are FNV-1a hashes instead of dense ids.
    pub hashed_block_ids: bool,
    /// Custom block names appended to the vanilla palette.
    pub custom_blocks: Vec<String>,
}

impl StartGame {
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let entity_unique_id = read_vari64(reader)?;
        let entity_runtime_id = read_varu64(reader)?;
        let player_position = read_vec3(reader)?;
        let pitch = read_f32(reader)?;
        let yaw = read_f32(reader)?;
        let world_seed = reader.read_i64::<LittleEndian>()?;
        let dimension = read_vari32(reader)?;
        let world_spawn = BlockPos::decode(reader)?;
        let world_name = read_string(reader)?;
        let base_game_version = read_string(reader)?;
        let legacy_biomes = reader.read_u8()? != 0;
        let hashed_block_ids = reader.read_u8()? != 0;
        let count = read_varu32(reader)?;
        let mut custom_blocks = Vec::with_capacity(count as usize);
        for _ in 0..count {
            custom_blocks.push(read_string(reader)?);
        }
        Ok(Self {
            entity_unique_id,
            entity_runtime_id,
            player_position,
            pitch,
            yaw,
            world_seed,
            dimension,
            world_spawn,
            world_name,
            base_game_version,
            legacy_biomes,
            hashed_block_ids,
            custom_blocks,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_vari64(writer, self.entity_unique_id)?;
        write_varu64(writer, self.entity_runtime_id)?;
        write_vec3(writer, self.player_position)?;
        write_f32(writer, self.pitch)?;
        write_f32(writer, self.yaw)?;
        writer.write_i64::<LittleEndian>(self.world_seed)?;
        write_vari32(writer, self.dimension)?;
        self.world_spawn.encode(writer)?;
        write_string(writer, &self.world_name)?;
        write_string(writer, &self.base_game_version)?;
        writer.write_u8(u8::from(self.legacy_biomes))?;
        writer.write_u8(u8::from(self.hashed_block_ids))?;
        write_varu32(writer, self.custom_blocks.len() as u32)?;
        for name in &self.custom_blocks {
            write_string(writer, name)?;
        }
        Ok(())
    }
}

/// A full vertical chunk column, possibly streamed.
#[derive(Debug, Clone, Default)]
pub struct LevelChunk {
    pub position: ChunkPos,
    pub dimension: i32,
    pub sub_chunk_count: u32,
    /// Only meaningful when `sub_chunk_count == SUB_CHUNK_COUNT_LIMITED`.
    pub highest_sub_chunk: u16,
    pub cache_enabled: bool,
    pub raw_payload: Vec<u8>,
}

impl LevelChunk {
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let position = ChunkPos::decode(reader)?;
        let dimension = read_vari32(reader)?;
        let sub_chunk_count = read_varu32(reader)?;
        let highest_sub_chunk = if sub_chunk_count == SUB_CHUNK_COUNT_LIMITED {
            reader.read_u16::<LittleEndian>()?
        } else {
            0
        };
        let cache_enabled = reader.read_u8()? != 0;
        let raw_payload = read_payload(reader)?;
        Ok(Self {
            position,
            dimension,
            sub_chunk_count,
            highest_sub_chunk,
            cache_enabled,
            raw_payload,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.position.encode(writer)?;
        write_vari32(writer, self.dimension)?;
        write_varu32(writer, self.sub_chunk_count)?;
        if self.sub_chunk_count == SUB_CHUNK_COUNT_LIMITED {
            writer.write_u16::<LittleEndian>(self.highest_sub_chunk)?;
        }
        writer.write_u8(u8::from(self.cache_enabled))?;
        write_payload(writer, &self.raw_payload)
    }
}

/// One vertical slab delivered in a subchunk packet.
#[derive(Debug, Clone)]
pub struct SubChunkEntry {
    /// Offset from the packet's base position, one step per axis.
    pub offset: [i8; 3],
    pub result: SubChunkResult,
    pub raw_payload: Vec<u8>,
}

impl SubChunkEntry {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let mut offset = [0i8; 3];
        for o in &mut offset {
            *o = reader.read_i8()?;
        }
        let result = SubChunkResult::from_code(reader.read_u8()?);
        let raw_payload = read_payload(reader)?;
        Ok(Self {
            offset,
            result,
            raw_payload,
        })
    }

    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        for o in self.offset {
            writer.write_i8(o)?;
        }
        writer.write_u8(self.result.code())?;
        write_payload(writer, &self.raw_payload)
    }
}

/// Streamed follow-up delivery of vertical slabs.
#[derive(Debug, Clone, Default)]
pub struct SubChunk {
    pub cache_enabled: bool,
    pub dimension: i32,
    /// Base position: chunk X, vertical chunk index, chunk Z.
    pub position: [i32; 3],
    pub entries: Vec<SubChunkEntry>,
}

impl SubChunk {
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let cache_enabled = reader.read_u8()? != 0;
        let dimension = read_vari32(reader)?;
        let mut position = [0i32; 3];
        for p in &mut position {
            *p = read_vari32(reader)?;
        }
        let count = read_varu32(reader)?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push(SubChunkEntry::decode(reader)?);
        }
        Ok(Self {
            cache_enabled,
            dimension,
            position,
            entries,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(u8::from(self.cache_enabled))?;
        write_vari32(writer, self.dimension)?;
        for p in self.position {
            write_vari32(writer, p)?;
        }
        write_varu32(writer, self.entries.len() as u32)?;
        for entry in &self.entries {
            entry.encode(writer)?;
        }
        Ok(())
    }
}

/// Request for a bounded window of missing vertical slabs.
#[derive(Debug, Clone, Default)]
pub struct SubChunkRequest {
    pub dimension: i32,
    pub position: [i32; 3],
    pub offsets: Vec<[i8; 3]>,
}

impl SubChunkRequest {
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let dimension = read_vari32(reader)?;
        let mut position = [0i32; 3];
        for p in &mut position {
            *p = read_vari32(reader)?;
        }
        let count = read_varu32(reader)?;
        let mut offsets = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut offset = [0i8; 3];
            for o in &mut offset {
                *o = reader.read_i8()?;
            }
            offsets.push(offset);
        }
        Ok(Self {
            dimension,
            position,
            offsets,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_vari32(writer, self.dimension)?;
        for p in self.position {
            write_vari32(writer, p)?;
        }
        write_varu32(writer, self.offsets.len() as u32)?;
        for offset in &self.offsets {
            for o in offset {
                writer.write_i8(*o)?;
            }
        }
        Ok(())
    }
}

/// Player viewpoint movement, drives the map's viewer tracking.
#[derive(Debug, Clone, Default)]
pub struct MovePlayer {
    pub entity_runtime_id: u64,
    pub position: [f32; 3],
    pub pitch: f32,
    pub yaw: f32,
    pub head_yaw: f32,
    pub mode: u8,
    pub on_ground: bool,
}

impl MovePlayer {
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            entity_runtime_id: read_varu64(reader)?,
            position: read_vec3(reader)?,
            pitch: read_f32(reader)?,
            yaw: read_f32(reader)?,
            head_yaw: read_f32(reader)?,
            mode: reader.read_u8()?,
            on_ground: reader.read_u8()? != 0,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_varu64(writer, self.entity_runtime_id)?;
        write_vec3(writer, self.position)?;
        write_f32(writer, self.pitch)?;
        write_f32(writer, self.yaw)?;
        write_f32(writer, self.head_yaw)?;
        writer.write_u8(self.mode)?;
        writer.write_u8(u8::from(self.on_ground))?;
        Ok(())
    }
}

/// Kind of an actor-to-actor link event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorLinkKind {
    Remove,
    Rider,
    Passenger,
}

impl ActorLinkKind {
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Rider,
            2 => Self::Passenger,
            _ => Self::Remove,
        }
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Remove => 0,
            Self::Rider => 1,
            Self::Passenger => 2,
        }
    }
}

/// A mount/rider relation event between two actors.
#[derive(Debug, Clone)]
pub struct ActorLink {
    pub ridden_unique_id: i64,
    pub rider_unique_id: i64,
    pub kind: ActorLinkKind,
    pub immediate: bool,
}

impl ActorLink {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            ridden_unique_id: read_vari64(reader)?,
            rider_unique_id: read_vari64(reader)?,
            kind: ActorLinkKind::from_code(reader.read_u8()?),
            immediate: reader.read_u8()? != 0,
        })
    }

    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_vari64(writer, self.ridden_unique_id)?;
        write_vari64(writer, self.rider_unique_id)?;
        writer.write_u8(self.kind.code())?;
        writer.write_u8(u8::from(self.immediate))?;
        Ok(())
    }
}

/// A mobile entity entering tracking range.
#[derive(Debug, Clone, Default)]
pub struct AddActor {
    pub entity_unique_id: i64,
    pub entity_runtime_id: u64,
    pub actor_type: String,
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub pitch: f32,
    pub yaw: f32,
    pub head_yaw: f32,
    pub attributes: Vec<(String, f32)>,
    pub links: Vec<ActorLink>,
}

impl AddActor {
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let entity_unique_id = read_vari64(reader)?;
        let entity_runtime_id = read_varu64(reader)?;
        let actor_type = read_string(reader)?;
        let position = read_vec3(reader)?;
        let velocity = read_vec3(reader)?;
        let pitch = read_f32(reader)?;
        let yaw = read_f32(reader)?;
        let head_yaw = read_f32(reader)?;
        let attr_count = read_varu32(reader)?;
        let mut attributes = Vec::with_capacity(attr_count as usize);
        for _ in 0..attr_count {
            let name = read_string(reader)?;
            let value = read_f32(reader)?;
            attributes.push((name, value));
        }
        let link_count = read_varu32(reader)?;
        let mut links = Vec::with_capacity(link_count as usize);
        for _ in 0..link_count {
            links.push(ActorLink::decode(reader)?);
        }
        Ok(Self {
            entity_unique_id,
            entity_runtime_id,
            actor_type,
            position,
            velocity,
            pitch,
            yaw,
            head_yaw,
            attributes,
            links,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_vari64(writer, self.entity_unique_id)?;
        write_varu64(writer, self.entity_runtime_id)?;
        write_string(writer, &self.actor_type)?;
        write_vec3(writer, self.position)?;
        write_vec3(writer, self.velocity)?;
        write_f32(writer, self.pitch)?;
        write_f32(writer, self.yaw)?;
        write_f32(writer, self.head_yaw)?;
        write_varu32(writer, self.attributes.len() as u32)?;
        for (name, value) in &self.attributes {
            write_string(writer, name)?;
            write_f32(writer, *value)?;
        }
        write_varu32(writer, self.links.len() as u32)?;
        for link in &self.links {
            link.encode(writer)?;
        }
        Ok(())
    }
}

/// An entity leaving tracking range.
#[derive(Debug, Clone, Default)]
pub struct RemoveActor {
    pub entity_unique_id: i64,
}

impl RemoveActor {
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            entity_unique_id: read_vari64(reader)?,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_vari64(writer, self.entity_unique_id)
    }
}

/// Absolute entity teleport/move.
#[derive(Debug, Clone, Default)]
pub struct MoveActorAbsolute {
    pub entity_runtime_id: u64,
    pub flags: u8,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
}

impl MoveActorAbsolute {
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            entity_runtime_id: read_varu64(reader)?,
            flags: reader.read_u8()?,
            position: read_vec3(reader)?,
            rotation: read_vec3(reader)?,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_varu64(writer, self.entity_runtime_id)?;
        writer.write_u8(self.flags)?;
        write_vec3(writer, self.position)?;
        write_vec3(writer, self.rotation)
    }
}

/// Standalone link/unlink event.
#[derive(Debug, Clone)]
pub struct SetActorLink {
    pub link: ActorLink,
}

impl SetActorLink {
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            link: ActorLink::decode(reader)?,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.link.encode(writer)
    }
}

/// Player animation; an arm swing toward the server is the zoom gesture.
#[derive(Debug, Clone, Default)]
pub struct Animate {
    pub action_type: i32,
    pub entity_runtime_id: u64,
}

impl Animate {
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            action_type: read_vari32(reader)?,
            entity_runtime_id: read_varu64(reader)?,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_vari32(writer, self.action_type)?;
        write_varu64(writer, self.entity_runtime_id)
    }
}

/// Client asking for map pixels; intercepted for the preview map.
#[derive(Debug, Clone, Default)]
pub struct MapInfoRequest {
    pub map_id: i64,
}

impl MapInfoRequest {
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            map_id: read_vari64(reader)?,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_vari64(writer, self.map_id)
    }
}

/// Map pixel/metadata update pushed to the client.
#[derive(Debug, Clone, Default)]
pub struct MapItemData {
    pub map_id: i64,
    pub update_flags: u32,
    pub dimension: u8,
    pub locked: bool,
    pub origin: BlockPos,
    /// Present when `update_flags` contains [`MAP_UPDATE_INITIALISATION`].
    pub included_in: Vec<i64>,
    pub scale: u8,
    pub width: i32,
    pub height: i32,
    pub x_offset: i32,
    pub y_offset: i32,
    /// RGBA pixels, row-major; present with [`MAP_UPDATE_TEXTURE`].
    pub pixels: Vec<u32>,
}

impl MapItemData {
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let map_id = read_vari64(reader)?;
        let update_flags = read_varu32(reader)?;
        let dimension = reader.read_u8()?;
        let locked = reader.read_u8()? != 0;
        let origin = BlockPos::decode(reader)?;
        let mut included_in = Vec::new();
        if update_flags & MAP_UPDATE_INITIALISATION != 0 {
            let count = read_varu32(reader)?;
            for _ in 0..count {
                included_in.push(read_vari64(reader)?);
            }
        }
        let scale = reader.read_u8()?;
        let (mut width, mut height, mut x_offset, mut y_offset) = (0, 0, 0, 0);
        let mut pixels = Vec::new();
        if update_flags & MAP_UPDATE_TEXTURE != 0 {
            width = read_vari32(reader)?;
            height = read_vari32(reader)?;
            x_offset = read_vari32(reader)?;
            y_offset = read_vari32(reader)?;
            let count = read_varu32(reader)?;
            pixels.reserve(count as usize);
            for _ in 0..count {
                pixels.push(reader.read_u32::<LittleEndian>()?);
            }
        }
        Ok(Self {
            map_id,
            update_flags,
            dimension,
            locked,
            origin,
            included_in,
            scale,
            width,
            height,
            x_offset,
            y_offset,
            pixels,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_vari64(writer, self.map_id)?;
        write_varu32(writer, self.update_flags)?;
        writer.write_u8(self.dimension)?;
        writer.write_u8(u8::from(self.locked))?;
        self.origin.encode(writer)?;
        if self.update_flags & MAP_UPDATE_INITIALISATION != 0 {
            write_varu32(writer, self.included_in.len() as u32)?;
            for id in &self.included_in {
                write_vari64(writer, *id)?;
            }
        }
        writer.write_u8(self.scale)?;
        if self.update_flags & MAP_UPDATE_TEXTURE != 0 {
            write_vari32(writer, self.width)?;
            write_vari32(writer, self.height)?;
            write_vari32(writer, self.x_offset)?;
            write_vari32(writer, self.y_offset)?;
            write_varu32(writer, self.pixels.len() as u32)?;
            for px in &self.pixels {
                writer.write_u32::<LittleEndian>(*px)?;
            }
        }
        Ok(())
    }
}

/// A single item slot, just enough to present the preview map item.
#[derive(Debug, Clone, Default)]
pub struct ItemInstance {
    pub stack_network_id: i32,
    pub item_network_id: i32,
    pub count: u16,
    /// Map identity carried in the item's metadata.
    pub map_id: i64,
}

impl ItemInstance {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            stack_network_id: read_vari32(reader)?,
            item_network_id: read_vari32(reader)?,
            count: reader.read_u16::<LittleEndian>()?,
            map_id: read_vari64(reader)?,
        })
    }

    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_vari32(writer, self.stack_network_id)?;
        write_vari32(writer, self.item_network_id)?;
        writer.write_u16::<LittleEndian>(self.count)?;
        write_vari64(writer, self.map_id)
    }
}

/// Inventory window contents; used to keep the map item in the offhand.
#[derive(Debug, Clone, Default)]
pub struct InventoryContent {
    pub window_id: u32,
    pub content: Vec<ItemInstance>,
}

impl InventoryContent {
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let window_id = read_varu32(reader)?;
        let count = read_varu32(reader)?;
        let mut content = Vec::with_capacity(count as usize);
        for _ in 0..count {
            content.push(ItemInstance::decode(reader)?);
        }
        Ok(Self { window_id, content })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_varu32(writer, self.window_id)?;
        write_varu32(writer, self.content.len() as u32)?;
        for item in &self.content {
            item.encode(writer)?;
        }
        Ok(())
    }
}

/// One decoded protocol packet.
#[derive(Debug, Clone)]
pub enum Packet {
    StartGame(StartGame),
    LevelChunk(LevelChunk),
    SubChunk(SubChunk),
    SubChunkRequest(SubChunkRequest),
    MovePlayer(MovePlayer),
    AddActor(AddActor),
    RemoveActor(RemoveActor),
    MoveActorAbsolute(MoveActorAbsolute),
    SetActorLink(SetActorLink),
    Animate(Animate),
    MapInfoRequest(MapInfoRequest),
    MapItemData(MapItemData),
    InventoryContent(InventoryContent),
    /// Packet the core does not interpret; body kept verbatim.
    Unknown { id: u32, payload: Vec<u8> },
}

impl Packet {
    /// Numeric packet id as it appears in the wire header.
    #[must_use]
    pub const fn id(&self) -> u32 {
        match self {
            Self::StartGame(_) => ID_START_GAME,
            Self::LevelChunk(_) => ID_LEVEL_CHUNK,
            Self::SubChunk(_) => ID_SUB_CHUNK,
            Self::SubChunkRequest(_) => ID_SUB_CHUNK_REQUEST,
            Self::MovePlayer(_) => ID_MOVE_PLAYER,
            Self::AddActor(_) => ID_ADD_ACTOR,
            Self::RemoveActor(_) => ID_REMOVE_ACTOR,
            Self::MoveActorAbsolute(_) => ID_MOVE_ACTOR_ABSOLUTE,
            Self::SetActorLink(_) => ID_SET_ACTOR_LINK,
            Self::Animate(_) => ID_ANIMATE,
            Self::MapInfoRequest(_) => ID_MAP_INFO_REQUEST,
            Self::MapItemData(_) => ID_MAP_ITEM_DATA,
            Self::InventoryContent(_) => ID_INVENTORY_CONTENT,
            Self::Unknown { id, .. } => *id,
        }
    }

    /// Decode a packet body for the given header id.
    ///
    /// Unrecognized ids become [`Packet::Unknown`]; a recognized id with a
    /// malformed body is a hard error.
    pub fn decode_body<R: Read>(id: u32, reader: &mut R) -> Result<Self> {
        Ok(match id {
            ID_START_GAME => Self::StartGame(StartGame::decode(reader)?),
            ID_LEVEL_CHUNK => Self::LevelChunk(LevelChunk::decode(reader)?),
            ID_SUB_CHUNK => Self::SubChunk(SubChunk::decode(reader)?),
            ID_SUB_CHUNK_REQUEST => Self::SubChunkRequest(SubChunkRequest::decode(reader)?),
            ID_MOVE_PLAYER => Self::MovePlayer(MovePlayer::decode(reader)?),
            ID_ADD_ACTOR => Self::AddActor(AddActor::decode(reader)?),
            ID_REMOVE_ACTOR => Self::RemoveActor(RemoveActor::decode(reader)?),
            ID_MOVE_ACTOR_ABSOLUTE => Self::MoveActorAbsolute(MoveActorAbsolute::decode(reader)?),
            ID_SET_ACTOR_LINK => Self::SetActorLink(SetActorLink::decode(reader)?),
            ID_ANIMATE => Self::Animate(Animate::decode(reader)?),
            ID_MAP_INFO_REQUEST => Self::MapInfoRequest(MapInfoRequest::decode(reader)?),
            ID_MAP_ITEM_DATA => Self::MapItemData(MapItemData::decode(reader)?),
            ID_INVENTORY_CONTENT => Self::InventoryContent(InventoryContent::decode(reader)?),
            _ => {
                let mut payload = Vec::new();
                reader.read_to_end(&mut payload)?;
                Self::Unknown { id, payload }
            }
        })
    }

    /// Encode header id plus body.
    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_varu32(writer, self.id() & 0x3FF)?;
        match self {
            Self::StartGame(pk) => pk.encode(writer),
            Self::LevelChunk(pk) => pk.encode(writer),
            Self::SubChunk(pk) => pk.encode(writer),
            Self::SubChunkRequest(pk) => pk.encode(writer),
            Self::MovePlayer(pk) => pk.encode(writer),
            Self::AddActor(pk) => pk.encode(writer),
            Self::RemoveActor(pk) => pk.encode(writer),
            Self::MoveActorAbsolute(pk) => pk.encode(writer),
            Self::SetActorLink(pk) => pk.encode(writer),
            Self::Animate(pk) => pk.encode(writer),
            Self::MapInfoRequest(pk) => pk.encode(writer),
            Self::MapItemData(pk) => pk.encode(writer),
            Self::InventoryContent(pk) => pk.encode(writer),
            Self::Unknown { payload, .. } => {
                writer.write_all(payload)?;
                Ok(())
            }
        }
    }
}
