//! Asynchronous map preview: a render queue fed by packet processing,
//! a compositor that turns stored columns into tiles and blits them
//! onto a small canvas, and the periodic tasks that push the result to
//! a display surface and to the in-game map item.

use std::sync::Arc;

use image::RgbaImage;
use rustc_hash::FxHashMap;
use tap_chunk::Column;
use tap_protocol::ChunkPos;

mod item;
mod renderer;
mod tasks;
mod tile;

pub use item::{announce_map_item, push_canvas, texture_packet, VIEW_MAP_ID};
pub use renderer::{MapRenderer, CANVAS_SIZE};
pub use tasks::MapTasks;
pub use tile::{rasterize_tile, tint_provisional, TILE_SIZE};

/// One unit of render work. An absent column means "invalidate this
/// position"; a provisional request marks the tile as mid-update.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub pos: ChunkPos,
    pub column: Option<Arc<Column>>,
    pub provisional: bool,
}

/// One redraw pushed to the display surface. A reset carries
/// `chunk_count == -1` and no tiles.
#[derive(Debug, Clone)]
pub struct MapUpdate {
    pub chunk_count: i32,
    pub rotation: f32,
    pub updated: Vec<ChunkPos>,
    pub tiles: FxHashMap<ChunkPos, Arc<RgbaImage>>,
}

impl MapUpdate {
    #[must_use]
    pub fn reset() -> Self {
        Self {
            chunk_count: -1,
            rotation: 0.0,
            updated: Vec::new(),
            tiles: FxHashMap::default(),
        }
    }
}

/// Display surface collaborator. Implemented outside the core (terminal
/// UI, GUI); consulted for image capability once at startup.
pub trait DisplaySink: Send + Sync {
    fn can_show_images(&self) -> bool;
    fn update(&self, update: MapUpdate);
}
