//! The compositor: tile caches, canvas, zoom, dirty tracking.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use image::RgbaImage;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tap_chunk::BlockRegistry;
use tap_protocol::ChunkPos;
use tracing::debug;

use crate::tile::{rasterize_tile, tint_provisional, TILE_SIZE};
use crate::{MapUpdate, RenderRequest};

/// Canvas edge length in pixels.
pub const CANVAS_SIZE: u32 = 128;
/// Largest zoom factor, in pixels allotted per chunk.
const MAX_ZOOM: u32 = 16;

struct CanvasState {
    zoom: u32,
    canvas: RgbaImage,
    tiles: FxHashMap<ChunkPos, Arc<RgbaImage>>,
    fallback: FxHashMap<ChunkPos, Arc<RgbaImage>>,
    viewer: (f32, f32),
    rotation: f32,
    last_drawn_block: Option<(i32, i32)>,
    updated: Vec<ChunkPos>,
    dirty: bool,
}

/// The map compositor. Producers enqueue render requests from the
/// decode path without ever blocking; the compositor drains the queue
/// and redraws on its own schedule. Canvas and tile caches live under
/// their own lock, distinct from any world-state lock.
pub struct MapRenderer {
    tx: Sender<RenderRequest>,
    rx: Receiver<RenderRequest>,
    registry: Mutex<Arc<BlockRegistry>>,
    state: Mutex<CanvasState>,
}

impl MapRenderer {
    #[must_use]
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            registry: Mutex::new(registry),
            state: Mutex::new(CanvasState {
                zoom: MAX_ZOOM,
                canvas: RgbaImage::new(CANVAS_SIZE, CANVAS_SIZE),
                tiles: FxHashMap::default(),
                fallback: FxHashMap::default(),
                viewer: (0.0, 0.0),
                rotation: 0.0,
                last_drawn_block: None,
                updated: Vec::new(),
                dirty: false,
            }),
        }
    }

    /// Swap in the session's real block palette once it is known. Tiles
    /// rendered before this keep their old colors until re-enqueued.
    pub fn set_registry(&self, registry: Arc<BlockRegistry>) {
        *self.registry.lock() = registry;
    }

    /// Producer handle for the render queue; sends never block.
    #[must_use]
    pub fn queue(&self) -> Sender<RenderRequest> {
        self.tx.clone()
    }

    pub fn enqueue(&self, request: RenderRequest) {
        // Unbounded channel: this only fails once the renderer is gone.
        if self.tx.send(request).is_err() {
            debug!("render queue closed, request dropped");
        }
    }

    /// Track the viewer. Dirty only when the integer block position
    /// changed; sub-block jitter does not force redraws.
    pub fn set_viewer(&self, x: f32, z: f32, rotation: f32) {
        let mut state = self.state.lock();
        state.viewer = (x, z);
        state.rotation = rotation;
        let block = (x.floor() as i32, z.floor() as i32);
        if state.last_drawn_block != Some(block) {
            state.dirty = true;
        }
    }

    /// Halve the pixels-per-chunk factor, wrapping back to the maximum
    /// instead of reaching zero.
    pub fn cycle_zoom(&self) {
        let mut state = self.state.lock();
        state.zoom = if state.zoom <= 1 {
            MAX_ZOOM
        } else {
            state.zoom / 2
        };
        state.dirty = true;
        debug!(zoom = state.zoom, "map zoom changed");
    }

    #[must_use]
    pub fn zoom(&self) -> u32 {
        self.state.lock().zoom
    }

    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.state.lock().tiles.len()
    }

    /// Drain the queue, and if anything changed redraw the canvas and
    /// produce an update for the display surface. `None` means clean.
    pub fn poll_update(&self) -> Option<MapUpdate> {
        let mut state = self.state.lock();
        self.drain_queue(&mut state);
        if !state.dirty {
            return None;
        }
        Self::redraw(&mut state);
        state.dirty = false;
        state.last_drawn_block = Some((state.viewer.0.floor() as i32, state.viewer.1.floor() as i32));
        Some(MapUpdate {
            chunk_count: state.tiles.len() as i32,
            rotation: state.rotation,
            updated: std::mem::take(&mut state.updated),
            tiles: state.tiles.clone(),
        })
    }

    /// Drop all composited state and report the reset to the display.
    pub fn reset(&self) -> MapUpdate {
        let mut state = self.state.lock();
        for _ in self.rx.try_iter() {}
        state.tiles.clear();
        state.fallback.clear();
        state.updated.clear();
        state.canvas = RgbaImage::new(CANVAS_SIZE, CANVAS_SIZE);
        state.dirty = false;
        MapUpdate::reset()
    }

    /// Current canvas pixels, packed RGBA little-endian, row-major.
    #[must_use]
    pub fn canvas_pixels(&self) -> Vec<u32> {
        let state = self.state.lock();
        state
            .canvas
            .pixels()
            .map(|p| {
                u32::from(p.0[0])
                    | u32::from(p.0[1]) << 8
                    | u32::from(p.0[2]) << 16
                    | u32::from(p.0[3]) << 24
            })
            .collect()
    }

    /// Stitch every known tile into one image at 1:1 scale, ignoring
    /// zoom and viewer. `None` when nothing has been rendered.
    #[must_use]
    pub fn export_stitched(&self) -> Option<RgbaImage> {
        let mut state = self.state.lock();
        self.drain_queue(&mut state);
        if state.tiles.is_empty() {
            return None;
        }

        let min_x = state.tiles.keys().map(|p| p.x).min()?;
        let max_x = state.tiles.keys().map(|p| p.x).max()?;
        let min_z = state.tiles.keys().map(|p| p.z).min()?;
        let max_z = state.tiles.keys().map(|p| p.z).max()?;

        let width = (max_x - min_x + 1) as u32 * TILE_SIZE;
        let height = (max_z - min_z + 1) as u32 * TILE_SIZE;
        let mut out = RgbaImage::new(width, height);
        for (pos, tile) in &state.tiles {
            let ox = (pos.x - min_x) as u32 * TILE_SIZE;
            let oz = (pos.z - min_z) as u32 * TILE_SIZE;
            for z in 0..TILE_SIZE {
                for x in 0..TILE_SIZE {
                    out.put_pixel(ox + x, oz + z, *tile.get_pixel(x, z));
                }
            }
        }
        Some(out)
    }

    fn drain_queue(&self, state: &mut CanvasState) {
        let registry = Arc::clone(&self.registry.lock());
        for request in self.rx.try_iter() {
            match request.column {
                Some(column) => {
                    let tile = rasterize_tile(&column, &registry);
                    let tile = if request.provisional {
                        if let Some(existing) = state.tiles.get(&request.pos) {
                            state
                                .fallback
                                .insert(request.pos, Arc::clone(existing));
                        }
                        tint_provisional(tile)
                    } else {
                        state.fallback.remove(&request.pos);
                        tile
                    };
                    state.tiles.insert(request.pos, Arc::new(tile));
                }
                None => {
                    // Invalidate: fall back to the pre-provisional tile
                    // when one was snapshotted, otherwise drop outright.
                    match state.fallback.remove(&request.pos) {
                        Some(previous) => {
                            state.tiles.insert(request.pos, previous);
                        }
                        None => {
                            state.tiles.remove(&request.pos);
                        }
                    }
                }
            }
            state.updated.push(request.pos);
            state.dirty = true;
        }
    }

    fn redraw(state: &mut CanvasState) {
        let zoom = state.zoom;
        let px_per_block = zoom as f32 / TILE_SIZE as f32;
        let half = (CANVAS_SIZE / 2) as f32;

        state.canvas = RgbaImage::new(CANVAS_SIZE, CANVAS_SIZE);
        for (pos, tile) in &state.tiles {
            let sx = ((pos.x * 16) as f32 - state.viewer.0) * px_per_block + half;
            let sz = ((pos.z * 16) as f32 - state.viewer.1) * px_per_block + half;
            let (sx, sz) = (sx.floor() as i32, sz.floor() as i32);
            if sx + zoom as i32 <= 0
                || sz + zoom as i32 <= 0
                || sx >= CANVAS_SIZE as i32
                || sz >= CANVAS_SIZE as i32
            {
                continue;
            }
            // Nearest-neighbor scale of the 16x16 tile into zoom x zoom.
            for dz in 0..zoom as i32 {
                for dx in 0..zoom as i32 {
                    let cx = sx + dx;
                    let cz = sz + dz;
                    if cx < 0 || cz < 0 || cx >= CANVAS_SIZE as i32 || cz >= CANVAS_SIZE as i32 {
                        continue;
                    }
                    let tx = (dx as u32 * TILE_SIZE) / zoom;
                    let tz = (dz as u32 * TILE_SIZE) / zoom;
                    let pixel = *tile.get_pixel(tx, tz);
                    if pixel.0[3] == 0 {
                        continue;
                    }
                    state.canvas.put_pixel(cx as u32, cz as u32, pixel);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tap_chunk::{Column, DimensionRange};

    fn renderer() -> MapRenderer {
        MapRenderer::new(Arc::new(BlockRegistry::vanilla()))
    }

    fn solid_column(registry: &BlockRegistry) -> Arc<Column> {
        let stone = registry.id_for("minecraft:stone").unwrap();
        let mut column = Column::new(DimensionRange::OVERWORLD);
        for z in 0..16u8 {
            for x in 0..16u8 {
                column.set_block(x, 60, z, stone, registry);
            }
        }
        Arc::new(column)
    }

    #[test]
    fn zoom_halves_and_wraps() {
        let r = renderer();
        assert_eq!(r.zoom(), 16);
        let mut seen = Vec::new();
        for _ in 0..5 {
            r.cycle_zoom();
            seen.push(r.zoom());
        }
        assert_eq!(seen, vec![8, 4, 2, 1, 16]);
    }

    #[test]
    fn draining_an_empty_queue_twice_is_clean() {
        let r = renderer();
        assert!(r.poll_update().is_none());
        assert!(r.poll_update().is_none());
    }

    #[test]
    fn final_request_after_provisional_restores_normal_display() {
        let registry = BlockRegistry::vanilla();
        let r = MapRenderer::new(Arc::new(registry.clone()));
        let column = solid_column(&registry);
        let pos = ChunkPos { x: 0, z: 0 };
        let stone_color = registry.color(registry.id_for("minecraft:stone").unwrap());

        r.enqueue(RenderRequest {
            pos,
            column: Some(Arc::clone(&column)),
            provisional: true,
        });
        let update = r.poll_update().unwrap();
        let tinted = update.tiles[&pos].get_pixel(0, 0).0;
        assert_ne!(tinted, stone_color);

        r.enqueue(RenderRequest {
            pos,
            column: Some(column),
            provisional: false,
        });
        let update = r.poll_update().unwrap();
        assert_eq!(update.tiles[&pos].get_pixel(0, 0).0, stone_color);
    }

    #[test]
    fn provisional_without_prior_tile_vanishes_on_invalidate() {
        let registry = BlockRegistry::vanilla();
        let r = MapRenderer::new(Arc::new(registry.clone()));
        let pos = ChunkPos { x: 3, z: -2 };

        r.enqueue(RenderRequest {
            pos,
            column: Some(solid_column(&registry)),
            provisional: true,
        });
        r.enqueue(RenderRequest {
            pos,
            column: None,
            provisional: false,
        });
        let _ = r.poll_update();
        assert_eq!(r.tile_count(), 0);
    }

    #[test]
    fn invalidate_after_provisional_restores_the_snapshot() {
        let registry = BlockRegistry::vanilla();
        let r = MapRenderer::new(Arc::new(registry.clone()));
        let column = solid_column(&registry);
        let pos = ChunkPos { x: 0, z: 0 };
        let stone_color = registry.color(registry.id_for("minecraft:stone").unwrap());

        r.enqueue(RenderRequest {
            pos,
            column: Some(Arc::clone(&column)),
            provisional: false,
        });
        r.enqueue(RenderRequest {
            pos,
            column: Some(column),
            provisional: true,
        });
        r.enqueue(RenderRequest {
            pos,
            column: None,
            provisional: false,
        });
        let update = r.poll_update().unwrap();
        assert_eq!(update.tiles[&pos].get_pixel(0, 0).0, stone_color);
    }

    #[test]
    fn stitched_export_covers_the_bounding_box() {
        let registry = BlockRegistry::vanilla();
        let r = MapRenderer::new(Arc::new(registry.clone()));
        for pos in [ChunkPos { x: -1, z: 0 }, ChunkPos { x: 1, z: 2 }] {
            r.enqueue(RenderRequest {
                pos,
                column: Some(solid_column(&registry)),
                provisional: false,
            });
        }
        let image = r.export_stitched().unwrap();
        assert_eq!(image.width(), 3 * TILE_SIZE);
        assert_eq!(image.height(), 3 * TILE_SIZE);
        // Corner tile pixels are populated, the gap stays transparent.
        assert_ne!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(image.get_pixel(0, 40).0[3], 0);
    }

    #[test]
    fn viewer_jitter_below_a_block_does_not_dirty() {
        let registry = BlockRegistry::vanilla();
        let r = MapRenderer::new(Arc::new(registry.clone()));
        r.enqueue(RenderRequest {
            pos: ChunkPos { x: 0, z: 0 },
            column: Some(solid_column(&registry)),
            provisional: false,
        });
        assert!(r.poll_update().is_some());

        r.set_viewer(0.2, 0.7, 0.0);
        assert!(r.poll_update().is_none());
        r.set_viewer(5.0, 0.7, 0.0);
        assert!(r.poll_update().is_some());
    }

    #[test]
    fn reset_reports_the_sentinel_count() {
        let r = renderer();
        let update = r.reset();
        assert_eq!(update.chunk_count, -1);
        assert!(update.tiles.is_empty());
    }
}
