//! Packet-stream to world-state wiring.

use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use tap_chunk::{
    decode_network_chunk, decode_sub_chunk_entry, BlockRegistry, ChunkDecodeOptions, Column,
    DimensionRange,
};
use tap_map::{push_canvas, MapRenderer, RenderRequest, VIEW_MAP_ID};
use tap_protocol::{
    ActorLinkKind, Animate, ChunkPos, Direction, LevelChunk, MoveActorAbsolute, MovePlayer, Packet,
    SubChunk, SubChunkRequest, SubChunkResult, ANIMATE_ACTION_SWING_ARM, SUB_CHUNK_COUNT_LIMITED,
    SUB_CHUNK_COUNT_LIMITLESS,
};
use tap_session::{PacketSink, SessionContext, SessionHandler};
use tap_world::{Entity, LinkOp, MapState, WorldStore};
use tracing::{debug, error, info, warn};

use crate::{ProgressSink, Result, WorldSettings, WorldsError};

/// World state for one session, guarded as a unit: every decode+store
/// runs under one exclusive section so interleaved chunk and subchunk
/// packets can never partially overwrite a column. Compositing never
/// happens under this lock; render work leaves through the queue.
pub struct SessionWorld {
    pub store: WorldStore,
    pub registry: Arc<BlockRegistry>,
    pub opts: ChunkDecodeOptions,
    pub player_runtime_id: u64,
}

impl SessionWorld {
    fn new() -> Self {
        Self {
            store: WorldStore::new(),
            registry: Arc::new(BlockRegistry::vanilla()),
            opts: ChunkDecodeOptions::default(),
            player_runtime_id: 0,
        }
    }
}

/// Session handler that reconstructs the world from the packet stream.
pub struct WorldsHandler {
    settings: WorldSettings,
    world: Arc<Mutex<SessionWorld>>,
    renderer: Arc<MapRenderer>,
    sink: Arc<dyn PacketSink>,
    progress: Option<Arc<dyn ProgressSink>>,
    error: Option<WorldsError>,
}

impl WorldsHandler {
    #[must_use]
    pub fn new(
        settings: WorldSettings,
        renderer: Arc<MapRenderer>,
        sink: Arc<dyn PacketSink>,
    ) -> Self {
        Self {
            settings,
            world: Arc::new(Mutex::new(SessionWorld::new())),
            renderer,
            sink,
            progress: None,
            error: None,
        }
    }

    /// Attach a progress reporter; it sees the running chunk total after
    /// every stored column.
    pub fn set_progress(&mut self, progress: Arc<dyn ProgressSink>) {
        self.progress = Some(progress);
    }

    /// Shared handle to the session's world state, for projection and
    /// export by the session's owner.
    #[must_use]
    pub fn world(&self) -> Arc<Mutex<SessionWorld>> {
        Arc::clone(&self.world)
    }

    /// First fatal error hit by this handler, if any. Once set, further
    /// packets are ignored: the stored state is no longer trustworthy.
    pub fn take_error(&mut self) -> Option<WorldsError> {
        self.error.take()
    }

    fn enqueue_render(&self, pos: ChunkPos, column: Option<&Column>, provisional: bool) {
        if !self.settings.render_preview {
            return;
        }
        self.renderer.enqueue(RenderRequest {
            pos,
            column: column.map(|c| Arc::new(c.clone())),
            provisional,
        });
    }

    fn process_level_chunk(&self, packet: &LevelChunk) -> Result<()> {
        if packet.raw_payload.is_empty() {
            debug!(pos = ?packet.position, "empty chunk, skipped");
            return Ok(());
        }

        let range = DimensionRange::for_dimension(packet.dimension);
        let streamed = matches!(
            packet.sub_chunk_count,
            SUB_CHUNK_COUNT_LIMITED | SUB_CHUNK_COUNT_LIMITLESS
        );
        let count = if streamed { 0 } else { packet.sub_chunk_count };

        let mut world = self.world.lock();
        let opts = world.opts;
        let Some(column) = decode_network_chunk(&packet.raw_payload, count, range, opts)? else {
            return Ok(());
        };

        self.enqueue_render(packet.position, Some(&column), streamed);
        world.store.store_column(packet.position, column);
        let chunk_count = world.store.chunk_count();
        debug!(pos = ?packet.position, chunks = chunk_count, streamed, "stored chunk");
        drop(world);

        if let Some(progress) = &self.progress {
            progress.chunk_count(chunk_count);
        }

        if streamed {
            self.request_sub_chunks(packet, range);
        }
        Ok(())
    }

    /// Ask the server for the missing vertical slabs of a streamed
    /// chunk. Fire-and-forget: failure is logged, the server resending
    /// the column is the only retry.
    fn request_sub_chunks(&self, packet: &LevelChunk, range: DimensionRange) {
        let top = if packet.sub_chunk_count == SUB_CHUNK_COUNT_LIMITED {
            (packet.highest_sub_chunk as usize).min(range.slab_count() - 1)
        } else {
            range.slab_count() - 1
        };
        let offsets = (0..=top).map(|o| [0, o as i8, 0]).collect();
        let request = Packet::SubChunkRequest(SubChunkRequest {
            dimension: packet.dimension,
            position: [packet.position.x, range.min_slab(), packet.position.z],
            offsets,
        });
        if let Err(err) = self.sink.write_packet(&request) {
            warn!(%err, pos = ?packet.position, "failed to request subchunks");
        }
    }

    fn process_sub_chunk(&self, packet: &SubChunk) -> Result<()> {
        let range = DimensionRange::for_dimension(packet.dimension);
        let [base_x, base_y, base_z] = packet.position;

        let mut world = self.world.lock();
        let save_nbt = self.settings.save_block_nbt;
        let mut touched = Vec::new();

        for entry in &packet.entries {
            let pos = ChunkPos {
                x: base_x + i32::from(entry.offset[0]),
                z: base_z + i32::from(entry.offset[2]),
            };
            if world.store.load_column(pos).is_none() {
                return Err(WorldsError::SubChunkBeforeChunk { pos });
            }

            match entry.result {
                SubChunkResult::Success => {
                    let absolute = base_y + i32::from(entry.offset[1]);
                    let mut y_index = absolute as u8;
                    let (slab, blobs) = decode_sub_chunk_entry(&entry.raw_payload, &mut y_index)?;
                    let absolute = i32::from(y_index as i8);
                    let index = absolute - range.min_slab();
                    let column = world
                        .store
                        .column_mut(pos)
                        .ok_or(WorldsError::SubChunkBeforeChunk { pos })?;
                    if index >= 0 {
                        column.set_slab(index as usize, slab);
                    }
                    if save_nbt {
                        for blob in blobs {
                            column.set_block_nbt(blob, true);
                        }
                    }
                    if !touched.contains(&pos) {
                        touched.push(pos);
                    }
                }
                // The slab exists and is empty: store nothing, not
                // missing, not an error.
                SubChunkResult::SuccessAllAir => {}
                other => {
                    debug!(?pos, result = ?other, "subchunk entry skipped");
                }
            }
        }

        for pos in touched {
            let column = world.store.load_column(pos);
            self.enqueue_render(pos, column, false);
        }
        Ok(())
    }

    fn on_move_player(&self, packet: &MovePlayer) {
        let is_player = self.world.lock().player_runtime_id == packet.entity_runtime_id;
        if is_player && self.settings.render_preview {
            self.renderer
                .set_viewer(packet.position[0], packet.position[2], packet.yaw);
        }
    }

    fn on_animate(&self, packet: &Animate, direction: Direction) {
        // The player swinging an arm while holding the preview map is
        // the zoom gesture.
        if direction == Direction::ToServer
            && packet.action_type == ANIMATE_ACTION_SWING_ARM
            && self.settings.render_preview
        {
            self.renderer.cycle_zoom();
        }
    }

    fn on_move_actor(&self, packet: &MoveActorAbsolute) {
        let mut world = self.world.lock();
        if let Some(entity) = world.store.entity_mut(packet.entity_runtime_id) {
            entity.position = packet.position;
            entity.pitch = packet.rotation[0];
            entity.yaw = packet.rotation[1];
            entity.head_yaw = packet.rotation[2];
        }
    }
}

impl SessionHandler for WorldsHandler {
    fn on_connect(&mut self, ctx: &mut SessionContext, address: Option<&str>) {
        let Some(game_data) = ctx.game_data.as_ref() else {
            return;
        };
        let registry = Arc::new(BlockRegistry::new(
            &game_data.custom_blocks,
            game_data.hashed_block_ids,
        ));

        let mut world = self.world.lock();
        world.registry = Arc::clone(&registry);
        world.opts = ChunkDecodeOptions {
            legacy_biomes: game_data.legacy_biomes,
            hashed_ids: game_data.hashed_block_ids,
        };
        world.player_runtime_id = game_data.player_runtime_id;
        drop(world);

        self.renderer.set_registry(registry);
        if self.settings.render_preview {
            self.renderer.set_viewer(
                game_data.player_position[0],
                game_data.player_position[2],
                0.0,
            );
        }
        info!(
            world = %game_data.world_name,
            version = %game_data.base_game_version,
            address = address.unwrap_or("replay"),
            "session started"
        );
    }

    fn on_packet(
        &mut self,
        _ctx: &mut SessionContext,
        packet: &Packet,
        direction: Direction,
        _timestamp: SystemTime,
    ) {
        if self.error.is_some() {
            return;
        }
        let result = match packet {
            Packet::LevelChunk(p) => self.process_level_chunk(p),
            Packet::SubChunk(p) => self.process_sub_chunk(p),
            Packet::MovePlayer(p) => {
                self.on_move_player(p);
                Ok(())
            }
            Packet::AddActor(p) => {
                if self.settings.save_entities {
                    let mut world = self.world.lock();
                    world.store.store_entity(Entity::from_add_actor(p));
                    for link in &p.links {
                        let op = match link.kind {
                            ActorLinkKind::Remove => LinkOp::Remove,
                            ActorLinkKind::Rider | ActorLinkKind::Passenger => LinkOp::Add,
                        };
                        world
                            .store
                            .link_entities(link.ridden_unique_id, link.rider_unique_id, op);
                    }
                }
                Ok(())
            }
            Packet::RemoveActor(p) => {
                let mut world = self.world.lock();
                if let Some(runtime_id) = world.store.runtime_id_of(p.entity_unique_id) {
                    world.store.remove_entity(runtime_id);
                }
                Ok(())
            }
            Packet::MoveActorAbsolute(p) => {
                self.on_move_actor(p);
                Ok(())
            }
            Packet::SetActorLink(p) => {
                let op = match p.link.kind {
                    ActorLinkKind::Remove => LinkOp::Remove,
                    ActorLinkKind::Rider | ActorLinkKind::Passenger => LinkOp::Add,
                };
                self.world.lock().store.link_entities(
                    p.link.ridden_unique_id,
                    p.link.rider_unique_id,
                    op,
                );
                Ok(())
            }
            Packet::Animate(p) => {
                self.on_animate(p, direction);
                Ok(())
            }
            Packet::MapInfoRequest(p) => {
                // The client asking about the preview map id gets the
                // current canvas instead of the server.
                if p.map_id == VIEW_MAP_ID && self.settings.render_preview {
                    push_canvas(self.sink.as_ref(), &self.renderer);
                }
                Ok(())
            }
            Packet::MapItemData(p) => {
                if p.map_id != VIEW_MAP_ID {
                    self.world.lock().store.store_map(
                        p.map_id,
                        MapState {
                            scale: p.scale,
                            width: p.width.max(0) as u32,
                            height: p.height.max(0) as u32,
                            pixels: p.pixels.iter().flat_map(|px| px.to_le_bytes()).collect(),
                        },
                    );
                }
                Ok(())
            }
            Packet::StartGame(_)
            | Packet::SubChunkRequest(_)
            | Packet::InventoryContent(_)
            | Packet::Unknown { .. } => Ok(()),
        };

        if let Err(err) = result {
            error!(%err, id = packet.id(), "world reconstruction failed");
            self.error = Some(err);
        }
    }

    fn on_end(&mut self, _ctx: &mut SessionContext) {
        let mut world = self.world.lock();
        let registry = Arc::clone(&world.registry);
        let culled = world.store.cull(&registry);
        info!(
            chunks = world.store.chunk_count(),
            entities = world.store.entity_count(),
            culled,
            "session ended"
        );
    }
}
