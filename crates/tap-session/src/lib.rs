//! Session plumbing shared by live and replayed traffic: the game data
//! captured at bring-up, the packet handler interface both transports
//! call, and the context object that owns per-session codec state.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tap_protocol::{BatchCodec, BlockPos, Direction, Packet, StartGame};
use tracing::debug;

/// Connection-level game state, initialized from the start-game packet
/// before any per-packet callbacks fire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameData {
    pub world_name: String,
    pub base_game_version: String,
    pub world_seed: i64,
    pub dimension: i32,
    pub world_spawn: BlockPos,
    pub player_unique_id: i64,
    pub player_runtime_id: u64,
    pub player_position: [f32; 3],
    /// Biomes arrive as the flat pre-caves-and-cliffs grid.
    pub legacy_biomes: bool,
    /// Block runtime ids are FNV-1a hashes of the block name.
    pub hashed_block_ids: bool,
    pub custom_blocks: Vec<String>,
}

impl GameData {
    #[must_use]
    pub fn from_start_game(packet: &StartGame) -> Self {
        Self {
            world_name: packet.world_name.clone(),
            base_game_version: packet.base_game_version.clone(),
            world_seed: packet.world_seed,
            dimension: packet.dimension,
            world_spawn: packet.world_spawn,
            player_unique_id: packet.entity_unique_id,
            player_runtime_id: packet.entity_runtime_id,
            player_position: packet.player_position,
            legacy_biomes: packet.legacy_biomes,
            hashed_block_ids: packet.hashed_block_ids,
            custom_blocks: packet.custom_blocks.clone(),
        }
    }
}

/// Receiver of session events. Live connections and replay files call
/// the same three operations in the same order.
pub trait SessionHandler: Send {
    /// Session is established and game data is available. The address is
    /// present for live connections, absent for replays.
    fn on_connect(&mut self, ctx: &mut SessionContext, address: Option<&str>);

    /// One decoded packet, with its transport direction and capture (or
    /// arrival) time.
    fn on_packet(
        &mut self,
        ctx: &mut SessionContext,
        packet: &Packet,
        direction: Direction,
        timestamp: SystemTime,
    );

    /// Session ended cleanly.
    fn on_end(&mut self, ctx: &mut SessionContext);
}

/// Ordered handler fan-out. Handlers run in registration order for
/// every event.
#[derive(Default)]
pub struct HandlerList {
    handlers: Vec<Box<dyn SessionHandler>>,
}

impl HandlerList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Box<dyn SessionHandler>) {
        self.handlers.push(handler);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn on_connect(&mut self, ctx: &mut SessionContext, address: Option<&str>) {
        for handler in &mut self.handlers {
            handler.on_connect(ctx, address);
        }
    }

    pub fn on_packet(
        &mut self,
        ctx: &mut SessionContext,
        packet: &Packet,
        direction: Direction,
        timestamp: SystemTime,
    ) {
        for handler in &mut self.handlers {
            handler.on_packet(ctx, packet, direction, timestamp);
        }
    }

    pub fn on_end(&mut self, ctx: &mut SessionContext) {
        for handler in &mut self.handlers {
            handler.on_end(ctx);
        }
    }
}

/// Outbound packet writer. Sends are fire-and-forget: a failure is the
/// caller's to log, never retried here.
pub trait PacketSink: Send + Sync {
    fn write_packet(&self, packet: &Packet) -> std::io::Result<()>;
}

/// A sink for sessions with no live peer (replays). Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PacketSink for NullSink {
    fn write_packet(&self, packet: &Packet) -> std::io::Result<()> {
        debug!(id = packet.id(), "packet dropped by null sink");
        Ok(())
    }
}

/// Per-session state owned by the session's creator and torn down with
/// it. Carries the codec state shared across batch frames and the game
/// data once bring-up completes.
pub struct SessionContext {
    pub codec: BatchCodec,
    pub game_data: Option<GameData>,
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            codec: BatchCodec::new(),
            game_data: None,
        }
    }

    /// Install game data from the start-game packet. Returns whether
    /// this was the first installation.
    pub fn start_game(&mut self, packet: &StartGame) -> bool {
        let first = self.game_data.is_none();
        self.game_data = Some(GameData::from_start_game(packet));
        first
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        events: Vec<String>,
        tag: &'static str,
    }

    impl SessionHandler for Recorder {
        fn on_connect(&mut self, _ctx: &mut SessionContext, address: Option<&str>) {
            self.events
                .push(format!("{}:connect:{}", self.tag, address.unwrap_or("-")));
        }

        fn on_packet(
            &mut self,
            _ctx: &mut SessionContext,
            packet: &Packet,
            direction: Direction,
            _timestamp: SystemTime,
        ) {
            self.events
                .push(format!("{}:packet:{}:{:?}", self.tag, packet.id(), direction));
        }

        fn on_end(&mut self, _ctx: &mut SessionContext) {
            self.events.push(format!("{}:end", self.tag));
        }
    }

    #[test]
    fn handlers_fire_in_registration_order() {
        use std::sync::{Arc, Mutex};

        struct Shared {
            log: Arc<Mutex<Vec<&'static str>>>,
            tag: &'static str,
        }
        impl SessionHandler for Shared {
            fn on_connect(&mut self, _: &mut SessionContext, _: Option<&str>) {
                self.log.lock().unwrap().push(self.tag);
            }
            fn on_packet(
                &mut self,
                _: &mut SessionContext,
                _: &Packet,
                _: Direction,
                _: SystemTime,
            ) {
            }
            fn on_end(&mut self, _: &mut SessionContext) {}
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut list = HandlerList::new();
        list.register(Box::new(Shared {
            log: Arc::clone(&log),
            tag: "first",
        }));
        list.register(Box::new(Shared {
            log: Arc::clone(&log),
            tag: "second",
        }));

        let mut ctx = SessionContext::new();
        list.on_connect(&mut ctx, Some("127.0.0.1:19132"));
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn start_game_installs_once() {
        let mut ctx = SessionContext::new();
        let packet = StartGame {
            entity_unique_id: 1,
            entity_runtime_id: 1,
            player_position: [0.5, 64.0, 0.5],
            pitch: 0.0,
            yaw: 0.0,
            world_seed: 42,
            dimension: 0,
            world_spawn: BlockPos::new(0, 64, 0),
            world_name: "world".to_owned(),
            base_game_version: "1.21.0".to_owned(),
            legacy_biomes: false,
            hashed_block_ids: true,
            custom_blocks: Vec::new(),
        };
        assert!(ctx.start_game(&packet));
        assert!(!ctx.start_game(&packet));
        let data = ctx.game_data.as_ref().unwrap();
        assert_eq!(data.world_seed, 42);
        assert!(data.hashed_block_ids);
    }

    #[test]
    fn recorder_sees_packet_events() {
        let mut list = HandlerList::new();
        list.register(Box::new(Recorder {
            events: Vec::new(),
            tag: "r",
        }));
        let mut ctx = SessionContext::new();
        let packet = Packet::Unknown {
            id: 0x99,
            payload: vec![1, 2, 3],
        };
        list.on_packet(&mut ctx, &packet, Direction::ToClient, SystemTime::now());
        // The recorder is owned by the list; reaching it again requires
        // shared state, covered by the ordering test above. This one
        // just proves dispatch does not panic on an unknown packet.
    }
}
