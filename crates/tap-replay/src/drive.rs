//! Drives a capture through the live-session handler interface.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use eyre::WrapErr;
use tap_protocol::{Direction, Packet};
use tap_session::{HandlerList, SessionContext};
use tracing::{debug, info};

use crate::format::ReplayReader;
use crate::Result;

/// Totals reported after a replay completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub frames: u64,
    pub packets: u64,
}

/// Feed every frame of a capture through the handler list.
///
/// Handshake packets are buffered until the start-game packet installs
/// the session's game data; `on_connect` then fires, the buffered
/// packets are delivered in capture order, and everything after flows
/// straight through. Cancellation is cooperative, checked between
/// frames, and is not an error. `on_end` fires only on a clean end of
/// file.
pub fn replay<R: Read + Seek>(
    reader: R,
    handlers: &mut HandlerList,
    ctx: &mut SessionContext,
    cancel: &AtomicBool,
) -> Result<ReplayStats> {
    let mut reader = ReplayReader::new(reader)?;
    let mut stats = ReplayStats::default();
    let mut pending: Vec<(Packet, Direction, SystemTime)> = Vec::new();
    let mut started = false;

    loop {
        if cancel.load(Ordering::Relaxed) {
            info!(frames = stats.frames, "replay cancelled");
            return Ok(stats);
        }
        let Some(frame) = reader.next_frame()? else {
            break;
        };
        stats.frames += 1;

        let packets = ctx.codec.decode(&frame.payload)?;
        for packet in packets {
            stats.packets += 1;
            if started {
                handlers.on_packet(ctx, &packet, frame.direction, frame.timestamp);
                continue;
            }

            let starts_game = if let Packet::StartGame(start) = &packet {
                ctx.start_game(start);
                true
            } else {
                false
            };
            pending.push((packet, frame.direction, frame.timestamp));

            if starts_game {
                started = true;
                handlers.on_connect(ctx, None);
                debug!(buffered = pending.len(), "session started, flushing handshake");
                for (packet, direction, timestamp) in pending.drain(..) {
                    handlers.on_packet(ctx, &packet, direction, timestamp);
                }
            }
        }
    }

    handlers.on_end(ctx);
    info!(
        frames = stats.frames,
        packets = stats.packets,
        "replay finished"
    );
    Ok(stats)
}

/// Replay a capture file from disk with a fresh session context.
pub fn replay_file(path: &Path, handlers: &mut HandlerList) -> eyre::Result<ReplayStats> {
    let file = File::open(path).wrap_err_with(|| format!("open replay {}", path.display()))?;
    let mut ctx = SessionContext::new();
    replay(
        BufReader::new(file),
        handlers,
        &mut ctx,
        &AtomicBool::new(false),
    )
    .wrap_err_with(|| format!("replay {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ReplayWriter;
    use std::io::Cursor;
    use std::time::{Duration, UNIX_EPOCH};
    use tap_protocol::{BlockPos, MovePlayer, StartGame};
    use tap_session::SessionHandler;

    #[derive(Default, Clone)]
    struct Log(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

    impl Log {
        fn push(&self, event: impl Into<String>) {
            self.0.lock().unwrap().push(event.into());
        }
        fn events(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct Probe(Log);

    impl SessionHandler for Probe {
        fn on_connect(&mut self, ctx: &mut SessionContext, address: Option<&str>) {
            assert!(ctx.game_data.is_some(), "connect before game data");
            assert!(address.is_none());
            self.0.push("connect");
        }

        fn on_packet(
            &mut self,
            _ctx: &mut SessionContext,
            packet: &Packet,
            direction: Direction,
            _timestamp: SystemTime,
        ) {
            self.0.push(format!("packet:{}:{:?}", packet.id(), direction));
        }

        fn on_end(&mut self, _ctx: &mut SessionContext) {
            self.0.push("end");
        }
    }

    fn start_game() -> Packet {
        Packet::StartGame(StartGame {
            entity_unique_id: 1,
            entity_runtime_id: 1,
            player_position: [0.0, 64.0, 0.0],
            pitch: 0.0,
            yaw: 0.0,
            world_seed: 7,
            dimension: 0,
            world_spawn: BlockPos::new(0, 64, 0),
            world_name: "capture".to_owned(),
            base_game_version: "1.21.0".to_owned(),
            legacy_biomes: false,
            hashed_block_ids: false,
            custom_blocks: Vec::new(),
        })
    }

    fn capture() -> Vec<u8> {
        let mut write_codec = tap_protocol::BatchCodec::new();
        let mut writer = ReplayWriter::new(Vec::new()).unwrap();

        // Handshake noise before the start-game signal.
        let handshake = write_codec
            .encode(&[Packet::Unknown {
                id: 0x01,
                payload: vec![1],
            }])
            .unwrap();
        writer
            .write_frame(Direction::ToClient, UNIX_EPOCH + Duration::from_millis(10), &handshake)
            .unwrap();

        let start = write_codec.encode(&[start_game()]).unwrap();
        writer
            .write_frame(Direction::ToClient, UNIX_EPOCH + Duration::from_millis(20), &start)
            .unwrap();

        let movement = write_codec
            .encode(&[Packet::MovePlayer(MovePlayer {
                entity_runtime_id: 1,
                position: [1.0, 64.0, 1.0],
                ..MovePlayer::default()
            })])
            .unwrap();
        writer
            .write_frame(Direction::ToServer, UNIX_EPOCH + Duration::from_millis(30), &movement)
            .unwrap();

        writer.into_inner()
    }

    #[test]
    fn connect_fires_before_any_packet_callback() {
        let log = Log::default();
        let mut handlers = HandlerList::new();
        handlers.register(Box::new(Probe(log.clone())));
        let mut ctx = SessionContext::new();

        let stats = replay(
            Cursor::new(capture()),
            &mut handlers,
            &mut ctx,
            &AtomicBool::new(false),
        )
        .unwrap();

        assert_eq!(stats.frames, 3);
        assert_eq!(stats.packets, 3);
        let events = log.events();
        assert_eq!(events[0], "connect");
        assert!(events[1].starts_with("packet:1:"), "handshake flushed first: {events:?}");
        assert_eq!(events.last().unwrap(), "end");
        assert_eq!(ctx.game_data.as_ref().unwrap().world_name, "capture");
    }

    #[test]
    fn cancellation_stops_between_frames_without_error() {
        let log = Log::default();
        let mut handlers = HandlerList::new();
        handlers.register(Box::new(Probe(log.clone())));
        let mut ctx = SessionContext::new();

        let cancel = AtomicBool::new(true);
        let stats = replay(Cursor::new(capture()), &mut handlers, &mut ctx, &cancel).unwrap();
        assert_eq!(stats.frames, 0);
        assert!(log.events().is_empty());
    }

    #[test]
    fn replay_file_reports_missing_captures() {
        let dir = tempfile::tempdir().unwrap();
        let mut handlers = HandlerList::new();
        let err = replay_file(&dir.path().join("absent.vtrp"), &mut handlers);
        assert!(err.is_err());
    }

    #[test]
    fn replay_file_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.vtrp");
        std::fs::write(&path, capture()).unwrap();

        let log = Log::default();
        let mut handlers = HandlerList::new();
        handlers.register(Box::new(Probe(log.clone())));
        let stats = replay_file(&path, &mut handlers).unwrap();
        assert_eq!(stats.packets, 3);
        assert_eq!(log.events().last().unwrap(), "end");
    }
}
