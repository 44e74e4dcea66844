//! Print per-direction packet counts for a capture file.
//!
//! Usage: `replay_summary <capture.vtrp>`

use std::path::PathBuf;
use std::time::SystemTime;

use tap_protocol::{Direction, Packet};
use tap_replay::replay_file;
use tap_session::{HandlerList, SessionContext, SessionHandler};

#[derive(Default)]
struct Counter {
    to_server: u64,
    to_client: u64,
}

impl SessionHandler for Counter {
    fn on_connect(&mut self, ctx: &mut SessionContext, _address: Option<&str>) {
        if let Some(game_data) = ctx.game_data.as_ref() {
            println!(
                "world {:?}, version {}, seed {}",
                game_data.world_name, game_data.base_game_version, game_data.world_seed
            );
        }
    }

    fn on_packet(
        &mut self,
        _ctx: &mut SessionContext,
        _packet: &Packet,
        direction: Direction,
        _timestamp: SystemTime,
    ) {
        match direction {
            Direction::ToServer => self.to_server += 1,
            Direction::ToClient => self.to_client += 1,
        }
    }

    fn on_end(&mut self, _ctx: &mut SessionContext) {
        println!(
            "{} packets to server, {} to client",
            self.to_server, self.to_client
        );
    }
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path: PathBuf = std::env::args_os()
        .nth(1)
        .ok_or_else(|| eyre::eyre!("usage: replay_summary <capture.vtrp>"))?
        .into();

    let mut handlers = HandlerList::new();
    handlers.register(Box::new(Counter::default()));
    let stats = replay_file(&path, &mut handlers)?;
    println!("{} frames, {} packets", stats.frames, stats.packets);
    Ok(())
}
