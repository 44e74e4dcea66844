//! Periodic map scheduling: the redraw-if-dirty tick and the presence
//! re-announcement tick, cancelled as a unit.

use std::sync::Arc;
use std::time::Duration;

use tap_session::PacketSink;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::item::{announce_map_item, push_canvas};
use crate::renderer::MapRenderer;
use crate::DisplaySink;

/// Redraw cadence, roughly 30 Hz.
const REDRAW_INTERVAL: Duration = Duration::from_millis(33);
/// Presence re-announcement cadence.
const PRESENCE_INTERVAL: Duration = Duration::from_secs(1);

/// The two running map tasks plus their shared shutdown signal. Both
/// tasks stop promptly once [`MapTasks::stop`] fires; no canvas access
/// happens after that.
pub struct MapTasks {
    shutdown: watch::Sender<bool>,
    redraw: JoinHandle<()>,
    presence: JoinHandle<()>,
}

impl MapTasks {
    pub fn spawn(
        renderer: Arc<MapRenderer>,
        display: Arc<dyn DisplaySink>,
        packets: Arc<dyn PacketSink>,
    ) -> Self {
        // Capability is consulted once, at startup.
        let show_images = display.can_show_images();
        if !show_images {
            info!("display surface cannot show images, map preview limited to counts");
        }

        let (shutdown, rx) = watch::channel(false);

        let redraw = {
            let renderer = Arc::clone(&renderer);
            let packets = Arc::clone(&packets);
            let mut rx = rx.clone();
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(REDRAW_INTERVAL);
                loop {
                    tokio::select! {
                        _ = tick.tick() => {
                            if let Some(update) = renderer.poll_update() {
                                if show_images {
                                    display.update(update);
                                }
                                push_canvas(packets.as_ref(), &renderer);
                            }
                        }
                        _ = rx.changed() => break,
                    }
                }
            })
        };

        let presence = {
            let mut rx = rx;
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(PRESENCE_INTERVAL);
                loop {
                    tokio::select! {
                        _ = tick.tick() => announce_map_item(packets.as_ref()),
                        _ = rx.changed() => break,
                    }
                }
            })
        };

        Self {
            shutdown,
            redraw,
            presence,
        }
    }

    /// Cancel both tasks and wait for them to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.redraw.await;
        let _ = self.presence.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tap_chunk::BlockRegistry;
    use tap_protocol::Packet;
    use tap_session::NullSink;

    struct CountingDisplay {
        updates: Mutex<usize>,
    }

    impl DisplaySink for CountingDisplay {
        fn can_show_images(&self) -> bool {
            true
        }

        fn update(&self, _update: crate::MapUpdate) {
            *self.updates.lock() += 1;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_stop_promptly_on_shutdown() {
        let renderer = Arc::new(MapRenderer::new(Arc::new(BlockRegistry::vanilla())));
        let display = Arc::new(CountingDisplay {
            updates: Mutex::new(0),
        });
        let tasks = MapTasks::spawn(renderer, display, Arc::new(NullSink));
        tokio::time::advance(Duration::from_millis(100)).await;
        tasks.stop().await;
    }

    #[test]
    fn null_sink_accepts_presence() {
        announce_map_item(&NullSink);
        let _ = NullSink.write_packet(&Packet::Unknown {
            id: 1,
            payload: Vec::new(),
        });
    }
}
