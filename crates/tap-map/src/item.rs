//! Wire packets presenting the preview as an in-game map item.

use tap_protocol::{
    BlockPos, InventoryContent, ItemInstance, MapItemData, Packet, MAP_UPDATE_INITIALISATION,
    MAP_UPDATE_TEXTURE,
};
use tap_session::PacketSink;
use tracing::warn;

use crate::renderer::{MapRenderer, CANVAS_SIZE};

/// Fixed identity of the preview map item. Never collides with real
/// map ids, which the server allocates from small positive integers.
pub const VIEW_MAP_ID: i64 = 0x0042_4242;

/// Off-hand window, where the preview item is presented.
const OFFHAND_WINDOW_ID: u32 = 119;
/// Network item id of a filled map.
const FILLED_MAP_NETWORK_ID: i32 = 420;

#[must_use]
fn presence_packet() -> Packet {
    Packet::InventoryContent(InventoryContent {
        window_id: OFFHAND_WINDOW_ID,
        content: vec![ItemInstance {
            stack_network_id: 1,
            item_network_id: FILLED_MAP_NETWORK_ID,
            count: 1,
            map_id: VIEW_MAP_ID,
        }],
    })
}

/// The texture push carrying the composited canvas.
#[must_use]
pub fn texture_packet(pixels: Vec<u32>) -> Packet {
    Packet::MapItemData(MapItemData {
        map_id: VIEW_MAP_ID,
        update_flags: MAP_UPDATE_INITIALISATION | MAP_UPDATE_TEXTURE,
        dimension: 0,
        locked: false,
        origin: BlockPos::new(0, 0, 0),
        included_in: vec![VIEW_MAP_ID],
        scale: 0,
        width: CANVAS_SIZE as i32,
        height: CANVAS_SIZE as i32,
        x_offset: 0,
        y_offset: 0,
        pixels,
    })
}

/// Re-announce the map item. Idempotent and best-effort: a send failure
/// is logged and the session continues.
pub fn announce_map_item(sink: &dyn PacketSink) {
    if let Err(err) = sink.write_packet(&presence_packet()) {
        warn!(%err, "failed to announce map item");
    }
}

/// Push the current canvas to the in-game map surface. Best-effort.
pub fn push_canvas(sink: &dyn PacketSink, renderer: &MapRenderer) {
    let packet = texture_packet(renderer.canvas_pixels());
    if let Err(err) = sink.write_packet(&packet) {
        warn!(%err, "failed to push map texture");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_presents_exactly_one_map_item() {
        let Packet::InventoryContent(content) = presence_packet() else {
            panic!("wrong packet kind");
        };
        assert_eq!(content.content.len(), 1);
        assert_eq!(content.content[0].map_id, VIEW_MAP_ID);
    }

    #[test]
    fn texture_packet_carries_canvas_dimensions() {
        let Packet::MapItemData(data) = texture_packet(vec![0; 128 * 128]) else {
            panic!("wrong packet kind");
        };
        assert_eq!(data.width, 128);
        assert_eq!(data.height, 128);
        assert_eq!(data.pixels.len(), 128 * 128);
        assert_ne!(data.update_flags & MAP_UPDATE_TEXTURE, 0);
    }
}
