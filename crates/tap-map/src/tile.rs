//! Top-down tile rasterization.

use image::{Rgba, RgbaImage};
use tap_chunk::{BlockRegistry, Column};

/// Tile edge length in pixels; one pixel per block column.
pub const TILE_SIZE: u32 = 16;

/// Liquid blend alpha at depth zero.
const LIQUID_ALPHA_BASE: i32 = 150;
/// Extra alpha per block of liquid depth.
const LIQUID_ALPHA_PER_DEPTH: i32 = 7;
/// Per-channel darkening applied to an occluded surface.
const OCCLUSION_STEP: u8 = 10;
/// Red overlay alpha marking a provisional tile.
const PROVISIONAL_ALPHA: u8 = 128;

fn blend(base: [u8; 4], over: [u8; 4], alpha: u8) -> [u8; 4] {
    let a = u16::from(alpha);
    let inv = 255 - a;
    let mut out = [0u8; 4];
    for i in 0..3 {
        out[i] = ((u16::from(over[i]) * a + u16::from(base[i]) * inv) / 255) as u8;
    }
    out[3] = base[3].max(over[3]);
    out
}

fn darken(color: [u8; 4]) -> [u8; 4] {
    [
        color[0].saturating_sub(OCCLUSION_STEP),
        color[1].saturating_sub(OCCLUSION_STEP),
        color[2].saturating_sub(OCCLUSION_STEP),
        color[3],
    ]
}

/// Rasterize one column into a height-sampled top-down tile.
///
/// Each pixel takes the color of the highest non-air block. A liquid
/// surface is blended translucently over the solid floor beneath it,
/// deeper liquid more opaque, and the occluded floor is darkened one
/// fixed step per channel. Columns with nothing stored stay
/// transparent.
#[must_use]
pub fn rasterize_tile(column: &Column, registry: &BlockRegistry) -> RgbaImage {
    let mut tile = RgbaImage::new(TILE_SIZE, TILE_SIZE);
    for z in 0..TILE_SIZE as u8 {
        for x in 0..TILE_SIZE as u8 {
            let Some(top) = column.top_block_y(x, z, registry, true) else {
                continue;
            };
            let surface = column.block_at(x, top, z, registry);
            let color = if registry.is_liquid(surface) {
                let floor = column.top_block_y(x, z, registry, false);
                let base = floor.map_or([0, 0, 0, 255], |y| {
                    darken(registry.color(column.block_at(x, y, z, registry)))
                });
                let depth = top - floor.unwrap_or(column.range().min_y);
                let alpha = (LIQUID_ALPHA_BASE + LIQUID_ALPHA_PER_DEPTH * depth).clamp(0, 255);
                blend(base, registry.color(surface), alpha as u8)
            } else {
                registry.color(surface)
            };
            tile.put_pixel(u32::from(x), u32::from(z), Rgba(color));
        }
    }
    tile
}

/// Overlay the translucent red "updating" marker on a tile.
#[must_use]
pub fn tint_provisional(mut tile: RgbaImage) -> RgbaImage {
    for pixel in tile.pixels_mut() {
        if pixel.0[3] == 0 {
            continue;
        }
        pixel.0 = blend(pixel.0, [255, 0, 0, 255], PROVISIONAL_ALPHA);
    }
    tile
}

#[cfg(test)]
mod tests {
    use super::*;
    use tap_chunk::DimensionRange;

    #[test]
    fn dry_surface_uses_the_block_color() {
        let registry = BlockRegistry::vanilla();
        let grass = registry.id_for("minecraft:grass_block").unwrap();
        let mut column = Column::new(DimensionRange::OVERWORLD);
        column.set_block(4, 70, 4, grass, &registry);

        let tile = rasterize_tile(&column, &registry);
        assert_eq!(tile.get_pixel(4, 4).0, registry.color(grass));
        // Untouched positions stay transparent.
        assert_eq!(tile.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn deeper_water_is_more_opaque() {
        let registry = BlockRegistry::vanilla();
        let stone = registry.id_for("minecraft:stone").unwrap();
        let water = registry.id_for("minecraft:water").unwrap();
        let mut column = Column::new(DimensionRange::OVERWORLD);
        for (x, depth) in [(0u8, 1i32), (1, 10)] {
            column.set_block(x, 50, 0, stone, &registry);
            for y in 51..=50 + depth {
                column.set_block(x, y, 0, water, &registry);
            }
        }

        let tile = rasterize_tile(&column, &registry);
        let shallow = tile.get_pixel(0, 0).0;
        let deep = tile.get_pixel(1, 0).0;
        let water_color = registry.color(water);
        // Deeper water pulls the pixel closer to the pure water color.
        let dist = |c: [u8; 4]| {
            (0..3)
                .map(|i| (i32::from(c[i]) - i32::from(water_color[i])).abs())
                .sum::<i32>()
        };
        assert!(dist(deep) < dist(shallow));
    }

    #[test]
    fn provisional_tint_reddens_opaque_pixels_only() {
        let registry = BlockRegistry::vanilla();
        let stone = registry.id_for("minecraft:stone").unwrap();
        let mut column = Column::new(DimensionRange::OVERWORLD);
        column.set_block(2, 70, 2, stone, &registry);

        let plain = rasterize_tile(&column, &registry);
        let tinted = tint_provisional(plain.clone());
        assert!(tinted.get_pixel(2, 2).0[0] > plain.get_pixel(2, 2).0[0]);
        assert_eq!(tinted.get_pixel(0, 0).0[3], 0);
    }
}
