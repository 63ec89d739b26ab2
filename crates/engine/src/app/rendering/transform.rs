use crate::assets::SpriteImage;
use crate::world::Camera;

use super::paint::ScreenRect;

/// Screen coordinates are clamped to this magnitude. Anything past it is far
/// off any real surface, and the headroom keeps sprite and label offsets from
/// overflowing.
const SCREEN_COORD_LIMIT: f64 = (1 << 24) as f64;

/// World pixels map 1:1 to screen pixels; the camera only translates.
pub fn world_to_screen_px(x: f64, y: f64, camera: Camera) -> (i32, i32) {
    (
        screen_coord(x - camera.x as f64),
        screen_coord(y - camera.y as f64),
    )
}

pub fn normalized_sprite_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

/// Rectangle for a sprite whose feet sit at `(anchor_x, anchor_y)`: centred
/// horizontally, bottom edge four pixels below the anchor.
pub fn sprite_rect(anchor_x: i32, anchor_y: i32, sprite: &SpriteImage, scale: f32) -> ScreenRect {
    let scale = normalized_sprite_scale(scale);
    let width = (sprite.width as f32 * scale).round().max(1.0) as u32;
    let height = (sprite.height as f32 * scale).round().max(1.0) as u32;
    ScreenRect {
        left: floor_to_i32(anchor_x as f64 - width as f64 / 2.0),
        top: anchor_y
            .saturating_sub(i32::try_from(height).unwrap_or(i32::MAX))
            .saturating_add(4),
        width,
        height,
    }
}

/// True when no part of `rect` can land inside a `width` x `height` screen.
pub fn is_culled(rect: ScreenRect, width: u32, height: u32) -> bool {
    rect.left > width as i32 || rect.top > height as i32 || rect.right() < 0 || rect.bottom() < 0
}

fn screen_coord(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    value.floor().clamp(-SCREEN_COORD_LIMIT, SCREEN_COORD_LIMIT) as i32
}

fn floor_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    value.floor().clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_translates_and_floors() {
        let camera = Camera { x: 100, y: 40 };
        assert_eq!(world_to_screen_px(150.7, 60.2, camera), (50, 20));
        assert_eq!(world_to_screen_px(99.5, 39.9, camera), (-1, -1));
    }

    #[test]
    fn sprite_rect_centres_on_feet() {
        let sprite = SpriteImage::solid(32, 48, [0, 0, 0, 255]);
        let rect = sprite_rect(100, 200, &sprite, 1.5);
        assert_eq!(
            rect,
            ScreenRect {
                left: 76,
                top: 132,
                width: 48,
                height: 72,
            }
        );
        let odd = sprite_rect(10, 10, &SpriteImage::solid(3, 3, [0; 4]), 1.0);
        assert_eq!((odd.left, odd.width), (8, 3));
    }

    #[test]
    fn invalid_scale_falls_back_to_native_size() {
        let sprite = SpriteImage::solid(5, 7, [0; 4]);
        for scale in [0.0, -2.0, f32::NAN, f32::INFINITY] {
            let rect = sprite_rect(0, 0, &sprite, scale);
            assert_eq!((rect.width, rect.height), (5, 7));
        }
        let tiny = sprite_rect(0, 0, &sprite, 0.01);
        assert_eq!((tiny.width, tiny.height), (1, 1));
    }

    #[test]
    fn culling_only_drops_fully_outside_rects() {
        let rect = |left, top| ScreenRect {
            left,
            top,
            width: 10,
            height: 10,
        };
        assert!(!is_culled(rect(-5, -5), 100, 100));
        assert!(!is_culled(rect(95, 95), 100, 100));
        assert!(is_culled(rect(-11, 0), 100, 100));
        assert!(is_culled(rect(0, 101), 100, 100));
    }

    #[test]
    fn far_off_coordinates_stay_in_range() {
        let camera = Camera { x: 0, y: 0 };
        let (x, y) = world_to_screen_px(1.0e15, -1.0e12, camera);
        assert_eq!((x, y), (1 << 24, -(1 << 24)));
        assert_eq!(world_to_screen_px(f64::NAN, f64::NEG_INFINITY, camera).1, -(1 << 24));

        let sprite = SpriteImage::solid(8, 8, [0; 4]);
        let rect = sprite_rect(i32::MIN, i32::MIN, &sprite, 1.0);
        assert_eq!(rect.top, i32::MIN + 4);
        assert!(is_culled(rect, 100, 100));
    }
}
