use super::players::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

/// Drawable area in framebuffer pixels. World pixels map 1:1 onto it.
pub type Viewport = PixelSize;

impl PixelSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// World-space position of the viewport's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Camera {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CameraController {
    camera: Camera,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn recenter_on(&mut self, player: &Player, viewport: Viewport, map: PixelSize) -> Camera {
        self.camera = centered_camera(player.x, player.y, viewport, map);
        self.camera
    }
}

pub fn centered_camera(x: f64, y: f64, viewport: Viewport, map: PixelSize) -> Camera {
    let half_w = (viewport.width / 2) as f64;
    let half_h = (viewport.height / 2) as f64;
    let desired_x = (x - half_w).floor();
    let desired_y = (y - half_h).floor();
    Camera {
        x: clamp_axis(desired_x, viewport.width, map.width),
        y: clamp_axis(desired_y, viewport.height, map.height),
    }
}

fn clamp_axis(desired: f64, viewport_dim: u32, map_dim: u32) -> i32 {
    let max = map_dim.saturating_sub(viewport_dim).min(i32::MAX as u32) as i32;
    if !desired.is_finite() {
        return 0;
    }
    desired.clamp(0.0, max as f64) as i32
}
