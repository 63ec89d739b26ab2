use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::ViewerWorld;
use crate::world::{Player, Viewport};

use super::paint::Canvas;
use super::text::LabelPainter;
use super::transform::{is_culled, sprite_rect, world_to_screen_px};

const CLEAR_COLOR: [u8; 4] = [18, 20, 26, 255];
const SHADOW_COLOR: [u8; 4] = [0, 0, 0, 64];
const LABEL_FILL_COLOR: [u8; 4] = [255, 255, 255, 255];
const LABEL_OUTLINE_COLOR: [u8; 4] = [0, 0, 0, 179];
const LABEL_BASELINE_LIFT_PX: i32 = 10;
const SHADOW_DROP_PX: i32 = 2;

/// What a painted frame contained. Used for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub sprites_drawn: usize,
    pub sprites_culled: usize,
    pub labels_drawn: usize,
    pub shadow_drawn: bool,
}

/// Players back-to-front: ascending world `y`, ties broken by id so the order
/// is stable across frames.
pub fn collect_draw_order(world: &ViewerWorld) -> Vec<&Player> {
    let mut players: Vec<&Player> = world.store().all_players().collect();
    players.sort_by(|a, b| a.y.total_cmp(&b.y).then_with(|| a.id.cmp(&b.id)));
    players
}

#[derive(Debug, Default)]
pub struct WorldRenderer {
    labels: LabelPainter,
}

impl WorldRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paints one frame. Returns `None` without touching the canvas until the
    /// map has loaded.
    pub fn render_frame(
        &mut self,
        canvas: &mut Canvas<'_>,
        world: &ViewerWorld,
        jump_offset_px: i32,
    ) -> Option<FrameReport> {
        let map = world.map_image()?;
        let camera = world.camera()?;
        let mut report = FrameReport::default();

        canvas.clear(CLEAR_COLOR);
        canvas.blit_region(map, camera.x.max(0) as u32, camera.y.max(0) as u32);

        for player in collect_draw_order(world) {
            let is_local = world.store().is_local(&player.id);
            let (screen_x, ground_y) = world_to_screen_px(player.x, player.y, camera);
            let lift = if is_local { jump_offset_px.max(0) } else { 0 };
            let screen_y = ground_y.saturating_sub(lift);

            let Some(avatar) = player.avatar.as_deref() else {
                self.draw_label(canvas, world, player, screen_x, screen_y, &mut report);
                continue;
            };
            let frame = world
                .avatars()
                .frame_for(avatar, player.facing, player.animation_frame);
            if let Some(image) = frame.image {
                let rect = sprite_rect(screen_x, screen_y, image, world.avatar_scale());
                if is_culled(rect, canvas.width(), canvas.height()) {
                    report.sprites_culled += 1;
                    continue;
                }
                if lift > 0 {
                    let shadow_w = (rect.width as f64 * 0.5).floor() as u32;
                    let shadow_h = ((rect.height as f64 * 0.12).floor() as u32).max(3);
                    canvas.fill_ellipse_blended(
                        screen_x,
                        ground_y.saturating_add(SHADOW_DROP_PX),
                        shadow_w / 2,
                        shadow_h / 2,
                        SHADOW_COLOR,
                    );
                    report.shadow_drawn = true;
                }
                canvas.draw_sprite_scaled(image, rect, frame.mirrored);
                report.sprites_drawn += 1;
            }
            self.draw_label(canvas, world, player, screen_x, screen_y, &mut report);
        }
        Some(report)
    }

    fn draw_label(
        &mut self,
        canvas: &mut Canvas<'_>,
        world: &ViewerWorld,
        player: &Player,
        screen_x: i32,
        screen_y: i32,
        report: &mut FrameReport,
    ) {
        let Some(label) = world.label_for(player) else {
            return;
        };
        self.labels.draw_outlined(
            canvas,
            label,
            screen_x,
            screen_y.saturating_sub(LABEL_BASELINE_LIFT_PX),
            LABEL_FILL_COLOR,
            LABEL_OUTLINE_COLOR,
        );
        report.labels_drawn += 1;
    }
}

/// Window-backed presenter. The framebuffer is sized in logical pixels so one
/// world pixel covers one logical pixel; `pixels` scales it to the surface.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    buffer_size: Viewport,
    world_renderer: WorldRenderer,
}

impl Renderer {
    pub fn new(window: Arc<Window>, buffer_size: Viewport) -> Result<Self, Error> {
        let surface = window.inner_size();
        let pixels = Self::build_pixels(
            Arc::clone(&window),
            Viewport::new(surface.width, surface.height),
            buffer_size,
        )?;
        Ok(Self {
            window,
            pixels,
            buffer_size,
            world_renderer: WorldRenderer::new(),
        })
    }

    pub fn resize(&mut self, surface: Viewport, buffer_size: Viewport) -> Result<(), Error> {
        if surface.is_empty() || buffer_size.is_empty() {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), surface, buffer_size)?;
        self.buffer_size = buffer_size;
        Ok(())
    }

    /// Paints and presents. Returns the frame report, or `None` when nothing
    /// was presented because the map is not ready.
    pub fn render(
        &mut self,
        world: &ViewerWorld,
        jump_offset_px: i32,
    ) -> Result<Option<FrameReport>, Error> {
        let size = self.buffer_size;
        let report = {
            let mut canvas = Canvas::new(self.pixels.frame_mut(), size.width, size.height);
            self.world_renderer
                .render_frame(&mut canvas, world, jump_offset_px)
        };
        if report.is_some() {
            self.pixels.render()?;
        }
        Ok(report)
    }

    fn build_pixels(
        window: Arc<Window>,
        surface: Viewport,
        buffer_size: Viewport,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(surface.width, surface.height, window);
        Pixels::new(buffer_size.width, buffer_size.height, surface)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::app::{ViewerConfig, ViewerKey};
    use crate::assets::{encode_png_data_url, InlineAssetLoader, SpriteImage};
    use crate::net::ServerMessage;
    use crate::world::{AvatarDef, AvatarFrameSources, Facing};

    const MAP_COLOR: [u8; 4] = [20, 140, 60, 255];
    const SOUTH_COLOR: [u8; 4] = [220, 30, 30, 255];

    fn data_url(image: &SpriteImage) -> String {
        encode_png_data_url(image).expect("encode png")
    }

    /// East frame: left column red, the rest blue.
    fn east_frame() -> SpriteImage {
        let mut rgba = Vec::new();
        for _y in 0..4 {
            for x in 0..4 {
                let color = if x == 0 { [255, 0, 0, 255] } else { [0, 0, 255, 255] };
                rgba.extend_from_slice(&color);
            }
        }
        SpriteImage::from_rgba(4, 4, rgba).expect("sized")
    }

    fn joined_world(players: Vec<Player>, viewport: Viewport) -> ViewerWorld {
        let config = ViewerConfig {
            avatar_scale: 1.0,
            ..ViewerConfig::default()
        };
        let mut world = ViewerWorld::new(
            &config,
            viewport,
            Box::new(InlineAssetLoader::new()),
            Box::new(InlineAssetLoader::new()),
        );
        world.begin_map_load(data_url(&SpriteImage::solid(400, 300, MAP_COLOR)));
        let avatar = AvatarDef {
            name: "knight".to_string(),
            frames: AvatarFrameSources {
                north: Vec::new(),
                south: vec![data_url(&SpriteImage::solid(4, 4, SOUTH_COLOR))],
                east: vec![data_url(&east_frame())],
            },
        };
        world.apply_server_message(ServerMessage::JoinAccepted {
            player_id: players[0].id.clone(),
            players: players
                .into_iter()
                .map(|player| (player.id.clone(), player))
                .collect(),
            avatars: HashMap::from([("knight".to_string(), avatar)]),
        });
        world.pump_assets();
        world
    }

    fn knight(id: &str, x: f64, y: f64, facing: Facing) -> Player {
        Player {
            avatar: Some("knight".to_string()),
            facing,
            ..Player::new(id, x, y)
        }
    }

    fn render(world: &ViewerWorld, jump_offset: i32) -> (Vec<u8>, Option<FrameReport>) {
        let viewport = world.viewport();
        let mut frame = vec![0u8; (viewport.width * viewport.height * 4) as usize];
        let report = {
            let mut canvas = Canvas::new(&mut frame, viewport.width, viewport.height);
            WorldRenderer::new().render_frame(&mut canvas, world, jump_offset)
        };
        (frame, report)
    }

    fn pixel(frame: &[u8], width: u32, x: i32, y: i32) -> [u8; 4] {
        let offset = ((y as u32 * width + x as u32) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn nothing_is_painted_before_the_map_loads() {
        let world = ViewerWorld::new(
            &ViewerConfig::default(),
            Viewport::new(16, 16),
            Box::new(InlineAssetLoader::new()),
            Box::new(InlineAssetLoader::new()),
        );
        let (frame, report) = render(&world, 0);
        assert_eq!(report, None);
        assert!(frame.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn far_off_players_are_culled_without_overflow() {
        let far_north = Player {
            username: Some("far".to_string()),
            ..knight("far", 200.0, -1.0e12, Facing::South)
        };
        let far_east = Player {
            username: Some("edge".to_string()),
            ..Player::new("edge", 1.0e15, 1.0e15)
        };
        let world = joined_world(
            vec![knight("me", 200.0, 150.0, Facing::South), far_north, far_east],
            Viewport::new(64, 48),
        );
        let (frame, report) = render(&world, 12);
        let report = report.expect("painted");
        assert_eq!(report.sprites_drawn, 1);
        assert_eq!(report.sprites_culled, 1);
        assert!(report.shadow_drawn);
        assert_eq!(pixel(&frame, 64, 0, 0), MAP_COLOR);
    }

    #[test]
    fn draw_order_is_ascending_y() {
        let world = joined_world(
            vec![
                knight("me", 100.0, 150.0, Facing::South),
                knight("north", 120.0, 20.0, Facing::South),
                knight("south", 80.0, 290.0, Facing::South),
            ],
            Viewport::new(64, 64),
        );
        let ids: Vec<&str> = collect_draw_order(&world)
            .iter()
            .map(|player| player.id.as_str())
            .collect();
        assert_eq!(ids, vec!["north", "me", "south"]);
    }

    #[test]
    fn local_sprite_is_drawn_at_its_feet_over_the_map() {
        let world = joined_world(
            vec![knight("me", 200.0, 150.0, Facing::South)],
            Viewport::new(64, 48),
        );
        let camera = world.camera().expect("camera");
        assert_eq!((camera.x, camera.y), (168, 126));
        let (frame, report) = render(&world, 0);
        let report = report.expect("painted");
        assert_eq!(report.sprites_drawn, 1);
        assert!(!report.shadow_drawn);

        // feet at (32, 24); 4x4 sprite spans x 30..34, y 24..28
        assert_eq!(pixel(&frame, 64, 30, 24), SOUTH_COLOR);
        assert_eq!(pixel(&frame, 64, 33, 27), SOUTH_COLOR);
        assert_eq!(pixel(&frame, 64, 29, 24), MAP_COLOR);
        assert_eq!(pixel(&frame, 64, 30, 28), MAP_COLOR);
        assert_eq!(pixel(&frame, 64, 63, 47), MAP_COLOR);
    }

    #[test]
    fn west_facing_is_mirrored_east_frame() {
        let world = joined_world(
            vec![
                knight("me", 200.0, 150.0, Facing::East),
                knight("west", 210.0, 150.0, Facing::West),
            ],
            Viewport::new(64, 48),
        );
        let (frame, _) = render(&world, 0);
        // east sprite spans x 30..34 with red on the left; west spans 40..44 red on the right
        assert_eq!(pixel(&frame, 64, 30, 25), [255, 0, 0, 255]);
        assert_eq!(pixel(&frame, 64, 33, 25), [0, 0, 255, 255]);
        assert_eq!(pixel(&frame, 64, 43, 25), [255, 0, 0, 255]);
        assert_eq!(pixel(&frame, 64, 40, 25), [0, 0, 255, 255]);
    }

    #[test]
    fn missing_direction_draws_no_sprite() {
        let world = joined_world(
            vec![knight("me", 200.0, 150.0, Facing::North)],
            Viewport::new(64, 48),
        );
        let (frame, report) = render(&world, 0);
        assert_eq!(report.expect("painted").sprites_drawn, 0);
        assert_eq!(pixel(&frame, 64, 31, 25), MAP_COLOR);
    }

    #[test]
    fn offscreen_players_are_culled() {
        let world = joined_world(
            vec![
                knight("me", 20.0, 20.0, Facing::South),
                knight("far", 390.0, 290.0, Facing::South),
            ],
            Viewport::new(64, 48),
        );
        let report = render(&world, 0).1.expect("painted");
        assert_eq!(report.sprites_drawn, 1);
        assert_eq!(report.sprites_culled, 1);
    }

    #[test]
    fn jump_lifts_only_local_player_and_adds_shadow() {
        let world = joined_world(
            vec![
                knight("me", 200.0, 150.0, Facing::South),
                knight("other", 215.0, 150.0, Facing::South),
            ],
            Viewport::new(64, 48),
        );
        let (frame, report) = render(&world, 10);
        assert!(report.expect("painted").shadow_drawn);
        // local sprite moved up by 10px
        assert_eq!(pixel(&frame, 64, 31, 15), SOUTH_COLOR);
        assert_ne!(pixel(&frame, 64, 31, 26), SOUTH_COLOR);
        // remote sprite stays on the ground
        assert_eq!(pixel(&frame, 64, 46, 26), SOUTH_COLOR);
    }

    #[test]
    fn labels_fall_back_only_for_local_player() {
        let mut other = knight("other", 215.0, 150.0, Facing::South);
        other.username = None;
        let world = joined_world(
            vec![knight("me", 200.0, 150.0, Facing::South), other],
            Viewport::new(64, 48),
        );
        assert_eq!(render(&world, 0).1.expect("painted").labels_drawn, 1);
    }

    #[test]
    fn frame_loop_renders_jump_frames_until_landing() {
        let mut world = joined_world(
            vec![knight("me", 200.0, 150.0, Facing::South)],
            Viewport::new(64, 48),
        );
        let start = Instant::now();
        assert!(world.advance_frame(start).is_some());
        assert!(world.advance_frame(start).is_none());
        world.handle_key(Some(ViewerKey::Jump), true, false, start);

        let offset = world
            .advance_frame(start + Duration::from_millis(300))
            .expect("jumping frame");
        let report = render(&world, offset).1.expect("painted");
        assert!(report.shadow_drawn);
        assert_eq!(world.advance_frame(start + Duration::from_millis(900)), Some(0));
        assert!(world.advance_frame(start + Duration::from_millis(950)).is_none());
    }
}
