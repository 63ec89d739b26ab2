mod paint;
mod renderer;
mod text;
mod transform;

pub use paint::{Canvas, ScreenRect};
pub use renderer::{collect_draw_order, FrameReport, Renderer, WorldRenderer};
pub use transform::{is_culled, normalized_sprite_scale, sprite_rect, world_to_screen_px};
