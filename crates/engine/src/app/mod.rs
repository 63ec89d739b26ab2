mod input;
mod jump;
mod loop_runner;
mod metrics;
mod render_loop;
mod rendering;
mod viewer;

pub use input::{HeldDirections, InputController, InputIntent, KeyOutcome, MoveDirection, ViewerKey};
pub use jump::{
    jump_offset_px, JumpAnimationController, JumpState, JumpTuning, DEFAULT_JUMP_DURATION,
    DEFAULT_JUMP_HEIGHT_PX,
};
pub use loop_runner::{
    run_app, AppError, ViewerConfig, DEFAULT_AVATAR_SCALE, DEFAULT_LOADER_THREADS,
    DEFAULT_MAP_SOURCE, DEFAULT_SERVER_URL, DEFAULT_USERNAME,
};
pub use metrics::LoopMetricsSnapshot;
pub use render_loop::RenderLoop;
pub use rendering::{
    collect_draw_order, is_culled, normalized_sprite_scale, sprite_rect, world_to_screen_px,
    Canvas, FrameReport, Renderer, ScreenRect, WorldRenderer,
};
pub use viewer::ViewerWorld;
