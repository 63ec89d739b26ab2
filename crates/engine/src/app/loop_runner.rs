use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowBuilder};

use crate::assets::ThreadedAssetLoader;
use crate::net::{NetworkClient, ServerLink};
use crate::world::Viewport;

use super::input::ViewerKey;
use super::jump::JumpTuning;
use super::metrics::MetricsAccumulator;
use super::rendering::Renderer;
use super::viewer::ViewerWorld;

pub const DEFAULT_SERVER_URL: &str = "wss://codepath-mmorg.onrender.com";
pub const DEFAULT_USERNAME: &str = "Prajita";
pub const DEFAULT_MAP_SOURCE: &str = "world.jpg";
pub const DEFAULT_AVATAR_SCALE: f32 = 1.5;
pub const DEFAULT_LOADER_THREADS: usize = 2;

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub server_url: String,
    pub username: String,
    pub map_source: String,
    pub avatar_scale: f32,
    pub jump: JumpTuning,
    pub loader_threads: usize,
    pub metrics_log_interval: Duration,
    /// Upper bound on how long the loop sleeps before draining network and asset queues.
    pub poll_interval: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_title: "World Viewer".to_string(),
            window_width: 1024,
            window_height: 768,
            server_url: DEFAULT_SERVER_URL.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            map_source: DEFAULT_MAP_SOURCE.to_string(),
            avatar_scale: DEFAULT_AVATAR_SCALE,
            jump: JumpTuning::default(),
            loader_threads: DEFAULT_LOADER_THREADS,
            metrics_log_interval: Duration::from_secs(5),
            poll_interval: Duration::from_millis(8),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("failed to start asset loader threads: {0}")]
    SpawnLoader(#[source] io::Error),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens the window and drives the viewer until the window closes or Escape is
/// pressed. `link` must already be connecting; the join request goes out when
/// it reports open.
pub fn run_app(config: ViewerConfig, link: Box<dyn ServerLink>) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let buffer_size = buffer_size_for(window.inner_size(), window.scale_factor());
    let mut renderer =
        Renderer::new(Arc::clone(&window), buffer_size).map_err(AppError::CreateRenderer)?;

    let loader_threads = config.loader_threads.max(1);
    let avatar_loader =
        ThreadedAssetLoader::spawn("avatar-loader", loader_threads).map_err(AppError::SpawnLoader)?;
    let map_loader = ThreadedAssetLoader::spawn("map-loader", 1).map_err(AppError::SpawnLoader)?;
    let mut world = ViewerWorld::new(
        &config,
        buffer_size,
        Box::new(avatar_loader),
        Box::new(map_loader),
    );
    world.begin_map_load(config.map_source.clone());
    let mut network = NetworkClient::new(link, config.username.clone());

    let poll_interval = normalize_non_zero_duration(config.poll_interval, Duration::from_millis(8));
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(5));
    let mut metrics = MetricsAccumulator::new(metrics_log_interval, Instant::now());
    let mut inbound = Vec::new();

    info!(
        server_url = %config.server_url,
        username = %config.username,
        map_source = %config.map_source,
        avatar_scale = config.avatar_scale,
        jump_ms = config.jump.duration.as_millis() as u64,
        jump_height_px = config.jump.height_px,
        loader_threads,
        buffer_width = buffer_size.width,
        buffer_height = buffer_size.height,
        "loop_config"
    );

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                    if let Err(error) = apply_resize(&window, &mut renderer, &mut world) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::Focused(false) => {
                    if let Some(intent) = world.release_all_keys() {
                        network.send_intent(intent);
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if is_quit_key(&event) {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                        return;
                    }
                    let key = match event.physical_key {
                        PhysicalKey::Code(code) => ViewerKey::from_key_code(code),
                        PhysicalKey::Unidentified(_) => None,
                    };
                    let pressed = event.state == ElementState::Pressed;
                    let outcome = world.handle_key(key, pressed, event.repeat, Instant::now());
                    if let Some(intent) = outcome.intent {
                        if let Some(sent) = network.send_intent(intent) {
                            debug!(message = ?sent, "intent_sent");
                        }
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    match world.advance_frame(now) {
                        Some(jump_offset_px) => match renderer.render(&world, jump_offset_px) {
                            Ok(Some(report)) => metrics
                                .record_presented(report.sprites_drawn, report.sprites_culled),
                            Ok(None) => {}
                            Err(error) => {
                                warn!(error = %error, "renderer_draw_failed");
                                window_target.exit();
                            }
                        },
                        None => metrics.record_skipped(),
                    }
                    if let Some(snapshot) = metrics.maybe_snapshot(now) {
                        info!(
                            fps = snapshot.fps,
                            frames_presented = snapshot.frames_presented,
                            frames_skipped = snapshot.frames_skipped,
                            messages_applied = snapshot.messages_applied,
                            sprites_drawn = snapshot.sprites_drawn,
                            sprites_culled = snapshot.sprites_culled,
                            player_count = world.store().len(),
                            pending_asset_loads = world.avatars().pending_loads(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                network.poll(&mut inbound);
                metrics.record_messages(inbound.len());
                for message in inbound.drain(..) {
                    world.apply_server_message(message);
                }
                world.pump_assets();
                if world.needs_redraw() {
                    window.request_redraw();
                }
                window_target.set_control_flow(ControlFlow::WaitUntil(
                    Instant::now() + poll_interval,
                ));
            }
            Event::LoopExiting => {
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn apply_resize(
    window: &Window,
    renderer: &mut Renderer,
    world: &mut ViewerWorld,
) -> Result<(), PixelsError> {
    let surface = window.inner_size();
    if surface.width == 0 || surface.height == 0 {
        return Ok(());
    }
    let buffer_size = buffer_size_for(surface, window.scale_factor());
    renderer.resize(Viewport::new(surface.width, surface.height), buffer_size)?;
    world.resize(buffer_size);
    debug!(
        surface_width = surface.width,
        surface_height = surface.height,
        buffer_width = buffer_size.width,
        buffer_height = buffer_size.height,
        "viewport_resized"
    );
    Ok(())
}

/// Framebuffer size in logical pixels, never smaller than 1x1.
fn buffer_size_for(surface: PhysicalSize<u32>, scale_factor: f64) -> Viewport {
    let scale_factor = if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor
    } else {
        1.0
    };
    let logical: LogicalSize<f64> = surface.to_logical(scale_factor);
    Viewport::new(
        (logical.width.floor() as u32).max(1),
        (logical.height.floor() as u32).max(1),
    )
}

fn is_quit_key(event: &KeyEvent) -> bool {
    event.state == ElementState::Pressed
        && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
