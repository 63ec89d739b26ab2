use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::assets::{AssetLoader, LoadResult, LoadTicket, SpriteImage};
use crate::net::ServerMessage;
use crate::world::{
    AvatarAnimationCache, Camera, CameraController, PixelSize, Player, PlayerStateStore,
    RegistrationBatch, Viewport,
};

use super::input::{InputController, InputIntent, KeyOutcome, ViewerKey};
use super::jump::JumpAnimationController;
use super::loop_runner::ViewerConfig;
use super::render_loop::RenderLoop;

const MAP_TICKET: LoadTicket = LoadTicket(0);

#[derive(Debug, Clone)]
enum MapState {
    NotRequested,
    Loading,
    Ready(Arc<SpriteImage>),
    Failed,
}

/// Everything the viewer mutates, owned in one place and driven from the
/// event loop thread. Network messages, key events, asset completions and
/// resizes all enter through methods here.
pub struct ViewerWorld {
    store: PlayerStateStore,
    avatars: AvatarAnimationCache,
    camera: CameraController,
    jump: JumpAnimationController,
    input: InputController,
    render_loop: RenderLoop,
    map: MapState,
    map_loader: Box<dyn AssetLoader>,
    map_results: Vec<LoadResult>,
    viewport: Viewport,
    join_batch: Option<RegistrationBatch>,
    display_name: String,
    avatar_scale: f32,
}

impl ViewerWorld {
    pub fn new(
        config: &ViewerConfig,
        viewport: Viewport,
        avatar_loader: Box<dyn AssetLoader>,
        map_loader: Box<dyn AssetLoader>,
    ) -> Self {
        Self {
            store: PlayerStateStore::new(),
            avatars: AvatarAnimationCache::new(avatar_loader),
            camera: CameraController::new(),
            jump: JumpAnimationController::new(config.jump),
            input: InputController::new(),
            render_loop: RenderLoop::new(),
            map: MapState::NotRequested,
            map_loader,
            map_results: Vec::new(),
            viewport,
            join_batch: None,
            display_name: config.username.clone(),
            avatar_scale: config.avatar_scale,
        }
    }

    pub fn begin_map_load(&mut self, source: impl Into<String>) {
        if matches!(self.map, MapState::Loading | MapState::Ready(_)) {
            return;
        }
        let source = source.into();
        info!(source = %source, "map_load_started");
        self.map = MapState::Loading;
        self.map_loader.submit(MAP_TICKET, source);
    }

    pub fn apply_server_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::JoinAccepted {
                player_id,
                players,
                avatars,
            } => {
                let player_count = players.len();
                let avatar_count = avatars.len();
                self.store.apply_snapshot(player_id.clone(), players);
                self.join_batch = Some(self.avatars.register_avatars(avatars.into_values()));
                info!(
                    player_id = %player_id,
                    player_count,
                    avatar_count,
                    "joined_world"
                );
                self.recenter();
                self.render_loop.mark_dirty();
            }
            ServerMessage::PlayersMoved { players } => {
                let outcome = self.store.merge_updates(&players);
                if outcome.local_player_changed {
                    self.recenter();
                }
                if outcome.applied > 0 {
                    self.render_loop.mark_dirty();
                }
            }
            ServerMessage::PlayerJoined { player, avatar } => {
                if let Some(def) = avatar {
                    self.avatars.register_avatars([def]);
                }
                debug!(player_id = %player.id, "player_joined");
                if self.store.upsert_player(player) {
                    self.recenter();
                }
                self.render_loop.mark_dirty();
            }
            ServerMessage::PlayerLeft { player_id } => {
                if self.store.remove_player(&player_id).is_some() {
                    debug!(player_id = %player_id, "player_left");
                    self.render_loop.mark_dirty();
                }
            }
            ServerMessage::Rejected { action, error } => {
                warn!(
                    action = action.as_deref().unwrap_or("unknown"),
                    error = error.as_deref().unwrap_or(""),
                    "server_rejected_request"
                );
            }
            ServerMessage::Unknown { action } => {
                debug!(action = %action, "server_action_ignored");
            }
        }
    }

    /// Routes a key edge through the input controller. A jump intent is handled
    /// here; movement intents are left in the outcome for the network client.
    pub fn handle_key(
        &mut self,
        key: Option<ViewerKey>,
        pressed: bool,
        is_repeat: bool,
        now: Instant,
    ) -> KeyOutcome {
        let outcome = if pressed {
            self.input.key_down(key, is_repeat)
        } else {
            self.input.key_up(key)
        };
        if outcome.intent == Some(InputIntent::Jump) && self.jump.trigger(now) {
            self.render_loop.mark_dirty();
        }
        outcome
    }

    pub fn release_all_keys(&mut self) -> Option<InputIntent> {
        self.input.release_all()
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if viewport.is_empty() {
            return;
        }
        self.viewport = viewport;
        self.recenter();
        self.render_loop.mark_dirty();
    }

    /// Applies finished image loads. Safe to call every loop iteration.
    pub fn pump_assets(&mut self) {
        let mut results = std::mem::take(&mut self.map_results);
        self.map_loader.drain_completed(&mut results);
        for result in results.drain(..) {
            if result.ticket != MAP_TICKET {
                continue;
            }
            match result.outcome {
                Ok(image) => {
                    info!(width = image.width, height = image.height, "map_loaded");
                    self.map = MapState::Ready(Arc::new(image));
                    self.recenter();
                    self.render_loop.mark_dirty();
                }
                Err(error) => {
                    warn!(error = %error, "map_load_failed");
                    self.map = MapState::Failed;
                }
            }
        }
        self.map_results = results;

        let settled = self.avatars.pump();
        if settled.is_empty() {
            return;
        }
        if self.join_batch.is_some_and(|batch| settled.contains(&batch)) {
            self.join_batch = None;
            self.recenter();
        }
        self.render_loop.mark_dirty();
    }

    /// Returns the jump offset to paint with, or `None` when the frame is clean.
    pub fn advance_frame(&mut self, now: Instant) -> Option<i32> {
        self.render_loop.tick(now, &mut self.jump, |jump| jump.offset_px())
    }

    pub fn needs_redraw(&self) -> bool {
        self.render_loop.is_dirty()
    }

    pub fn mark_dirty(&mut self) {
        self.render_loop.mark_dirty();
    }

    /// `None` until the map image is available.
    pub fn camera(&self) -> Option<Camera> {
        self.map_image().map(|_| self.camera.camera())
    }

    pub fn map_image(&self) -> Option<&SpriteImage> {
        match &self.map {
            MapState::Ready(image) => Some(image.as_ref()),
            MapState::NotRequested | MapState::Loading | MapState::Failed => None,
        }
    }

    pub fn is_map_failed(&self) -> bool {
        matches!(self.map, MapState::Failed)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn store(&self) -> &PlayerStateStore {
        &self.store
    }

    pub fn avatars(&self) -> &AvatarAnimationCache {
        &self.avatars
    }

    pub fn avatar_scale(&self) -> f32 {
        self.avatar_scale
    }

    pub fn is_jumping(&self) -> bool {
        self.jump.is_active()
    }

    /// Falls back to the configured display name for the local player only.
    pub fn label_for<'a>(&'a self, player: &'a Player) -> Option<&'a str> {
        match player.username.as_deref() {
            Some(name) => Some(name),
            None if self.store.is_local(&player.id) => Some(self.display_name.as_str()),
            None => None,
        }
    }

    fn recenter(&mut self) {
        let Some(map) = self.map_image() else {
            return;
        };
        let map_size = PixelSize::new(map.width, map.height);
        let viewport = self.viewport;
        if let Some(local) = self.store.local_player() {
            self.camera.recenter_on(local, viewport, map_size);
        }
    }
}
