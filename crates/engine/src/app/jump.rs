use std::f64::consts::PI;
use std::time::{Duration, Instant};

use tracing::debug;

pub const DEFAULT_JUMP_DURATION: Duration = Duration::from_millis(600);
pub const DEFAULT_JUMP_HEIGHT_PX: f32 = 28.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpTuning {
    pub duration: Duration,
    pub height_px: f32,
}

impl Default for JumpTuning {
    fn default() -> Self {
        Self {
            duration: DEFAULT_JUMP_DURATION,
            height_px: DEFAULT_JUMP_HEIGHT_PX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpState {
    Idle,
    Jumping { started_at: Instant },
}

/// Client-side hop for the local avatar. Never sent to the server.
#[derive(Debug, Clone)]
pub struct JumpAnimationController {
    tuning: JumpTuning,
    state: JumpState,
    offset_px: i32,
}

impl JumpAnimationController {
    pub fn new(tuning: JumpTuning) -> Self {
        Self {
            tuning,
            state: JumpState::Idle,
            offset_px: 0,
        }
    }

    pub fn state(&self) -> JumpState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, JumpState::Jumping { .. })
    }

    pub fn offset_px(&self) -> i32 {
        self.offset_px
    }

    /// Starts a jump from idle. Returns false when a jump is already running.
    pub fn trigger(&mut self, now: Instant) -> bool {
        if self.is_active() {
            return false;
        }
        self.state = JumpState::Jumping { started_at: now };
        self.offset_px = 0;
        debug!("jump_started");
        true
    }

    /// Recomputes the offset for `now`; true while the jump is still in the air.
    pub fn advance(&mut self, now: Instant) -> bool {
        let JumpState::Jumping { started_at } = self.state else {
            self.offset_px = 0;
            return false;
        };
        let duration = self.tuning.duration.as_secs_f64();
        let elapsed = now.saturating_duration_since(started_at).as_secs_f64();
        let t = if duration > 0.0 { elapsed / duration } else { 1.0 };
        if t >= 1.0 {
            self.state = JumpState::Idle;
            self.offset_px = 0;
            return false;
        }
        self.offset_px = jump_offset_px(t, self.tuning.height_px);
        true
    }
}

pub fn jump_offset_px(t: f64, height_px: f32) -> i32 {
    ((t * PI).sin() * height_px as f64).round() as i32
}
