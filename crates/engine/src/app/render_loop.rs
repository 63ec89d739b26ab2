use std::time::Instant;

use super::jump::JumpAnimationController;

/// Dirty-flag gate in front of the renderer. Ticks arrive at display cadence;
/// a tick only paints when something changed since the last paint.
#[derive(Debug, Clone)]
pub struct RenderLoop {
    dirty: bool,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self { dirty: true }
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns `None` when the tick was skipped.
    pub fn tick<R>(
        &mut self,
        now: Instant,
        jump: &mut JumpAnimationController,
        render: impl FnOnce(&JumpAnimationController) -> R,
    ) -> Option<R> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        if jump.advance(now) {
            self.dirty = true;
        }
        Some(render(jump))
    }
}
