use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub frames_presented: u32,
    pub frames_skipped: u32,
    pub messages_applied: u32,
    pub sprites_drawn: u64,
    pub sprites_culled: u64,
}

/// Counts loop activity over a fixed interval. A skipped frame is a redraw
/// request that found nothing dirty.
#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames_presented: u32,
    frames_skipped: u32,
    messages_applied: u32,
    sprites_drawn: u64,
    sprites_culled: u64,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval_start: now,
            interval,
            frames_presented: 0,
            frames_skipped: 0,
            messages_applied: 0,
            sprites_drawn: 0,
            sprites_culled: 0,
        }
    }

    pub(crate) fn record_presented(&mut self, sprites_drawn: usize, sprites_culled: usize) {
        self.frames_presented = self.frames_presented.saturating_add(1);
        self.sprites_drawn = self.sprites_drawn.saturating_add(sprites_drawn as u64);
        self.sprites_culled = self.sprites_culled.saturating_add(sprites_culled as u64);
    }

    pub(crate) fn record_skipped(&mut self) {
        self.frames_skipped = self.frames_skipped.saturating_add(1);
    }

    pub(crate) fn record_messages(&mut self, count: usize) {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        self.messages_applied = self.messages_applied.saturating_add(count);
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames_presented as f32 / elapsed_seconds,
            frames_presented: self.frames_presented,
            frames_skipped: self.frames_skipped,
            messages_applied: self.messages_applied,
            sprites_drawn: self.sprites_drawn,
            sprites_culled: self.sprites_culled,
        };

        self.interval_start = now;
        self.frames_presented = 0;
        self.frames_skipped = 0;
        self.messages_applied = 0;
        self.sprites_drawn = 0;
        self.sprites_culled = 0;

        Some(snapshot)
    }
}
