//! Frame timing

use std::time::{Duration, Instant};

/// Wall-clock frame timer driving `Application::update` and input behaviours
///
/// A frame that measures as zero (the first tick right after a reset, or a
/// clock too coarse to see it) reports the nominal frame time instead, so
/// behaviours never stall on a zero delta.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    last_frame: Instant,
    nominal_delta: f32,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl FrameTimer {
    /// Timer whose nominal frame time is `1 / target_fps` (60 fps when unset)
    pub fn new(target_fps: Option<u32>) -> Self {
        let fps = target_fps.filter(|&fps| fps > 0).unwrap_or(60);
        Self {
            last_frame: Instant::now(),
            nominal_delta: 1.0 / fps as f32,
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Restart measuring from now, e.g. right before the main loop
    pub fn reset(&mut self) {
        self.last_frame = Instant::now();
        self.delta_time = 0.0;
        self.total_time = 0.0;
        self.frame_count = 0;
    }

    /// Measure the time since the previous tick and return it in seconds
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.last_frame);
        self.delta_time = if elapsed == Duration::ZERO {
            self.nominal_delta
        } else {
            elapsed.as_secs_f32()
        };
        self.last_frame = now;
        self.total_time += self.delta_time;
        self.frame_count += 1;
        self.delta_time
    }

    /// Seconds covered by the last tick
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Frame time used when a tick measures zero
    pub fn nominal_delta(&self) -> f32 {
        self.nominal_delta
    }

    /// Seconds accumulated over every tick
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Number of ticks
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average frames per second since the last reset
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(None)
    }
}
