//! Frame scheduler - coalesces render requests to a target frame rate.
//!
//! Any number of requests between two frames collapse into one frame. A
//! frame is due once a request is pending and at least one frame interval
//! has passed since the previous frame. Time is passed in, never read, so
//! the engine loop and tests drive it the same way.

use std::time::{Duration, Instant};

use crate::config::{clamp_fps, EngineConfig};

#[derive(Debug, Clone)]
pub struct FrameScheduler {
    fps: u32,
    interval: Duration,
    last_frame: Option<Instant>,
    pending: bool,
    paused: bool,
}

impl FrameScheduler {
    pub fn new(fps: u32) -> Self {
        let fps = clamp_fps(fps);
        Self {
            fps,
            interval: interval_for(fps),
            last_frame: None,
            pending: false,
            paused: false,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.target_fps)
    }

    #[inline]
    pub fn target_fps(&self) -> u32 {
        self.fps
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the frame rate. Clamped to the supported range.
    pub fn set_target_fps(&mut self, fps: u32) {
        self.fps = clamp_fps(fps);
        self.interval = interval_for(self.fps);
    }

    /// Ask for a frame. Repeated requests coalesce.
    #[inline]
    pub fn request(&mut self) {
        self.pending = true;
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Drop the pending request.
    pub fn cancel(&mut self) {
        self.pending = false;
    }

    /// Hold frames back. Requests made meanwhile are kept and run on resume.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Consume the pending request if a frame may run at `now`.
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.paused || !self.pending {
            return false;
        }
        if self.time_until_next(now) != Some(Duration::ZERO) {
            return false;
        }
        self.pending = false;
        self.last_frame = Some(now);
        true
    }

    /// Record a frame that ran outside the schedule (a forced render).
    pub fn mark_rendered(&mut self, now: Instant) {
        self.pending = false;
        self.last_frame = Some(now);
    }

    /// How long until the pending frame is due. `None` when nothing is
    /// pending or the scheduler is paused.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        if self.paused || !self.pending {
            return None;
        }
        Some(match self.last_frame {
            Some(last) => (last + self.interval).saturating_duration_since(now),
            None => Duration::ZERO,
        })
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

fn interval_for(fps: u32) -> Duration {
    Duration::from_secs(1) / fps
}
