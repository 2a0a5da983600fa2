use std::time::{Duration, Instant};

use crate::config::PacingMode;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::VeilResult;
use crate::pipeline::cancel::CancelToken;

/// Decides how long the frame loop waits after each submitted frame.
pub trait Pacer: Send {
    /// Called once before the first frame.
    fn begin(&mut self, fps: Fps);

    /// Wait until frame `idx` has had its slot of wall time. Returns `Cancelled` when the token
    /// fires during the wait.
    fn after_frame(&mut self, idx: FrameIndex, cancel: &CancelToken) -> VeilResult<()>;
}

/// No waiting; frames are delivered as fast as they render.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediatePacer;

impl Pacer for ImmediatePacer {
    fn begin(&mut self, _fps: Fps) {}

    fn after_frame(&mut self, _idx: FrameIndex, cancel: &CancelToken) -> VeilResult<()> {
        cancel.check()
    }
}

/// Holds the loop to `1/fps` per frame against a fixed start instant, so slow frames are
/// caught up instead of accumulating drift.
#[derive(Clone, Debug, Default)]
pub struct RealTimePacer {
    start: Option<Instant>,
    frame_duration: Duration,
}

/// Upper bound for one sleep so cancellation is noticed promptly.
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(10);

impl RealTimePacer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pacer for RealTimePacer {
    fn begin(&mut self, fps: Fps) {
        self.start = Some(Instant::now());
        self.frame_duration = Duration::from_secs_f64(fps.frame_duration_secs());
    }

    fn after_frame(&mut self, idx: FrameIndex, cancel: &CancelToken) -> VeilResult<()> {
        let start = *self.start.get_or_insert_with(Instant::now);
        let slots = u32::try_from(idx.0.saturating_add(1)).unwrap_or(u32::MAX);
        let deadline = start + self.frame_duration.saturating_mul(slots);
        loop {
            cancel.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(MAX_SLEEP_SLICE));
        }
    }
}

pub fn pacer_for(mode: PacingMode) -> Box<dyn Pacer> {
    match mode {
        PacingMode::RealTime => Box::new(RealTimePacer::new()),
        PacingMode::Immediate => Box::new(ImmediatePacer),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/pacing.rs"]
mod tests;
