use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of one export session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExportState {
    Idle,
    Initializing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

impl ExportState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// `true` while a session holds the pipeline.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Initializing | Self::Rendering | Self::Finalizing)
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Initializing => 1,
            Self::Rendering => 2,
            Self::Finalizing => 3,
            Self::Complete => 4,
            Self::Failed => 5,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Initializing,
            2 => Self::Rendering,
            3 => Self::Finalizing,
            4 => Self::Complete,
            5 => Self::Failed,
            _ => Self::Idle,
        }
    }
}

/// Receives progress and state changes from a running session.
pub trait ExportObserver: Send {
    /// Percentage in `0..=100`, never lower than the previous call within one session.
    fn on_progress(&mut self, percent: u8);

    fn on_state(&mut self, _state: ExportState) {}
}

/// Adapter turning a closure into a progress-only observer.
pub struct ProgressFn<F>(pub F);

impl<F: FnMut(u8) + Send> ExportObserver for ProgressFn<F> {
    fn on_progress(&mut self, percent: u8) {
        (self.0)(percent)
    }
}

/// Latest progress value, readable from any thread. Updates overwrite; there is no history.
#[derive(Clone, Debug, Default)]
pub struct ProgressCell(Arc<AtomicU8>);

impl ProgressCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn set(&self, percent: u8) {
        self.0.store(percent.min(100), Ordering::Release);
    }
}

impl ExportObserver for ProgressCell {
    fn on_progress(&mut self, percent: u8) {
        self.set(percent);
    }
}

/// Latest session state, readable from any thread.
#[derive(Clone, Debug, Default)]
pub struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub fn get(&self) -> ExportState {
        ExportState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: ExportState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }
}

/// Fans progress out to observers, dropping values that would move backwards.
pub(crate) struct ProgressReporter {
    observers: Vec<Box<dyn ExportObserver>>,
    progress: ProgressCell,
    state: StateCell,
    last: Option<u8>,
}

impl ProgressReporter {
    pub(crate) fn new(
        observers: Vec<Box<dyn ExportObserver>>,
        progress: ProgressCell,
        state: StateCell,
    ) -> Self {
        Self {
            observers,
            progress,
            state,
            last: None,
        }
    }

    pub(crate) fn progress(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.last.is_some_and(|last| percent <= last) {
            return;
        }
        self.last = Some(percent);
        self.progress.set(percent);
        tracing::debug!(percent, "export progress");
        for o in &mut self.observers {
            o.on_progress(percent);
        }
    }

    pub(crate) fn state(&mut self, state: ExportState) {
        tracing::debug!(?state, "export state");
        self.state.set(state);
        for o in &mut self.observers {
            o.on_state(state);
        }
    }
}

/// Rendering band: `15 + round(i / total × 75)`.
pub(crate) fn render_band(frame: u64, total: u64) -> u8 {
    if total == 0 {
        return 15;
    }
    let frac = (frame as f64 / total as f64).clamp(0.0, 1.0);
    15 + (frac * 75.0).round() as u8
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/progress.rs"]
mod tests;
