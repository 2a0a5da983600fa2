//! Export orchestration: session lifecycle, progress, pacing and cancellation.

pub mod cancel;
pub mod orchestrator;
pub mod pacing;
pub mod preview;
pub mod progress;
