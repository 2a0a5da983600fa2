use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{VeilError, VeilResult};

/// Frame rate assumed when the source metadata carries none.
pub const DEFAULT_FPS: f64 = 30.0;

/// Anything that is visible during a closed `[start_time, end_time]` window.
pub trait TimeWindow {
    fn start_time(&self) -> f64;
    fn end_time(&self) -> f64;

    /// `true` iff `start_time <= t <= end_time` (both bounds inclusive).
    fn is_active_at(&self, t: f64) -> bool {
        self.start_time() <= t && t <= self.end_time()
    }
}

/// Time-bounded rectangle whose contents are blurred. Coordinates are normalized to `[0,1]`
/// but may exceed the frame; they are clamped when drawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MosaicRegion {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur_strength: Option<f64>,
}

/// Time-bounded text drawn with its top-left corner at a normalized point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOverlay {
    pub id: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub font_size: f64,
    pub font_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

/// Immutable facts about the uploaded source video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    /// Duration in seconds.
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    /// Frames per second; `0` means unknown.
    pub fps: f64,
    /// File size in bytes.
    #[serde(default)]
    pub size: u64,
}

impl TimeWindow for MosaicRegion {
    fn start_time(&self) -> f64 {
        self.start_time
    }

    fn end_time(&self) -> f64 {
        self.end_time
    }
}

impl TimeWindow for TextOverlay {
    fn start_time(&self) -> f64 {
        self.start_time
    }

    fn end_time(&self) -> f64 {
        self.end_time
    }
}

fn validate_window(kind: &str, id: &str, start: f64, end: f64) -> VeilResult<()> {
    if !start.is_finite() || !end.is_finite() {
        return Err(VeilError::validation(format!(
            "{kind} '{id}' has a non-finite time window"
        )));
    }
    if start < 0.0 {
        return Err(VeilError::validation(format!(
            "{kind} '{id}' startTime must be >= 0"
        )));
    }
    if start >= end {
        return Err(VeilError::validation(format!(
            "{kind} '{id}' startTime must be < endTime (got {start} >= {end})"
        )));
    }
    Ok(())
}

impl MosaicRegion {
    /// Blur strength in pixels, falling back to `default` when unset.
    pub fn blur_strength_or(&self, default: f64) -> f64 {
        self.blur_strength.unwrap_or(default)
    }

    pub fn validate(&self) -> VeilResult<()> {
        validate_window("mosaic region", &self.id, self.start_time, self.end_time)?;
        for (name, v) in [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
        ] {
            if !v.is_finite() {
                return Err(VeilError::validation(format!(
                    "mosaic region '{}' {name} must be finite",
                    self.id
                )));
            }
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(VeilError::validation(format!(
                "mosaic region '{}' width/height must be >= 0",
                self.id
            )));
        }
        if let Some(b) = self.blur_strength
            && (!b.is_finite() || b < 0.0)
        {
            return Err(VeilError::validation(format!(
                "mosaic region '{}' blurStrength must be finite and >= 0",
                self.id
            )));
        }
        Ok(())
    }
}

impl TextOverlay {
    pub fn validate(&self) -> VeilResult<()> {
        validate_window("text overlay", &self.id, self.start_time, self.end_time)?;
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(VeilError::validation(format!(
                "text overlay '{}' position must be finite",
                self.id
            )));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(VeilError::validation(format!(
                "text overlay '{}' fontSize must be finite and > 0",
                self.id
            )));
        }
        Ok(())
    }
}

impl VideoMetadata {
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Frame rate used for stepping; unknown or invalid rates fall back to [`DEFAULT_FPS`].
    pub fn effective_fps(&self) -> Fps {
        Fps::from_f64(self.fps)
            .or_else(|_| Fps::from_f64(DEFAULT_FPS))
            .unwrap_or(Fps { num: 30, den: 1 })
    }

    /// `floor(duration × fps)`.
    pub fn total_frames(&self) -> u64 {
        self.effective_fps().secs_to_frames_floor(self.duration)
    }

    pub fn validate(&self) -> VeilResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(VeilError::validation(
                "video metadata width/height must be non-zero",
            ));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(VeilError::validation(
                "video metadata duration must be finite and > 0",
            ));
        }
        Ok(())
    }
}

/// Entities of `items` whose window contains `t`, in their original order.
pub fn active_at<T: TimeWindow>(items: &[T], t: f64) -> Vec<&T> {
    items.iter().filter(|e| e.is_active_at(t)).collect()
}

#[cfg(test)]
#[path = "../../tests/unit/model/entities.rs"]
mod tests;
