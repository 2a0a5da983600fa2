use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::encode::codec::{CodecCandidate, default_candidates};
use crate::foundation::error::{VeilError, VeilResult};

/// How the frame loop is paced against wall-clock time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PacingMode {
    /// Sleep `1/fps` between frames so a capture sink sees a steady rate.
    #[default]
    RealTime,
    /// Deliver frames as fast as they are produced.
    Immediate,
}

/// Tunables for one export. Every field has a default, so `{}` is a valid config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportConfig {
    pub video_bits_per_second: u64,
    pub audio_bits_per_second: u64,
    /// Wall-clock interval at which the encode sink emits output chunks.
    pub chunk_interval_ms: u64,
    /// Blur strength for regions that don't carry their own.
    pub default_blur_strength: f64,
    pub text_padding_px: u32,
    /// Emit a rendering progress update every N frames.
    pub progress_every_frames: u64,
    pub pacing: PacingMode,
    /// TTF/OTF used for text overlays.
    pub font_path: Option<PathBuf>,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    pub codec_candidates: Vec<CodecCandidate>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            video_bits_per_second: 2_500_000,
            audio_bits_per_second: 128_000,
            chunk_interval_ms: 100,
            default_blur_strength: 20.0,
            text_padding_px: 8,
            progress_every_frames: 10,
            pacing: PacingMode::RealTime,
            font_path: None,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            codec_candidates: default_candidates(),
        }
    }
}

impl ExportConfig {
    pub fn from_json_str(s: &str) -> VeilResult<Self> {
        serde_json::from_str(s).map_err(|e| VeilError::serde(e.to_string()))
    }

    pub fn from_path(path: &Path) -> VeilResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Apply `VEILFRAME_FFMPEG`, `VEILFRAME_FFPROBE` and `VEILFRAME_FONT` overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = non_empty("VEILFRAME_FFMPEG") {
            self.ffmpeg_bin = v;
        }
        if let Some(v) = non_empty("VEILFRAME_FFPROBE") {
            self.ffprobe_bin = v;
        }
        if let Some(v) = non_empty("VEILFRAME_FONT") {
            self.font_path = Some(PathBuf::from(v));
        }
    }

    pub fn validate(&self) -> VeilResult<()> {
        if self.video_bits_per_second == 0 {
            return Err(VeilError::validation("videoBitsPerSecond must be > 0"));
        }
        if self.audio_bits_per_second == 0 {
            return Err(VeilError::validation("audioBitsPerSecond must be > 0"));
        }
        if self.chunk_interval_ms == 0 {
            return Err(VeilError::validation("chunkIntervalMs must be > 0"));
        }
        if self.progress_every_frames == 0 {
            return Err(VeilError::validation("progressEveryFrames must be > 0"));
        }
        if !self.default_blur_strength.is_finite() || self.default_blur_strength < 0.0 {
            return Err(VeilError::validation(
                "defaultBlurStrength must be finite and >= 0",
            ));
        }
        if self.codec_candidates.is_empty() {
            return Err(VeilError::validation("codecCandidates must not be empty"));
        }
        if self.ffmpeg_bin.trim().is_empty() || self.ffprobe_bin.trim().is_empty() {
            return Err(VeilError::validation("ffmpeg/ffprobe binary names must be set"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
