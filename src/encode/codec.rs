use std::collections::HashSet;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{VeilError, VeilResult};

/// One entry of the ranked container/codec list tried when a sink opens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecCandidate {
    /// MIME type reported on the finished artifact, e.g. `video/webm;codecs=vp9,opus`.
    pub mime: String,
    /// ffmpeg muxer name (`webm`, `mp4`, ...).
    pub container: String,
    /// ffmpeg video encoder name.
    pub video_encoder: String,
    /// ffmpeg audio encoder name; `None` for video-only candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_encoder: Option<String>,
}

impl CodecCandidate {
    pub fn new(mime: &str, container: &str, video: &str, audio: Option<&str>) -> Self {
        Self {
            mime: mime.to_string(),
            container: container.to_string(),
            video_encoder: video.to_string(),
            audio_encoder: audio.map(str::to_string),
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio_encoder.is_some()
    }

    /// The bare container type (`video/webm`) without codec parameters.
    pub fn base_mime(&self) -> &str {
        self.mime.split(';').next().unwrap_or(&self.mime)
    }
}

/// Highest quality first.
pub fn default_candidates() -> Vec<CodecCandidate> {
    vec![
        CodecCandidate::new(
            "video/webm;codecs=vp9,opus",
            "webm",
            "libvpx-vp9",
            Some("libopus"),
        ),
        CodecCandidate::new(
            "video/webm;codecs=vp8,opus",
            "webm",
            "libvpx",
            Some("libopus"),
        ),
        CodecCandidate::new("video/webm;codecs=vp9", "webm", "libvpx-vp9", None),
        CodecCandidate::new("video/webm;codecs=vp8", "webm", "libvpx", None),
        CodecCandidate::new("video/webm", "webm", "libvpx", None),
        CodecCandidate::new(
            "video/mp4;codecs=avc1,mp4a",
            "mp4",
            "libx264",
            Some("aac"),
        ),
    ]
}

/// Answers whether an encoder is available in the current environment.
pub trait CodecProbe {
    fn supports_encoder(&self, name: &str) -> bool;
}

/// Fixed encoder set; used for tests and for callers that already know their environment.
#[derive(Clone, Debug, Default)]
pub struct StaticCodecProbe {
    encoders: HashSet<String>,
}

impl StaticCodecProbe {
    pub fn new<I, S>(encoders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            encoders: encoders.into_iter().map(Into::into).collect(),
        }
    }
}

impl CodecProbe for StaticCodecProbe {
    fn supports_encoder(&self, name: &str) -> bool {
        self.encoders.contains(name)
    }
}

/// Encoder list read once from `ffmpeg -hide_banner -encoders`.
#[derive(Clone, Debug)]
pub struct FfmpegCodecProbe {
    inner: StaticCodecProbe,
}

impl FfmpegCodecProbe {
    pub fn detect(ffmpeg_bin: &str) -> VeilResult<Self> {
        let out = Command::new(ffmpeg_bin)
            .args(["-hide_banner", "-encoders"])
            .output()
            .map_err(|e| VeilError::media(format!("failed to spawn {ffmpeg_bin}: {e}")))?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(VeilError::media(format!(
                "{ffmpeg_bin} -encoders failed: {}",
                stderr.trim()
            )));
        }
        let stdout = String::from_utf8_lossy(&out.stdout);
        Ok(Self {
            inner: StaticCodecProbe::new(parse_encoder_list(&stdout)),
        })
    }
}

impl CodecProbe for FfmpegCodecProbe {
    fn supports_encoder(&self, name: &str) -> bool {
        self.inner.supports_encoder(name)
    }
}

/// Extract encoder names from the `-encoders` table (`" V....D libx264  description"`).
pub(crate) fn parse_encoder_list(text: &str) -> Vec<String> {
    let mut past_header = false;
    let mut out = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("------") {
            past_header = true;
            continue;
        }
        if !past_header {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let (Some(flags), Some(name)) = (parts.next(), parts.next()) else {
            continue;
        };
        if flags.len() == 6 && name != "=" {
            out.push(name.to_string());
        }
    }
    out
}

/// Pick the first usable candidate in rank order.
///
/// With audio present, candidates that can carry it win over video-only ones; without audio,
/// audio-capable candidates are still acceptable as long as their video encoder exists.
pub fn negotiate(
    candidates: &[CodecCandidate],
    probe: &dyn CodecProbe,
    has_audio: bool,
) -> VeilResult<CodecCandidate> {
    let video_ok = |c: &CodecCandidate| probe.supports_encoder(&c.video_encoder);
    let audio_ok = |c: &CodecCandidate| {
        c.audio_encoder
            .as_deref()
            .is_some_and(|a| probe.supports_encoder(a))
    };

    if has_audio
        && let Some(c) = candidates.iter().find(|c| video_ok(c) && audio_ok(c))
    {
        return Ok(c.clone());
    }
    let fallback = candidates
        .iter()
        .find(|c| video_ok(c) && (!c.has_audio() || audio_ok(c)));
    match fallback {
        Some(c) => Ok(c.clone()),
        None => Err(VeilError::codec_unsupported(format!(
            "none of {} candidates is supported ({})",
            candidates.len(),
            candidates
                .iter()
                .map(|c| c.mime.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/codec.rs"]
mod tests;
