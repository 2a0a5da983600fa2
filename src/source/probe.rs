use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{VeilError, VeilResult};
use crate::model::entities::VideoMetadata;

/// Metadata plus stream facts the pipeline needs beyond [`VideoMetadata`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbedVideo {
    #[serde(flatten)]
    pub metadata: VideoMetadata,
    pub has_audio: bool,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Run `ffprobe` on `path` and build its metadata.
pub fn probe_video(ffprobe_bin: &str, path: &Path) -> VeilResult<ProbedVideo> {
    let out = Command::new(ffprobe_bin)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| VeilError::media(format!("failed to run {ffprobe_bin}: {e}")))?;
    if !out.status.success() {
        return Err(VeilError::media(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let mut probed = parse_probe_json(&out.stdout)?;
    if probed.metadata.size == 0
        && let Ok(meta) = std::fs::metadata(path)
    {
        probed.metadata.size = meta.len();
    }
    Ok(probed)
}

/// Parse `ffprobe -print_format json -show_streams -show_format` output.
pub(crate) fn parse_probe_json(bytes: &[u8]) -> VeilResult<ProbedVideo> {
    let parsed: ProbeOut = serde_json::from_slice(bytes)
        .map_err(|e| VeilError::media(format!("ffprobe json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| VeilError::media("no video stream found"))?;
    let width = video
        .width
        .ok_or_else(|| VeilError::media("missing video width from ffprobe"))?;
    let height = video
        .height
        .ok_or_else(|| VeilError::media("missing video height from ffprobe"))?;

    // `0.0` leaves the fallback rate to `VideoMetadata::effective_fps`.
    let fps = [video.avg_frame_rate.as_deref(), video.r_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .find_map(parse_ff_ratio)
        .unwrap_or(0.0);

    let duration = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let size = parsed
        .format
        .as_ref()
        .and_then(|f| f.size.as_deref())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(ProbedVideo {
        metadata: VideoMetadata {
            duration,
            width,
            height,
            fps,
            size,
        },
        has_audio,
    })
}

/// `"30000/1001"` → `29.97..`; `None` for zero or malformed ratios.
pub(crate) fn parse_ff_ratio(s: &str) -> Option<f64> {
    let mut parts = s.split('/');
    let a = parts.next()?.trim().parse::<u32>().ok()?;
    let b = match parts.next() {
        Some(b) => b.trim().parse::<u32>().ok()?,
        None => 1,
    };
    if a == 0 || b == 0 {
        return None;
    }
    Some(f64::from(a) / f64::from(b))
}

#[cfg(test)]
#[path = "../../tests/unit/source/probe.rs"]
mod tests;
