use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempPath;

use crate::foundation::error::{VeilError, VeilResult};

/// Sample rate of extracted audio.
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;
/// Extracted audio is always interleaved stereo.
pub const AUDIO_CHANNELS: u16 = 2;

/// Raw interleaved `f32le` PCM on disk, ready to be muxed by an encode sink.
///
/// Tracks created by extraction own their temporary file; it is removed when the track drops.
#[derive(Debug)]
pub struct AudioTrack {
    path: PathBuf,
    sample_rate: u32,
    channels: u16,
    temp: Option<TempPath>,
}

impl AudioTrack {
    /// Wrap an existing PCM file the caller keeps ownership of.
    pub fn borrowed(path: impl Into<PathBuf>, sample_rate: u32, channels: u16) -> Self {
        Self {
            path: path.into(),
            sample_rate,
            channels,
            temp: None,
        }
    }

    fn owned_temp(temp: TempPath) -> Self {
        Self {
            path: temp.to_path_buf(),
            sample_rate: AUDIO_SAMPLE_RATE,
            channels: AUDIO_CHANNELS,
            temp: Some(temp),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn owns_file(&self) -> bool {
        self.temp.is_some()
    }

    /// Length derived from the file size; `0.0` when the file is unreadable.
    pub fn duration_secs(&self) -> f64 {
        let bytes = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        let frame_bytes = 4 * u64::from(self.channels.max(1));
        (bytes / frame_bytes) as f64 / f64::from(self.sample_rate.max(1))
    }
}

/// Exclusively created, empty PCM file in the temp dir.
fn create_pcm_temp() -> VeilResult<TempPath> {
    let file = tempfile::Builder::new()
        .prefix("veilframe_audio_")
        .suffix(".f32le")
        .tempfile()
        .map_err(|e| VeilError::audio(format!("failed to create audio temp file: {e}")))?;
    Ok(file.into_temp_path())
}

/// ffmpeg reports a missing audio stream as an error; these messages mean "no audio", not failure.
pub(crate) fn is_missing_stream_message(stderr: &str) -> bool {
    stderr.contains("Stream specifier")
        || stderr.contains("matches no streams")
        || stderr.contains("does not contain any stream")
}

/// Decode the first audio stream of `input` to a temporary `f32le` file.
///
/// Returns `Ok(None)` when the input has no audio; any other ffmpeg failure is an
/// [`VeilError::AudioExtraction`].
#[tracing::instrument(level = "debug", skip_all, fields(input = %input.display()))]
pub fn extract_audio_track(ffmpeg_bin: &str, input: &Path) -> VeilResult<Option<AudioTrack>> {
    // Constructed before ffmpeg runs so a partial file is removed on every path.
    let track = AudioTrack::owned_temp(create_pcm_temp()?);

    let out = Command::new(ffmpeg_bin)
        .args(["-v", "error", "-y", "-i"])
        .arg(input)
        .args([
            "-vn",
            "-map",
            "0:a:0",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            &AUDIO_CHANNELS.to_string(),
            "-ar",
            &AUDIO_SAMPLE_RATE.to_string(),
        ])
        .arg(track.path())
        .output()
        .map_err(|e| VeilError::audio(format!("failed to run {ffmpeg_bin} for audio: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        if is_missing_stream_message(&msg) {
            return Ok(None);
        }
        return Err(VeilError::audio(format!(
            "ffmpeg audio decode failed for '{}': {}",
            input.display(),
            msg.trim()
        )));
    }

    let len = std::fs::metadata(track.path()).map(|m| m.len()).unwrap_or(0);
    if len == 0 {
        return Ok(None);
    }
    if len % 4 != 0 {
        return Err(VeilError::audio(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    tracing::debug!(bytes = len, "audio track extracted");
    Ok(Some(track))
}

#[cfg(test)]
#[path = "../../tests/unit/source/audio.rs"]
mod tests;
