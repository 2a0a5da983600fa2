use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::config::ExportConfig;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{VeilError, VeilResult};
use crate::model::entities::VideoMetadata;
use crate::render::frame::FrameRGBA;
use crate::source::audio::{self, AudioTrack};
use crate::source::probe::probe_video;
use crate::source::FrameSource;

/// Decodes a video file with one streaming `ffmpeg` process.
///
/// The decoder resamples to the pipeline rate (`-vf fps=`), so frame `i` of the stream is the
/// frame nearest `i / fps`. Seeking only moves forward: it reads and drops frames until the
/// target is reached.
pub struct FfmpegFrameSource {
    input: PathBuf,
    ffmpeg_bin: String,
    metadata: VideoMetadata,
    has_audio: bool,
    fps: Fps,
    frame_len: usize,

    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    /// Index of the next frame the stream will yield.
    next_index: u64,
    current: Option<(FrameIndex, FrameRGBA)>,
    target: Option<FrameIndex>,
    eof: bool,
}

impl FfmpegFrameSource {
    /// Probe `input` and start decoding it.
    pub fn open(input: &Path, config: &ExportConfig) -> VeilResult<Self> {
        let probed = probe_video(&config.ffprobe_bin, input)?;
        Self::open_with_metadata(input, probed.metadata, probed.has_audio, config)
    }

    /// Start decoding with metadata that was extracted elsewhere.
    pub fn open_with_metadata(
        input: &Path,
        metadata: VideoMetadata,
        has_audio: bool,
        config: &ExportConfig,
    ) -> VeilResult<Self> {
        metadata.validate()?;
        let fps = metadata.effective_fps();
        let frame_len = metadata.canvas().byte_len_rgba8();

        let mut cmd = Command::new(&config.ffmpeg_bin);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args(["-v", "error", "-i"])
            .arg(input)
            .args([
                "-an",
                "-sn",
                "-vf",
                &format!(
                    "fps={},scale={}:{}",
                    fps.to_ffmpeg_rate(),
                    metadata.width,
                    metadata.height
                ),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ]);

        let mut child = cmd.spawn().map_err(|e| {
            VeilError::media(format!(
                "failed to spawn {} (is it installed and on PATH?): {e}",
                config.ffmpeg_bin
            ))
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VeilError::media("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| VeilError::media("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(input = %input.display(), fps = %fps.to_ffmpeg_rate(), "decoder started");
        Ok(Self {
            input: input.to_path_buf(),
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            metadata,
            has_audio,
            fps,
            frame_len,
            child: Some(child),
            stdout: Some(stdout),
            stderr_drain: Some(stderr_drain),
            next_index: 0,
            current: None,
            target: None,
            eof: false,
        })
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    /// Read one frame off the pipe; `Ok(false)` at end of stream.
    fn decode_next(&mut self) -> VeilResult<bool> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(false);
        };
        let mut buf = vec![0u8; self.frame_len];
        match stdout.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(false),
            Err(e) => {
                return Err(VeilError::seek(format!(
                    "failed to read decoded frame from '{}': {e}",
                    self.input.display()
                )));
            }
        }
        let frame = FrameRGBA::from_rgba8(self.metadata.width, self.metadata.height, buf)?;
        self.current = Some((FrameIndex(self.next_index), frame));
        self.next_index += 1;
        Ok(true)
    }

    fn decoder_error_text(&mut self) -> String {
        self.shutdown();
        match self.stderr_drain.take().map(|h| h.join()) {
            Some(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).trim().to_string(),
            _ => String::new(),
        }
    }

    fn shutdown(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn seek(&mut self, t: f64) -> VeilResult<()> {
        if !t.is_finite() || t < 0.0 {
            return Err(VeilError::seek(format!("invalid seek target {t}")));
        }
        let idx = self.fps.secs_to_frame_round(t);
        if let Some(prev) = self.target
            && idx < prev
        {
            return Err(VeilError::seek(format!(
                "backwards seek from frame {} to frame {}",
                prev.0, idx.0
            )));
        }
        self.target = Some(idx);

        while !self.eof && self.current.as_ref().is_none_or(|(i, _)| *i < idx) {
            if !self.decode_next()? {
                self.eof = true;
            }
        }
        if self.current.is_none() {
            let stderr = self.decoder_error_text();
            return Err(VeilError::seek(format!(
                "no frame could be decoded from '{}': {stderr}",
                self.input.display()
            )));
        }
        Ok(())
    }

    fn read_frame(&mut self) -> VeilResult<FrameRGBA> {
        self.current
            .as_ref()
            .map(|(_, f)| f.clone())
            .ok_or_else(|| VeilError::seek("read_frame called before seek"))
    }

    fn extract_audio_track(&mut self) -> VeilResult<Option<AudioTrack>> {
        if !self.has_audio {
            return Ok(None);
        }
        audio::extract_audio_track(&self.ffmpeg_bin, &self.input)
    }

    fn close(&mut self) {
        self.shutdown();
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        self.close();
    }
}
