use std::io::{Read, Write as _};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::encode::sink::{Chunk, EncodeSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{VeilError, VeilResult};
use crate::render::frame::FrameRGBA;

/// Streams raw frames into the system `ffmpeg` and collects the encoded container from its
/// stdout.
///
/// A reader thread slices stdout into [`Chunk`]s whenever `chunk_interval` of wall time has
/// passed, mimicking a timesliced stream recorder. Chunks are available through
/// [`EncodeSink::poll_chunks`] while encoding and from [`EncodeSink::stop`] at the end.
pub struct FfmpegCaptureSink {
    ffmpeg_bin: String,
    cfg: Option<SinkConfig>,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    stdout_reader: Option<JoinHandle<std::io::Result<()>>>,
    chunks: Option<Receiver<Chunk>>,

    frame_len: usize,
    last_idx: Option<FrameIndex>,
}

impl FfmpegCaptureSink {
    pub fn new(ffmpeg_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            cfg: None,
            child: None,
            stdin: None,
            stderr_drain: None,
            stdout_reader: None,
            chunks: None,
            frame_len: 0,
            last_idx: None,
        }
    }

    fn build_command(&self, cfg: &SinkConfig) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_bin);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args(encoder_args(cfg));
        cmd
    }

    fn join_threads(&mut self) -> VeilResult<Vec<u8>> {
        if let Some(handle) = self.stdout_reader.take() {
            handle
                .join()
                .map_err(|_| VeilError::media("ffmpeg stdout reader thread panicked"))?
                .map_err(|e| VeilError::media(format!("ffmpeg stdout read failed: {e}")))?;
        }
        match self.stderr_drain.take() {
            Some(handle) => Ok(handle
                .join()
                .map_err(|_| VeilError::media("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| VeilError::media(format!("ffmpeg stderr read failed: {e}")))?),
            None => Ok(Vec::new()),
        }
    }
}

/// Full ffmpeg argument list for one capture.
pub(crate) fn encoder_args(cfg: &SinkConfig) -> Vec<String> {
    let mut args: Vec<String> = [
        "-y",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(format!("{}x{}", cfg.width, cfg.height));
    // For rawvideo input, `-r` must come before `-i`.
    args.extend(["-r".to_string(), cfg.fps.to_ffmpeg_rate()]);
    args.extend(["-i".to_string(), "pipe:0".to_string()]);

    let audio = cfg.effective_audio();
    if let Some(audio) = audio {
        args.extend([
            "-f".to_string(),
            "f32le".to_string(),
            "-ar".to_string(),
            audio.sample_rate.to_string(),
            "-ac".to_string(),
            audio.channels.to_string(),
            "-i".to_string(),
            audio.path.display().to_string(),
        ]);
    }

    args.extend(["-map".to_string(), "0:v".to_string()]);
    // yuv420p needs even dimensions.
    args.extend([
        "-vf".to_string(),
        "pad=ceil(iw/2)*2:ceil(ih/2)*2".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:v".to_string(),
        cfg.codec.video_encoder.clone(),
        "-b:v".to_string(),
        cfg.video_bits_per_second.to_string(),
    ]);

    match (audio, cfg.codec.audio_encoder.as_deref()) {
        (Some(_), Some(encoder)) => args.extend([
            "-map".to_string(),
            "1:a".to_string(),
            "-c:a".to_string(),
            encoder.to_string(),
            "-b:a".to_string(),
            cfg.audio_bits_per_second.to_string(),
            "-shortest".to_string(),
        ]),
        _ => args.push("-an".to_string()),
    }

    if cfg.codec.container == "mp4" {
        // A non-seekable output needs a fragmented mp4.
        args.extend([
            "-movflags".to_string(),
            "frag_keyframe+empty_moov".to_string(),
        ]);
    }
    args.extend([
        "-f".to_string(),
        cfg.codec.container.clone(),
        "pipe:1".to_string(),
    ]);
    args
}

/// Read `reader` to the end, sending accumulated bytes every `interval`.
pub(crate) fn pump_chunks(
    mut reader: impl Read,
    interval: Duration,
    tx: mpsc::Sender<Chunk>,
) -> std::io::Result<()> {
    let mut buf = [0u8; 64 * 1024];
    let mut pending = Vec::new();
    let mut seq = 0u64;
    let mut last_emit = Instant::now();
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        pending.extend_from_slice(&buf[..n]);
        if last_emit.elapsed() >= interval {
            let bytes = std::mem::take(&mut pending);
            if tx.send(Chunk { seq, bytes }).is_err() {
                return Ok(());
            }
            seq += 1;
            last_emit = Instant::now();
        }
    }
    if !pending.is_empty() {
        let _ = tx.send(Chunk {
            seq,
            bytes: pending,
        });
    }
    Ok(())
}

impl EncodeSink for FfmpegCaptureSink {
    fn open(&mut self, cfg: SinkConfig) -> VeilResult<()> {
        cfg.validate()?;
        if !is_ffmpeg_available(&self.ffmpeg_bin) {
            return Err(VeilError::media(format!(
                "{} is required for encoding, but could not be run",
                self.ffmpeg_bin
            )));
        }
        if let Some(audio) = cfg.effective_audio()
            && !audio.path.exists()
        {
            return Err(VeilError::validation(format!(
                "audio input '{}' does not exist",
                audio.path.display()
            )));
        }
        tracing::info!(
            mime = %cfg.codec.mime,
            video_encoder = %cfg.codec.video_encoder,
            audio = cfg.effective_audio().is_some(),
            "encode sink opened"
        );
        self.frame_len = (cfg.width as usize) * (cfg.height as usize) * 4;
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn start(&mut self) -> VeilResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| VeilError::validation("sink started before open"))?;
        if self.child.is_some() {
            return Err(VeilError::validation("sink already started"));
        }

        let mut child = self.build_command(cfg).spawn().map_err(|e| {
            VeilError::media(format!(
                "failed to spawn {} (is it installed and on PATH?): {e}",
                self.ffmpeg_bin
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| VeilError::media("failed to open ffmpeg stdin (unexpected)"))?;
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
        let (tx, rx) = mpsc::channel();
        let interval = cfg.chunk_interval;
        let stdout_reader = std::thread::spawn(move || pump_chunks(stdout, interval, tx));

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.stdout_reader = Some(stdout_reader);
        self.chunks = Some(rx);
        Ok(())
    }

    fn submit_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> VeilResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| VeilError::validation("ffmpeg sink not opened"))?;
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(VeilError::validation(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(VeilError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.frame_len {
            return Err(VeilError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(VeilError::validation("ffmpeg sink is not running"));
        };
        stdin.write_all(&frame.data).map_err(|e| {
            VeilError::media(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.last_idx = Some(idx);
        Ok(())
    }

    fn poll_chunks(&mut self) -> Vec<Chunk> {
        self.chunks
            .as_ref()
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default()
    }

    fn stop(&mut self) -> VeilResult<Vec<Chunk>> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| VeilError::validation("ffmpeg sink not started"))?;
        let status = child
            .wait()
            .map_err(|e| VeilError::media(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr_bytes = self.join_threads()?;
        let chunks = self
            .chunks
            .take()
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(VeilError::media(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        self.cfg = None;
        Ok(chunks)
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = self.join_threads();
        self.chunks = None;
        self.cfg = None;
    }
}

impl Drop for FfmpegCaptureSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

/// Return `true` when `ffmpeg_bin -version` runs successfully.
pub fn is_ffmpeg_available(ffmpeg_bin: &str) -> bool {
    Command::new(ffmpeg_bin)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> VeilResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
