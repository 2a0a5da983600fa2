use std::path::PathBuf;
use std::time::Duration;

use crate::encode::codec::CodecCandidate;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{VeilError, VeilResult};
use crate::render::frame::FrameRGBA;

/// Everything a sink needs to know before the first frame arrives.
#[derive(Clone, Debug)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    /// Negotiated container/codec pair.
    pub codec: CodecCandidate,
    pub video_bits_per_second: u64,
    pub audio_bits_per_second: u64,
    /// Wall-clock interval between emitted chunks.
    pub chunk_interval: Duration,
    /// Audio to mux alongside the frames; ignored when the codec carries no audio.
    pub audio: Option<AudioInputConfig>,
}

impl SinkConfig {
    pub fn validate(&self) -> VeilResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(VeilError::validation("sink width/height must be non-zero"));
        }
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(VeilError::validation("sink fps must be non-zero"));
        }
        if self.video_bits_per_second == 0 {
            return Err(VeilError::validation("video bitrate must be non-zero"));
        }
        if self.chunk_interval.is_zero() {
            return Err(VeilError::validation("chunk interval must be non-zero"));
        }
        if let Some(audio) = &self.audio {
            if audio.sample_rate == 0 || audio.channels == 0 {
                return Err(VeilError::validation(
                    "audio sample_rate/channels must be non-zero when audio is enabled",
                ));
            }
        }
        Ok(())
    }

    /// Audio input that will actually be muxed.
    pub fn effective_audio(&self) -> Option<&AudioInputConfig> {
        self.audio.as_ref().filter(|_| self.codec.has_audio())
    }
}

/// Raw interleaved `f32le` PCM file fed to the encoder.
#[derive(Clone, Debug)]
pub struct AudioInputConfig {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
}

/// A slice of encoded output, in emission order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub seq: u64,
    pub bytes: Vec<u8>,
}

/// Consumes composited frames and produces encoded chunks.
///
/// Call order: `open`, `start`, `submit_frame`*, then exactly one of `stop` or `abort`.
/// Frames arrive in strictly increasing [`FrameIndex`] order.
pub trait EncodeSink: Send {
    /// Validate the configuration and prepare the encoder.
    fn open(&mut self, cfg: SinkConfig) -> VeilResult<()>;
    /// Begin capturing.
    fn start(&mut self) -> VeilResult<()>;
    fn submit_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> VeilResult<()>;
    /// Chunks emitted since the last call. Sinks without incremental output return nothing.
    fn poll_chunks(&mut self) -> Vec<Chunk> {
        Vec::new()
    }
    /// Flush and return every chunk not yet handed out by `poll_chunks`.
    fn stop(&mut self) -> VeilResult<Vec<Chunk>>;
    /// Tear down immediately, discarding pending output.
    fn abort(&mut self);
}

/// Keeps submitted frames in memory for tests and debugging. Produces no encoded bytes.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    started: bool,
    stopped: bool,
    aborted: bool,
    frames: Vec<(FrameIndex, FrameRGBA)>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    pub fn was_stopped(&self) -> bool {
        self.stopped
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted
    }
}

impl EncodeSink for InMemorySink {
    fn open(&mut self, cfg: SinkConfig) -> VeilResult<()> {
        cfg.validate()?;
        self.cfg = Some(cfg);
        self.frames.clear();
        self.started = false;
        self.stopped = false;
        self.aborted = false;
        Ok(())
    }

    fn start(&mut self) -> VeilResult<()> {
        if self.cfg.is_none() {
            return Err(VeilError::validation("sink started before open"));
        }
        self.started = true;
        Ok(())
    }

    fn submit_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> VeilResult<()> {
        if !self.started {
            return Err(VeilError::validation("frame submitted before start"));
        }
        if let Some((last, _)) = self.frames.last()
            && idx <= *last
        {
            return Err(VeilError::validation(
                "sink received out-of-order frame index",
            ));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn stop(&mut self) -> VeilResult<Vec<Chunk>> {
        self.started = false;
        self.stopped = true;
        Ok(Vec::new())
    }

    fn abort(&mut self) {
        self.started = false;
        self.aborted = true;
        self.frames.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
