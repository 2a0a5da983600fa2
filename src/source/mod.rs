//! Frame sources: where decoded frames and the audio track come from.

pub mod audio;
pub mod ffmpeg;
pub mod probe;

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{VeilError, VeilResult};
use crate::model::entities::VideoMetadata;
use crate::render::frame::FrameRGBA;

pub use audio::AudioTrack;

/// A seekable video whose frames feed the compositing loop.
///
/// Ordering contract: within one run `seek` is called with non-decreasing timestamps.
/// Implementations may reject a backwards seek with [`VeilError::SeekFailure`].
pub trait FrameSource: Send {
    fn metadata(&self) -> &VideoMetadata;

    /// Block until the frame nearest `t` (seconds) is available.
    fn seek(&mut self, t: f64) -> VeilResult<()>;

    /// The frame materialized by the last [`FrameSource::seek`].
    fn read_frame(&mut self) -> VeilResult<FrameRGBA>;

    /// Best-effort audio extraction; `Ok(None)` when there is no audio.
    fn extract_audio_track(&mut self) -> VeilResult<Option<AudioTrack>>;

    /// Release decoder resources. Idempotent.
    fn close(&mut self);
}

type FrameFn = Box<dyn Fn(FrameIndex) -> FrameRGBA + Send>;

/// In-process source that synthesizes each frame from its index.
///
/// Used for tests and for previews of generated content; behaves like a decoder that holds the
/// last frame past the end of the stream.
pub struct GeneratedFrameSource {
    metadata: VideoMetadata,
    fps: Fps,
    make_frame: FrameFn,
    audio: Option<AudioTrack>,
    current: Option<FrameIndex>,
    closed: bool,
}

impl GeneratedFrameSource {
    pub fn new(
        metadata: VideoMetadata,
        make_frame: impl Fn(FrameIndex) -> FrameRGBA + Send + 'static,
    ) -> Self {
        let fps = metadata.effective_fps();
        Self {
            metadata,
            fps,
            make_frame: Box::new(make_frame),
            audio: None,
            current: None,
            closed: false,
        }
    }

    /// Every frame is the same solid color.
    pub fn solid(metadata: VideoMetadata, rgba: [u8; 4]) -> Self {
        let (w, h) = (metadata.width, metadata.height);
        Self::new(metadata, move |_| FrameRGBA::solid(w, h, rgba))
    }

    pub fn with_audio(mut self, track: AudioTrack) -> Self {
        self.audio = Some(track);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FrameSource for GeneratedFrameSource {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn seek(&mut self, t: f64) -> VeilResult<()> {
        if self.closed {
            return Err(VeilError::seek("source is closed"));
        }
        if !t.is_finite() || t < 0.0 {
            return Err(VeilError::seek(format!("invalid seek target {t}")));
        }
        let last = self.metadata.total_frames().saturating_sub(1);
        let idx = FrameIndex(self.fps.secs_to_frame_round(t).0.min(last));
        if let Some(cur) = self.current
            && idx < cur
        {
            return Err(VeilError::seek(format!(
                "backwards seek from frame {} to frame {}",
                cur.0, idx.0
            )));
        }
        self.current = Some(idx);
        Ok(())
    }

    fn read_frame(&mut self) -> VeilResult<FrameRGBA> {
        let idx = self
            .current
            .ok_or_else(|| VeilError::seek("read_frame called before seek"))?;
        Ok((self.make_frame)(idx))
    }

    fn extract_audio_track(&mut self) -> VeilResult<Option<AudioTrack>> {
        Ok(self.audio.take())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/generated.rs"]
mod tests;
