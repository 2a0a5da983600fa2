use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::ExportConfig;
use crate::effects::renderer::EffectRenderer;
use crate::encode::artifact::ExportArtifact;
use crate::encode::codec::{CodecProbe, negotiate};
use crate::encode::sink::{AudioInputConfig, Chunk, EncodeSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{VeilError, VeilResult};
use crate::model::entities::{MosaicRegion, TextOverlay, VideoMetadata, active_at};
use crate::model::project::EditProject;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::pacing::{Pacer, pacer_for};
use crate::pipeline::progress::{
    ExportObserver, ExportState, ProgressCell, ProgressReporter, StateCell, render_band,
};
use crate::source::FrameSource;

/// Everything one export needs, cloned out of the editing session when it starts.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportRequest {
    pub metadata: VideoMetadata,
    pub regions: Vec<MosaicRegion>,
    pub texts: Vec<TextOverlay>,
}

impl ExportRequest {
    pub fn new(metadata: VideoMetadata, project: &EditProject) -> Self {
        Self {
            metadata,
            regions: project.regions.clone(),
            texts: project.texts.clone(),
        }
    }

    pub fn validate(&self) -> VeilResult<()> {
        self.metadata.validate()?;
        EditProject {
            regions: self.regions.clone(),
            texts: self.texts.clone(),
        }
        .validate()
    }

    /// Entities whose window contains `t`.
    pub fn active_at(&self, t: f64) -> (Vec<&MosaicRegion>, Vec<&TextOverlay>) {
        (active_at(&self.regions, t), active_at(&self.texts, t))
    }
}

#[derive(Debug, Default)]
struct PipelineShared {
    busy: AtomicBool,
    progress: ProgressCell,
    state: StateCell,
}

/// Export entry point for one editing session.
///
/// At most one [`Session`] exists per pipeline at a time; cloning the pipeline shares that
/// restriction.
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    shared: Arc<PipelineShared>,
}

/// Proof of exclusive ownership of a [`Pipeline`]; releases it on drop.
#[derive(Debug)]
pub struct SessionToken {
    shared: Arc<PipelineShared>,
}

impl Drop for SessionToken {
    fn drop(&mut self) {
        self.shared.busy.store(false, Ordering::Release);
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest progress of the current or last session.
    pub fn progress(&self) -> u8 {
        self.shared.progress.get()
    }

    pub fn state(&self) -> ExportState {
        self.shared.state.get()
    }

    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// Snapshot `request` and claim the pipeline.
    ///
    /// Fails with [`VeilError::AlreadyProcessing`] while another session is alive, without
    /// touching that session's progress.
    pub fn start(&self, request: ExportRequest, config: ExportConfig) -> VeilResult<Session> {
        if self
            .shared
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(VeilError::AlreadyProcessing);
        }
        let token = SessionToken {
            shared: self.shared.clone(),
        };
        request.validate()?;
        config.validate()?;

        self.shared.progress.set(0);
        self.shared.state.set(ExportState::Idle);
        Ok(Session {
            token,
            request,
            config,
            cancel: CancelToken::new(),
            observers: Vec::new(),
            pacer: None,
        })
    }
}

/// One export run. Consumed by [`Session::run`]; dropping it releases the pipeline.
pub struct Session {
    token: SessionToken,
    request: ExportRequest,
    config: ExportConfig,
    cancel: CancelToken,
    observers: Vec<Box<dyn ExportObserver>>,
    pacer: Option<Box<dyn Pacer>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("request", &self.request)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn request(&self) -> &ExportRequest {
        &self.request
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Token that cancels this session from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn with_observer(mut self, observer: impl ExportObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Override the pacing chosen by `config.pacing`.
    pub fn with_pacer(mut self, pacer: Box<dyn Pacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    /// Split into the parts a backend needs; the token travels along to keep the lock.
    pub(crate) fn into_parts(
        self,
    ) -> (
        SessionToken,
        ExportRequest,
        ExportConfig,
        CancelToken,
        ProgressReporter,
    ) {
        let reporter = ProgressReporter::new(
            self.observers,
            self.token.shared.progress.clone(),
            self.token.shared.state.clone(),
        );
        (
            self.token,
            self.request,
            self.config,
            self.cancel,
            reporter,
        )
    }

    /// Drive the frame-stepped export to completion.
    ///
    /// `open_source` is called once during initialization. Fatal errors abort `sink`, close the
    /// source and drop any extracted audio before they are returned.
    #[tracing::instrument(level = "info", skip_all, fields(regions = self.request.regions.len(), texts = self.request.texts.len()))]
    pub fn run<S, F>(
        mut self,
        open_source: F,
        sink: &mut dyn EncodeSink,
        probe: &dyn CodecProbe,
    ) -> VeilResult<ExportArtifact>
    where
        S: FrameSource,
        F: FnOnce(&VideoMetadata) -> VeilResult<S>,
    {
        let pacer = self
            .pacer
            .take()
            .unwrap_or_else(|| pacer_for(self.config.pacing));
        let (token, request, config, cancel, mut reporter) = self.into_parts();
        let mut run = FrameRun {
            request: &request,
            config: &config,
            cancel: &cancel,
            reporter: &mut reporter,
            pacer,
        };

        let mut source: Option<S> = None;
        let mut sink_live = false;
        let result = run.drive(&mut source, &mut sink_live, open_source, sink, probe);

        if result.is_err() && sink_live {
            sink.abort();
        }
        if let Some(mut s) = source {
            s.close();
        }

        match &result {
            Ok(artifact) => {
                reporter.progress(100);
                reporter.state(ExportState::Complete);
                tracing::info!(
                    frames = artifact.frames,
                    bytes = artifact.bytes.len(),
                    mime = %artifact.mime,
                    "export complete"
                );
            }
            Err(e) => {
                reporter.state(ExportState::Failed);
                tracing::error!(error = %e, "export failed");
            }
        }
        drop(token);
        result
    }
}

struct FrameRun<'a> {
    request: &'a ExportRequest,
    config: &'a ExportConfig,
    cancel: &'a CancelToken,
    reporter: &'a mut ProgressReporter,
    pacer: Box<dyn Pacer>,
}

impl FrameRun<'_> {
    fn drive<S, F>(
        &mut self,
        source_slot: &mut Option<S>,
        sink_live: &mut bool,
        open_source: F,
        sink: &mut dyn EncodeSink,
        probe: &dyn CodecProbe,
    ) -> VeilResult<ExportArtifact>
    where
        S: FrameSource,
        F: FnOnce(&VideoMetadata) -> VeilResult<S>,
    {
        let meta = &self.request.metadata;
        let fps = meta.effective_fps();
        let total = meta.total_frames();

        self.reporter.state(ExportState::Initializing);
        self.reporter.progress(0);
        let mut renderer = EffectRenderer::new(self.config)?;
        let source = source_slot.insert(open_source(meta)?);
        let src_canvas = source.metadata().canvas();
        if src_canvas != meta.canvas() {
            return Err(VeilError::validation(format!(
                "source is {}x{} but the export expects {}x{}",
                src_canvas.width, src_canvas.height, meta.width, meta.height
            )));
        }
        self.cancel.check()?;
        self.reporter.progress(5);

        let audio = match source.extract_audio_track() {
            Ok(track) => track,
            Err(e) if !e.is_fatal() => {
                tracing::warn!(error = %e, "audio extraction failed; exporting video only");
                None
            }
            Err(e) => return Err(e),
        };
        if audio.is_none() {
            tracing::warn!("source has no usable audio track; exporting video only");
        }
        self.cancel.check()?;
        self.reporter.progress(10);

        let codec = negotiate(&self.config.codec_candidates, probe, audio.is_some())?;
        tracing::info!(mime = %codec.mime, "codec negotiated");
        let mime = codec.mime.clone();
        sink.open(SinkConfig {
            width: meta.width,
            height: meta.height,
            fps,
            codec,
            video_bits_per_second: self.config.video_bits_per_second,
            audio_bits_per_second: self.config.audio_bits_per_second,
            chunk_interval: Duration::from_millis(self.config.chunk_interval_ms),
            audio: audio.as_ref().map(|a| AudioInputConfig {
                path: a.path().to_path_buf(),
                sample_rate: a.sample_rate(),
                channels: a.channels(),
            }),
        })?;
        *sink_live = true;
        sink.start()?;
        self.reporter.progress(15);

        self.reporter.state(ExportState::Rendering);
        let mut chunks: Vec<Chunk> = Vec::new();
        let every = self.config.progress_every_frames.max(1);
        self.pacer.begin(fps);
        for i in 0..total {
            self.cancel.check()?;
            let idx = FrameIndex(i);
            let t = fps.frame_to_secs(idx);
            source.seek(t)?;
            let frame = source.read_frame()?;
            if frame.canvas() != meta.canvas() {
                return Err(VeilError::seek(format!(
                    "frame {i} is {}x{}, expected {}x{}",
                    frame.width, frame.height, meta.width, meta.height
                )));
            }

            let (mosaics, texts) = self.request.active_at(t);
            let rendered = renderer.render_frame(&frame, &mosaics, &texts)?;
            self.cancel.check()?;
            sink.submit_frame(idx, &rendered.frame)?;
            chunks.extend(sink.poll_chunks());

            if i % every == 0 {
                self.reporter.progress(render_band(i, total));
            }
            self.pacer.after_frame(idx, self.cancel)?;
        }
        self.reporter.progress(90);

        self.reporter.state(ExportState::Finalizing);
        *sink_live = false;
        chunks.extend(sink.stop()?);
        self.reporter.progress(95);
        drop(audio);

        Ok(ExportArtifact::from_chunks(mime, chunks, total))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/orchestrator.rs"]
mod tests;
