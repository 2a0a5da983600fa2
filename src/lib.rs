//! Veilframe composites mosaic blurs and text overlays onto a video, frame by frame.
//!
//! The export API is session-oriented:
//!
//! - Describe the edit as an [`EditProject`] and snapshot it into an [`ExportRequest`]
//! - Claim a [`Pipeline`] to get a [`Session`]
//! - Run the session against a [`FrameSource`] and an [`EncodeSink`], or hand it to
//!   [`FilterExport`] for a single `ffmpeg -filter_complex` pass
#![forbid(unsafe_code)]

pub mod assets;
pub mod config;
pub mod effects;
pub mod encode;
pub mod filter;
pub mod foundation;
pub mod geometry;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod source;

pub use crate::assets::color::{Rgba8, parse_color};
pub use crate::config::{ExportConfig, PacingMode};
pub use crate::effects::renderer::{EffectRenderer, RenderedFrame, SkippedEntity};
pub use crate::encode::artifact::ExportArtifact;
pub use crate::encode::codec::{
    CodecCandidate, CodecProbe, FfmpegCodecProbe, StaticCodecProbe, default_candidates,
    negotiate,
};
pub use crate::encode::ffmpeg::{FfmpegCaptureSink, is_ffmpeg_available};
pub use crate::encode::sink::{AudioInputConfig, Chunk, EncodeSink, InMemorySink, SinkConfig};
pub use crate::filter::chain::{
    FilterGraph, FilterOptions, build_complete_chain, build_mosaic_chain, build_text_chain,
};
pub use crate::filter::export::{FilterExport, FilterOutcome};
pub use crate::foundation::core::{Canvas, Fps, FrameIndex};
pub use crate::foundation::error::{VeilError, VeilResult};
pub use crate::foundation::timecode::{format_time, parse_time};
pub use crate::geometry::mapper::{NormRect, PixelRect};
pub use crate::model::entities::{MosaicRegion, TextOverlay, TimeWindow, VideoMetadata};
pub use crate::model::project::EditProject;
pub use crate::pipeline::cancel::CancelToken;
pub use crate::pipeline::orchestrator::{ExportRequest, Pipeline, Session};
pub use crate::pipeline::pacing::{ImmediatePacer, Pacer, RealTimePacer};
pub use crate::pipeline::preview::render_preview;
pub use crate::pipeline::progress::{ExportObserver, ExportState, ProgressCell, ProgressFn};
pub use crate::render::frame::FrameRGBA;
pub use crate::source::ffmpeg::FfmpegFrameSource;
pub use crate::source::probe::{ProbedVideo, probe_video};
pub use crate::source::{AudioTrack, FrameSource, GeneratedFrameSource};
