/// Crate-wide result alias.
pub type VeilResult<T> = Result<T, VeilError>;

/// Every failure the export pipeline can surface.
///
/// `RenderEntity` and `AudioExtraction` are recovered inside the pipeline (the entity is skipped,
/// the output goes silent); every other kind aborts the run and reaches the caller.
#[derive(thiserror::Error, Debug)]
pub enum VeilError {
    /// Invalid input data or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// None of the ranked codec candidates is supported by the encoder.
    #[error("codec unsupported: {0}")]
    CodecUnsupported(String),

    /// Another export session already owns the pipeline.
    #[error("already processing: another export session is running")]
    AlreadyProcessing,

    /// The frame source could not materialize the requested timestamp.
    #[error("seek failure: {0}")]
    SeekFailure(String),

    /// A single mosaic region or text overlay could not be drawn.
    #[error("render entity failure: {0}")]
    RenderEntity(String),

    /// The audio track could not be extracted.
    #[error("audio extraction failure: {0}")]
    AudioExtraction(String),

    /// The caller cancelled the session.
    #[error("cancelled: export was cancelled")]
    Cancelled,

    /// An `ffmpeg`/`ffprobe` process failed or produced unexpected output.
    #[error("media error: {0}")]
    Media(String),

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VeilError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn codec_unsupported(msg: impl Into<String>) -> Self {
        Self::CodecUnsupported(msg.into())
    }

    pub fn seek(msg: impl Into<String>) -> Self {
        Self::SeekFailure(msg.into())
    }

    pub fn render_entity(msg: impl Into<String>) -> Self {
        Self::RenderEntity(msg.into())
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::AudioExtraction(msg.into())
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `false` for kinds the pipeline recovers from locally.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::RenderEntity(_) | Self::AudioExtraction(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
