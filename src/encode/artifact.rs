use std::path::Path;

use anyhow::Context as _;

use crate::encode::ffmpeg::ensure_parent_dir;
use crate::encode::sink::Chunk;
use crate::foundation::error::VeilResult;

/// The finished export: encoded bytes plus the MIME type describing them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportArtifact {
    pub mime: String,
    pub bytes: Vec<u8>,
    /// Number of frames that went into the encoder.
    pub frames: u64,
}

impl ExportArtifact {
    /// Concatenate chunks in sequence order.
    pub fn from_chunks(mime: impl Into<String>, mut chunks: Vec<Chunk>, frames: u64) -> Self {
        chunks.sort_by_key(|c| c.seq);
        let len = chunks.iter().map(|c| c.bytes.len()).sum();
        let mut bytes = Vec::with_capacity(len);
        for c in chunks {
            bytes.extend_from_slice(&c.bytes);
        }
        Self {
            mime: mime.into(),
            bytes,
            frames,
        }
    }

    /// Suggested file extension for the container.
    pub fn extension(&self) -> &'static str {
        match self.mime.split(';').next().unwrap_or_default() {
            "video/webm" => "webm",
            "video/mp4" => "mp4",
            "video/x-matroska" => "mkv",
            _ => "bin",
        }
    }

    pub fn write_to(&self, path: &Path) -> VeilResult<()> {
        ensure_parent_dir(path)?;
        std::fs::write(path, &self.bytes)
            .with_context(|| format!("failed to write output '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/artifact.rs"]
mod tests;
