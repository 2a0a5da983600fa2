//! Encode sinks, codec negotiation and the assembled output artifact.

pub mod artifact;
pub mod codec;
pub mod ffmpeg;
pub mod sink;
