//! Declarative filter-graph backend: the whole edit as one ffmpeg `-filter_complex`.

pub mod chain;
pub mod export;
