pub mod color;
pub(crate) mod text;
