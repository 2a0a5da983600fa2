pub mod entities;
pub mod project;
