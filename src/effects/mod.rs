pub mod blur;
pub mod renderer;
