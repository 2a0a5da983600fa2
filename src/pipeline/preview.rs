use crate::effects::renderer::{EffectRenderer, RenderedFrame};
use crate::foundation::error::{VeilError, VeilResult};
use crate::pipeline::orchestrator::ExportRequest;
use crate::source::FrameSource;

/// Composite the single frame an export would produce at `t`.
///
/// Does not claim the pipeline; previews may run next to an export.
pub fn render_preview(
    source: &mut dyn FrameSource,
    renderer: &mut EffectRenderer,
    request: &ExportRequest,
    t: f64,
) -> VeilResult<RenderedFrame> {
    if !t.is_finite() || t < 0.0 || t > request.metadata.duration {
        return Err(VeilError::validation(format!(
            "preview time {t} is outside 0..={}",
            request.metadata.duration
        )));
    }
    let fps = request.metadata.effective_fps();
    // Snap to the frame grid so previews match exported frames.
    let t = fps.frame_to_secs(fps.secs_to_frame_round(t));
    source.seek(t)?;
    let frame = source.read_frame()?;
    let (mosaics, texts) = request.active_at(t);
    renderer.render_frame(&frame, &mosaics, &texts)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/preview.rs"]
mod tests;
