use std::path::PathBuf;

use crate::assets::color::parse_color;
use crate::config::ExportConfig;
use crate::foundation::error::{VeilError, VeilResult};
use crate::geometry::mapper;
use crate::model::entities::{MosaicRegion, TextOverlay, VideoMetadata};

/// Label carrying the finished video out of every graph.
pub const OUTPUT_LABEL: &str = "v";
const TEXT_INPUT_LABEL: &str = "tmp";

/// A `-filter_complex` graph and the label its result is written to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterGraph {
    pub graph: String,
    pub output_label: String,
}

/// Knobs shared by the chain builders.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterOptions {
    pub default_blur_strength: f64,
    pub text_padding_px: u32,
    pub font_file: Option<PathBuf>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self::from(&ExportConfig::default())
    }
}

impl From<&ExportConfig> for FilterOptions {
    fn from(cfg: &ExportConfig) -> Self {
        Self {
            default_blur_strength: cfg.default_blur_strength,
            text_padding_px: cfg.text_padding_px,
            font_file: cfg.font_path.clone(),
        }
    }
}

/// Crop, blur and overlay every region, in list order, writing to `[out_label]`.
///
/// Unlike the frame renderer this does not sort by area: with overlapping regions the later
/// one in the list is on top.
pub fn build_mosaic_chain(
    regions: &[MosaicRegion],
    meta: &VideoMetadata,
    opts: &FilterOptions,
    out_label: &str,
) -> FilterGraph {
    if regions.is_empty() {
        return FilterGraph {
            graph: format!("[0:v]copy[{out_label}]"),
            output_label: out_label.to_string(),
        };
    }

    let canvas = meta.canvas();
    let n = regions.len();
    let mut stages = Vec::with_capacity(2 * n + 1);

    let mut split = format!("[0:v]split={}[base]", n + 1);
    for i in 0..n {
        split.push_str(&format!("[s{i}]"));
    }
    stages.push(split);

    let rects: Vec<_> = regions
        .iter()
        .map(|r| mapper::clamp(mapper::region_to_pixels(r, canvas), canvas))
        .collect();

    for (i, (region, rect)) in regions.iter().zip(&rects).enumerate() {
        let radius = boxblur_radius(
            region.blur_strength_or(opts.default_blur_strength),
            rect.width,
            rect.height,
        );
        let mut stage = format!(
            "[s{i}]crop={}:{}:{}:{}",
            rect.width, rect.height, rect.x, rect.y
        );
        if radius > 0 {
            stage.push_str(&format!(",boxblur={radius}:5"));
        }
        stage.push_str(&format!("[b{i}]"));
        stages.push(stage);
    }

    for (i, (region, rect)) in regions.iter().zip(&rects).enumerate() {
        let input = if i == 0 {
            "[base]".to_string()
        } else {
            format!("[o{}]", i - 1)
        };
        let output = if i == n - 1 {
            format!("[{out_label}]")
        } else {
            format!("[o{i}]")
        };
        stages.push(format!(
            "{input}[b{i}]overlay={}:{}:enable='{}'{output}",
            rect.x,
            rect.y,
            between(region.start_time, region.end_time)
        ));
    }

    FilterGraph {
        graph: stages.join(";"),
        output_label: out_label.to_string(),
    }
}

/// One `drawtext` per overlay, joined with `,`; `None` when there are no overlays.
pub fn build_text_chain(
    overlays: &[TextOverlay],
    meta: &VideoMetadata,
    opts: &FilterOptions,
) -> VeilResult<Option<String>> {
    if overlays.is_empty() {
        return Ok(None);
    }
    let canvas = meta.canvas();
    let mut filters = Vec::with_capacity(overlays.len());
    for o in overlays {
        let (x, y) = mapper::overlay_to_pixels(o, canvas);
        let color = parse_color(&o.font_color)
            .map_err(|e| VeilError::validation(format!("text overlay '{}': {e}", o.id)))?;
        let mut f = format!(
            "drawtext=text='{}':x={x}:y={y}:fontsize={}:fontcolor={}",
            escape_drawtext(&o.text),
            fmt_num(o.font_size),
            color.to_ffmpeg()
        );
        if let Some(bg) = &o.background_color {
            let bg = parse_color(bg)
                .map_err(|e| VeilError::validation(format!("text overlay '{}': {e}", o.id)))?;
            f.push_str(&format!(
                ":box=1:boxcolor={}:boxborderw={}",
                bg.to_ffmpeg(),
                opts.text_padding_px
            ));
        }
        if let Some(font) = &opts.font_file {
            f.push_str(&format!(
                ":fontfile='{}'",
                escape_drawtext(&font.display().to_string())
            ));
        }
        f.push_str(&format!(":enable='{}'", between(o.start_time, o.end_time)));
        filters.push(f);
    }
    Ok(Some(filters.join(",")))
}

/// Mosaic chain followed by the text chain, ending in `[v]`.
pub fn build_complete_chain(
    regions: &[MosaicRegion],
    overlays: &[TextOverlay],
    meta: &VideoMetadata,
    opts: &FilterOptions,
) -> VeilResult<FilterGraph> {
    let Some(text) = build_text_chain(overlays, meta, opts)? else {
        return Ok(build_mosaic_chain(regions, meta, opts, OUTPUT_LABEL));
    };
    let mosaic = build_mosaic_chain(regions, meta, opts, TEXT_INPUT_LABEL);
    Ok(FilterGraph {
        graph: format!(
            "{};[{TEXT_INPUT_LABEL}]{text}[{OUTPUT_LABEL}]",
            mosaic.graph
        ),
        output_label: OUTPUT_LABEL.to_string(),
    })
}

/// Escape `\`, `'` and `:` for a quoted drawtext value.
pub fn escape_drawtext(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            ':' => out.push_str("\\:"),
            _ => out.push(c),
        }
    }
    out
}

/// boxblur rejects radii larger than half the smallest (chroma) plane dimension; with yuv420
/// input that is a quarter of the crop's smaller side.
pub(crate) fn boxblur_radius(strength: f64, width: i64, height: i64) -> i64 {
    if !strength.is_finite() || strength <= 0.0 {
        return 0;
    }
    let max = width.min(height) / 4;
    (strength.round() as i64).clamp(0, max)
}

fn between(start: f64, end: f64) -> String {
    format!("between(t,{},{})", fmt_num(start), fmt_num(end))
}

fn fmt_num(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter/chain.rs"]
mod tests;
