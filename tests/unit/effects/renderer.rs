use super::*;

use crate::foundation::core::Canvas;

const TEST_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

fn patterned_frame(w: u32, h: u32) -> FrameRGBA {
    let mut data = Vec::with_capacity((w * h * 4) as usize);
    for y in 0..h {
        for x in 0..w {
            let v = if (x / 4 + y / 4) % 2 == 0 { 230 } else { 20 };
            data.extend_from_slice(&[v, (x * 3 % 256) as u8, (y * 5 % 256) as u8, 255]);
        }
    }
    FrameRGBA::from_rgba8(w, h, data).unwrap()
}

fn region(id: &str, x: f64, y: f64, w: f64, h: f64) -> MosaicRegion {
    MosaicRegion {
        id: id.to_string(),
        x,
        y,
        width: w,
        height: h,
        start_time: 0.0,
        end_time: 1.0,
        blur_strength: Some(4.0),
    }
}

fn overlay(id: &str, text: &str, bg: Option<&str>) -> TextOverlay {
    TextOverlay {
        id: id.to_string(),
        text: text.to_string(),
        x: 0.1,
        y: 0.1,
        start_time: 0.0,
        end_time: 10.0,
        font_size: 24.0,
        font_color: "#ffffff".to_string(),
        background_color: bg.map(str::to_string),
    }
}

fn renderer() -> EffectRenderer {
    EffectRenderer::new(&ExportConfig::default()).unwrap()
}

fn blur_rect(frame: &mut FrameRGBA, rect: PixelRect, strength: f64) {
    let patch = frame.crop(rect).unwrap();
    let out = BlurCache::new()
        .blur_patch(&patch, rect.width as u32, rect.height as u32, strength)
        .unwrap();
    frame.paste(rect, &out).unwrap();
}

#[test]
fn no_effects_returns_source_frame() {
    let frame = patterned_frame(32, 24);
    let out = renderer().render_frame(&frame, &[], &[]).unwrap();
    assert_eq!(out.frame, frame);
    assert!(out.skipped.is_empty());
}

#[test]
fn mosaic_only_touches_its_rect() {
    let frame = patterned_frame(64, 64);
    let r = region("a", 0.25, 0.25, 0.5, 0.5);
    let out = renderer().render_frame(&frame, &[&r], &[]).unwrap();

    let rect = PixelRect::new(16, 16, 32, 32);
    let mut expected = frame.clone();
    blur_rect(&mut expected, rect, 4.0);
    assert_eq!(out.frame, expected);
    assert_ne!(out.frame.crop(rect).unwrap(), frame.crop(rect).unwrap());
    assert_eq!(out.frame.pixel(0, 0), frame.pixel(0, 0));
    assert_eq!(out.frame.pixel(63, 63), frame.pixel(63, 63));
}

#[test]
fn smaller_region_is_painted_last_regardless_of_list_order() {
    let frame = patterned_frame(200, 200);
    let a = region("a", 0.0, 0.0, 0.5, 0.5);
    let b = region("b", 0.125, 0.125, 0.25, 0.25);

    let out = renderer().render_frame(&frame, &[&b, &a], &[]).unwrap();

    let mut expected = frame.clone();
    blur_rect(&mut expected, PixelRect::new(0, 0, 100, 100), 4.0);
    blur_rect(&mut expected, PixelRect::new(25, 25, 50, 50), 4.0);
    assert_eq!(out.frame, expected);

    let mut wrong = frame.clone();
    blur_rect(&mut wrong, PixelRect::new(25, 25, 50, 50), 4.0);
    blur_rect(&mut wrong, PixelRect::new(0, 0, 100, 100), 4.0);
    assert_ne!(out.frame, wrong);
}

#[test]
fn out_of_frame_region_is_clamped_not_skipped() {
    let frame = patterned_frame(100, 40);
    let r = region("edge", 0.9, 0.5, 0.3, 0.8);
    let out = renderer().render_frame(&frame, &[&r], &[]).unwrap();
    assert!(out.skipped.is_empty());

    let rect = mapper::clamp(mapper::region_to_pixels(&r, frame.canvas()), frame.canvas());
    assert_eq!(rect, PixelRect::new(90, 20, 10, 20));
    assert!(rect.is_within(Canvas {
        width: 100,
        height: 40
    }));
    assert_ne!(out.frame.crop(rect).unwrap(), frame.crop(rect).unwrap());
}

#[test]
fn invalid_blur_strength_skips_only_that_region() {
    let frame = patterned_frame(64, 64);
    let mut bad = region("bad", 0.0, 0.0, 0.5, 0.5);
    bad.blur_strength = Some(f64::NAN);
    let good = region("good", 0.5, 0.5, 0.5, 0.5);

    let out = renderer().render_frame(&frame, &[&bad, &good], &[]).unwrap();
    assert_eq!(out.skipped.len(), 1);
    assert_eq!(out.skipped[0].id, "bad");
    assert!(matches!(out.skipped[0].error, VeilError::RenderEntity(_)));
    assert_eq!(
        out.frame.crop(PixelRect::new(0, 0, 32, 32)).unwrap(),
        frame.crop(PixelRect::new(0, 0, 32, 32)).unwrap()
    );
    assert_ne!(
        out.frame.crop(PixelRect::new(32, 32, 32, 32)).unwrap(),
        frame.crop(PixelRect::new(32, 32, 32, 32)).unwrap()
    );
}

#[test]
fn text_without_font_is_skipped_and_frame_kept() {
    let frame = patterned_frame(64, 48);
    let t = overlay("t1", "HI", Some("black"));
    let out = renderer().render_frame(&frame, &[], &[&t]).unwrap();
    assert_eq!(out.frame, frame);
    assert_eq!(out.skipped.len(), 1);
    assert_eq!(out.skipped[0].id, "t1");
    assert!(matches!(out.skipped[0].error, VeilError::RenderEntity(_)));
}

#[test]
fn unparsable_color_is_a_render_entity_failure() {
    let frame = patterned_frame(64, 48);
    let mut t = overlay("t1", "HI", None);
    t.font_color = "not-a-color".to_string();
    let out = renderer().render_frame(&frame, &[], &[&t]).unwrap();
    assert_eq!(out.skipped.len(), 1);
    assert!(matches!(out.skipped[0].error, VeilError::RenderEntity(_)));
}

#[test]
fn text_with_background_draws_box_at_padded_anchor() {
    let Ok(bytes) = std::fs::read(TEST_FONT) else {
        return;
    };
    let mut r = renderer().with_font_bytes(bytes).unwrap();
    assert!(r.has_font());

    let frame = FrameRGBA::solid(640, 360, [40, 80, 120, 255]);
    let t = overlay("hi", "HI", Some("#000000"));
    let out = r.render_frame(&frame, &[], &[&t]).unwrap();
    assert!(out.skipped.is_empty());

    // Anchor (64,36); padding 8 puts the box corner at (56,28).
    assert_eq!(out.frame.pixel(57, 29), Some([0, 0, 0, 255]));
    assert_eq!(out.frame.pixel(54, 26), Some([40, 80, 120, 255]));

    let rect = PixelRect::new(64, 36, 40, 30);
    let has_white = out
        .frame
        .crop(rect)
        .unwrap()
        .chunks_exact(4)
        .any(|px| px[0] > 200 && px[1] > 200 && px[2] > 200);
    assert!(has_white, "expected glyph pixels near the anchor");
}

#[test]
fn text_near_the_edge_is_clipped_not_skipped() {
    let Ok(bytes) = std::fs::read(TEST_FONT) else {
        return;
    };
    let mut r = renderer().with_font_bytes(bytes).unwrap();
    let frame = FrameRGBA::solid(80, 40, [0, 0, 0, 255]);
    let mut t = overlay("edge", "OVERFLOWING", Some("white"));
    t.x = 0.9;
    t.y = 0.9;
    let out = r.render_frame(&frame, &[], &[&t]).unwrap();
    assert!(out.skipped.is_empty());
    assert_eq!(out.frame.pixel(79, 39), Some([255, 255, 255, 255]));
}
