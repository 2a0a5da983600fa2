pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Source-over of one premultiplied RGBA8 pixel onto an opaque destination.
pub(crate) fn blend_premul_over_opaque(dst: &mut [u8], src: [u8; 4]) {
    let a = u16::from(src[3]);
    if a == 0 {
        return;
    }
    if a == 255 {
        dst[..3].copy_from_slice(&src[..3]);
        dst[3] = 255;
        return;
    }
    let inv = 255 - a;
    for c in 0..3 {
        let d = mul_div255_u16(u16::from(dst[c]), inv);
        dst[c] = (u16::from(src[c]) + d).min(255) as u8;
    }
    dst[3] = 255;
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
