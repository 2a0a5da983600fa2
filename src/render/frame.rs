use crate::foundation::core::Canvas;
use crate::foundation::error::{VeilError, VeilResult};
use crate::geometry::mapper::PixelRect;

/// A decoded or composited frame as RGBA8 pixels.
///
/// Frames coming out of the decoder are opaque, so straight and premultiplied alpha coincide;
/// the flag is kept explicit at API boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> VeilResult<Self> {
        let expected = Canvas { width, height }.byte_len_rgba8();
        if data.len() != expected {
            return Err(VeilError::validation(format!(
                "frame data length {} does not match {width}x{height}x4",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            premultiplied: true,
        })
    }

    /// Opaque frame filled with a single color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba.repeat((width as usize) * (height as usize));
        Self {
            width,
            height,
            data,
            premultiplied: true,
        }
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ])
    }

    /// Copy out a sub-image. `rect` must already be clamped to the frame.
    pub fn crop(&self, rect: PixelRect) -> VeilResult<Vec<u8>> {
        self.check_rect(rect)?;
        let (x, y, w, h) = rect_usize(rect);
        let stride = self.width as usize * 4;
        let mut out = Vec::with_capacity(w * h * 4);
        for row in y..y + h {
            let start = row * stride + x * 4;
            out.extend_from_slice(&self.data[start..start + w * 4]);
        }
        Ok(out)
    }

    /// Overwrite the pixels under `rect` with `src` (tightly packed, `rect` sized).
    pub fn paste(&mut self, rect: PixelRect, src: &[u8]) -> VeilResult<()> {
        self.check_rect(rect)?;
        let (x, y, w, h) = rect_usize(rect);
        if src.len() != w * h * 4 {
            return Err(VeilError::validation("paste source does not match rect size"));
        }
        let stride = self.width as usize * 4;
        for (i, row) in (y..y + h).enumerate() {
            let start = row * stride + x * 4;
            self.data[start..start + w * 4].copy_from_slice(&src[i * w * 4..(i + 1) * w * 4]);
        }
        Ok(())
    }

    fn check_rect(&self, rect: PixelRect) -> VeilResult<()> {
        if !rect.is_within(self.canvas()) {
            return Err(VeilError::validation(format!(
                "rect {rect:?} is not inside the {}x{} frame",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

fn rect_usize(rect: PixelRect) -> (usize, usize, usize, usize) {
    (
        rect.x as usize,
        rect.y as usize,
        rect.width as usize,
        rect.height as usize,
    )
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
