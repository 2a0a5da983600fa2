use std::collections::HashMap;
use std::sync::Arc;

use crate::foundation::error::{VeilError, VeilResult};

/// Radius that covers `±3σ`, capped so tiny regions don't pay for huge kernels.
pub fn radius_for_sigma(sigma: f64, width: u32, height: u32) -> u32 {
    if !sigma.is_finite() || sigma <= 0.0 {
        return 0;
    }
    let r = (sigma * 3.0).ceil() as u32;
    r.min(width.max(height)).max(1)
}

fn expected_len(width: u32, height: u32) -> VeilResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| VeilError::validation("blur buffer size overflow"))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct BlurKernelKey {
    radius_px: u32,
    sigma_bits: u32,
}

/// Memoizes quantized kernels across frames; regions keep the same strength for their whole
/// lifetime so the same few kernels are requested over and over.
#[derive(Default)]
pub struct BlurCache {
    kernels: HashMap<BlurKernelKey, Arc<Vec<u32>>>,
    scratch: Vec<u8>,
}

impl BlurCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Separable Gaussian blur of a tightly packed RGBA8 patch with `sigma = strength_px`.
    ///
    /// Samples outside the patch clamp to the nearest edge pixel, so a blurred region never
    /// pulls in pixels from outside its own rect.
    pub fn blur_patch(
        &mut self,
        src: &[u8],
        width: u32,
        height: u32,
        strength_px: f64,
    ) -> VeilResult<Vec<u8>> {
        let expected_len = expected_len(width, height)?;
        if src.len() != expected_len {
            return Err(VeilError::validation(
                "blur_patch expects src matching width*height*4",
            ));
        }
        let radius = radius_for_sigma(strength_px, width, height);
        if radius == 0 {
            return Ok(src.to_vec());
        }
        let sigma = strength_px as f32;
        let key = BlurKernelKey {
            radius_px: radius,
            sigma_bits: sigma.to_bits(),
        };
        let kernel = match self.kernels.get(&key) {
            Some(k) => k.clone(),
            None => {
                let k = Arc::new(gaussian_kernel_q16(radius, sigma)?);
                self.kernels.insert(key, k.clone());
                k
            }
        };

        self.scratch.clear();
        self.scratch.resize(expected_len, 0);
        let mut out = vec![0u8; expected_len];
        horizontal_pass(src, &mut self.scratch, width, height, &kernel);
        vertical_pass(&self.scratch, &mut out, width, height, &kernel);
        Ok(out)
    }
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> VeilResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(VeilError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let sigma = sigma as f64;
    let denom = 2.0 * sigma * sigma;
    for i in -r..=r {
        let x = i as f64;
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }
    if sum <= 0.0 {
        return Err(VeilError::validation("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Fold the quantization error into the center tap so the kernel sums to exactly 1.0.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        let new_mid = (i64::from(weights[mid]) + delta).clamp(0, 65536);
        weights[mid] = new_mid as u32;
    }

    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += (kw as u64) * (src[idx + c] as u64);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                for c in 0..4 {
                    acc[c] += (kw as u64) * (src[idx + c] as u64);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    (v.min(255)) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
