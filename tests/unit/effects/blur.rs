use super::*;

#[test]
fn zero_strength_is_identity() {
    let src = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
    let out = BlurCache::new().blur_patch(&src, 1, 2, 0.0).unwrap();
    assert_eq!(out, src);
}

#[test]
fn blur_constant_image_is_identity() {
    let (w, h) = (4u32, 3u32);
    let px = [10u8, 20u8, 30u8, 255u8];
    let src = px.repeat((w * h) as usize);
    let out = BlurCache::new().blur_patch(&src, w, h, 2.0).unwrap();
    assert_eq!(out, src);
}

#[test]
fn blur_spreads_energy_from_single_pixel() {
    let (w, h) = (9u32, 9u32);
    let mut src = vec![0u8; (w * h * 4) as usize];
    let center = ((4 * w + 4) * 4) as usize;
    src[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);

    // sigma 1 gives radius 3, which stays inside the patch, so nothing is lost at the edges.
    let out = BlurCache::new().blur_patch(&src, w, h, 1.0).unwrap();

    let nonzero = out.chunks_exact(4).filter(|px| px[3] != 0).count();
    assert!(nonzero > 1);
    assert!(out[center + 3] < 255);

    let sum_a: i32 = out.chunks_exact(4).map(|px| i32::from(px[3])).sum();
    assert!((sum_a - 255).abs() <= 25, "{sum_a}");
}

#[test]
fn blur_rejects_mismatched_buffer() {
    assert!(BlurCache::new().blur_patch(&[0u8; 7], 1, 2, 1.0).is_err());
}

#[test]
fn radius_covers_three_sigma_and_is_capped() {
    assert_eq!(radius_for_sigma(20.0, 500, 500), 60);
    assert_eq!(radius_for_sigma(20.0, 10, 4), 10);
    assert_eq!(radius_for_sigma(0.0, 10, 10), 0);
    assert_eq!(radius_for_sigma(f64::NAN, 10, 10), 0);
}

#[test]
fn cache_reuses_kernels_per_strength() {
    let (w, h) = (6u32, 6u32);
    let mut src = vec![0u8; (w * h * 4) as usize];
    for (i, px) in src.chunks_exact_mut(4).enumerate() {
        px.copy_from_slice(&[(i * 7 % 256) as u8, (i * 13 % 256) as u8, 0, 255]);
    }
    let mut cache = BlurCache::new();
    let a = cache.blur_patch(&src, w, h, 1.5).unwrap();
    let b = cache.blur_patch(&src, w, h, 1.5).unwrap();
    assert_eq!(a, b);
    assert_eq!(cache.kernels.len(), 1);

    let c = cache.blur_patch(&src, w, h, 0.8).unwrap();
    assert_eq!(cache.kernels.len(), 2);
    assert_ne!(a, c);
    assert_eq!(BlurCache::new().blur_patch(&src, w, h, 1.5).unwrap(), a);
}
