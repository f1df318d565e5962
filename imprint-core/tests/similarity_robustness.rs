//! Robustness of the perceptual signature under common image transformations.
//!
//! Re-encoding and mild resizing must keep a signature within the
//! infringement threshold of the original, while structurally different
//! images must stay well outside it.

use image::{DynamicImage, Rgb, RgbImage};
use std::io::Cursor;

use imprint_core::FingerprintEngine;

/// Maximum Hamming distance for "same picture, different encoding".
const SIMILAR_BITS: u32 = 10;

/// Minimum Hamming distance for "different pictures".
const DISSIMILAR_BITS: u32 = 16;

/// Gradient with block structure, the kind of image Blockhash64 is stable on.
fn structured_image(width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let r = ((x as f32 / width as f32) * 255.0) as u8;
        let g = ((y as f32 / height as f32) * 255.0) as u8;
        let pattern = if (x / 20 + y / 20) % 2 == 0 { 30 } else { 0 };
        *pixel = Rgb([r.saturating_add(pattern), g, 96]);
    }
    img
}

fn png_bytes(img: &DynamicImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)
        .expect("PNG encoding failed");
    buffer.into_inner()
}

fn jpeg_bytes(img: &DynamicImage, quality: u8) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    img.write_with_encoder(encoder).expect("JPEG encoding failed");
    buffer.into_inner()
}

#[test]
fn test_jpeg_recompression_stays_similar() {
    let engine = FingerprintEngine::new();
    let original = DynamicImage::ImageRgb8(structured_image(256, 256));

    let base = engine.fingerprint(&png_bytes(&original)).unwrap();

    for quality in [90, 70] {
        let reencoded = engine.fingerprint(&jpeg_bytes(&original, quality)).unwrap();
        let distance = base.signature.hamming_distance(&reencoded.signature);
        assert!(
            distance <= SIMILAR_BITS,
            "JPEG q{quality} moved the signature {distance} bits"
        );
        // Different bytes, so a distinct content identity.
        assert_ne!(base.content_hash, reencoded.content_hash);
    }
}

#[test]
fn test_mild_resize_stays_similar() {
    let engine = FingerprintEngine::new();
    let original = DynamicImage::ImageRgb8(structured_image(256, 256));
    let resized = original.resize_exact(192, 192, image::imageops::FilterType::Lanczos3);

    let a = engine.fingerprint(&png_bytes(&original)).unwrap();
    let b = engine.fingerprint(&png_bytes(&resized)).unwrap();

    let distance = a.signature.hamming_distance(&b.signature);
    assert!(
        distance <= SIMILAR_BITS,
        "75% resize moved the signature {distance} bits"
    );
}

#[test]
fn test_inverted_image_is_dissimilar() {
    let engine = FingerprintEngine::new();
    let original = DynamicImage::ImageRgb8(structured_image(256, 256));
    let mut inverted = original.clone();
    inverted.invert();

    let a = engine.fingerprint(&png_bytes(&original)).unwrap();
    let b = engine.fingerprint(&png_bytes(&inverted)).unwrap();

    let distance = a.signature.hamming_distance(&b.signature);
    assert!(
        distance >= DISSIMILAR_BITS,
        "inverted image only {distance} bits away"
    );
}
