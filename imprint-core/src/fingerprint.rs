//! Content fingerprinting.
//!
//! Produces a stable content identity (SHA3-256 over the raw bytes) together
//! with a perceptual signature (Blockhash64) for near-duplicate detection.
//! Identical bytes always yield identical outputs; visually near-identical
//! inputs (recompression, minor cropping, watermark overlay) land within a
//! small Hamming distance of each other.

use blockhash::{blockhash64, Blockhash64};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::error::{ImprintError, Result};

/// Perceptual signature size in bits.
pub const SIGNATURE_BITS: u32 = 64;

/// Cryptographic content identity: SHA3-256 digest of the raw bytes.
///
/// Globally unique; used as the ownership ledger's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Digest raw content bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(data);
        let result = hasher.finalize();

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&result);
        Self(digest)
    }

    /// Hex encoding of the digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a hex-encoded digest.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| ImprintError::InvalidContent(format!("invalid content hash hex: {e}")))?;
        let digest: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            ImprintError::InvalidContent(format!("content hash must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(digest))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// 64-bit perceptual signature computed with the Blockhash algorithm.
///
/// Hamming distance between two signatures is a monotonic proxy for visual
/// dissimilarity; [`PerceptualSignature::similarity`] normalizes it to a
/// score in [0, 1] where higher means more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerceptualSignature([u8; 8]);

impl PerceptualSignature {
    pub fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Number of differing bits between two signatures.
    pub fn hamming_distance(&self, other: &Self) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    /// Similarity score in [0, 1]: 1.0 for identical signatures, 0.0 for
    /// all 64 bits differing.
    pub fn similarity(&self, other: &Self) -> f64 {
        1.0 - f64::from(self.hamming_distance(other)) / f64::from(SIGNATURE_BITS)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl std::fmt::Display for PerceptualSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Both halves of a content's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub content_hash: ContentHash,
    pub signature: PerceptualSignature,
}

/// Computes fingerprints for image payloads.
///
/// Pure function of the input bytes; no side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintEngine;

impl FingerprintEngine {
    pub fn new() -> Self {
        Self
    }

    /// Fingerprint raw image bytes (JPEG, PNG, GIF, or WebP).
    ///
    /// Fails with [`ImprintError::InvalidContent`] when the payload cannot
    /// be decoded as an image.
    pub fn fingerprint(&self, content: &[u8]) -> Result<Fingerprint> {
        let image = image::load_from_memory(content)
            .map_err(|e| ImprintError::InvalidContent(format!("failed to decode image: {e}")))?;

        Ok(Fingerprint {
            content_hash: ContentHash::from_bytes(content),
            signature: self.signature_of(&image),
        })
    }

    /// Perceptual signature of an already-decoded image.
    pub fn signature_of(&self, image: &DynamicImage) -> PerceptualSignature {
        let hash: Blockhash64 = blockhash64(image);
        PerceptualSignature(hash.into())
    }

    /// Whether the bytes look like a supported image format.
    pub fn is_supported_format(content: &[u8]) -> bool {
        image::guess_format(content).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(img: RgbImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .expect("PNG encoding failed");
        buffer.into_inner()
    }

    fn gradient_image(width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let r = ((x as f32 / width as f32) * 255.0) as u8;
            let g = ((y as f32 / height as f32) * 255.0) as u8;
            *pixel = Rgb([r, g, 128]);
        }
        img
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let bytes = png_bytes(gradient_image(64, 64));
        let engine = FingerprintEngine::new();

        let a = engine.fingerprint(&bytes).unwrap();
        let b = engine.fingerprint(&bytes).unwrap();

        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.signature, b.signature);
    }

    #[test]
    fn test_different_bytes_different_hash() {
        let engine = FingerprintEngine::new();
        let a = engine.fingerprint(&png_bytes(gradient_image(64, 64))).unwrap();
        let b = engine.fingerprint(&png_bytes(gradient_image(65, 64))).unwrap();
        assert_ne!(a.content_hash, b.content_hash);
    }

    #[test]
    fn test_invalid_content_rejected() {
        let engine = FingerprintEngine::new();
        let err = engine.fingerprint(b"not an image").unwrap_err();
        assert!(matches!(err, ImprintError::InvalidContent(_)));
    }

    #[test]
    fn test_content_hash_hex_roundtrip() {
        let hash = ContentHash::from_bytes(b"some content");
        let restored = ContentHash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, restored);
    }

    #[test]
    fn test_content_hash_from_bad_hex() {
        assert!(ContentHash::from_hex("xyz").is_err());
        assert!(ContentHash::from_hex("abcd").is_err()); // too short
    }

    #[test]
    fn test_hamming_distance() {
        let a = PerceptualSignature::new([0x00; 8]);
        let b = PerceptualSignature::new([0xFF; 8]);
        assert_eq!(a.hamming_distance(&a), 0);
        assert_eq!(a.hamming_distance(&b), 64);

        let c = PerceptualSignature::new([0x01, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(a.hamming_distance(&c), 1);
    }

    #[test]
    fn test_similarity_bounds() {
        let a = PerceptualSignature::new([0xAA; 8]);
        let b = PerceptualSignature::new([0x55; 8]);
        assert_eq!(a.similarity(&a), 1.0);
        assert_eq!(a.similarity(&b), 0.0);

        let c = PerceptualSignature::new([0xAB, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA]);
        let score = a.similarity(&c);
        assert!(score > 0.95 && score < 1.0);
    }

    #[test]
    fn test_is_supported_format() {
        // PNG magic bytes
        assert!(FingerprintEngine::is_supported_format(&[
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A
        ]));
        assert!(!FingerprintEngine::is_supported_format(&[0x00, 0x00]));
    }
}
