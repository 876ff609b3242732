//! Shared test utilities for domain testing
//!
//! - `TestDataBuilder`: deterministic filenames, embeddings and encoded images
//! - `assertions`: ordering and option helpers
//!
//! ```rust
//! use test_utils::TestDataBuilder;
//!
//! let builder = TestDataBuilder::from_test_name("search_orders_by_score");
//! let filename = builder.filename("cat");
//! let vector = builder.embedding(512, 0);
//! assert!(filename.ends_with("-cat.png"));
//! assert_eq!(vector.len(), 512);
//! ```

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Builder for test data with deterministic randomization
///
/// Tests stay reproducible because everything derives from a single seed.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate a unique name, e.g. `test-image-12345-main`
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// Generate a unique PNG filename, e.g. `test-12345-cat.png`
    pub fn filename(&self, suffix: &str) -> String {
        format!("test-{}-{}.png", self.seed, suffix)
    }

    /// Pseudo-random vector in `[-1, 1)`; the same `(seed, salt)` always yields the same values.
    pub fn embedding(&self, dimension: usize, salt: u64) -> Vec<f32> {
        let mut state = self
            .seed
            .wrapping_add(salt.wrapping_mul(0x9E37_79B9_7F4A_7C15))
            | 1;
        (0..dimension)
            .map(|_| {
                // 64-bit LCG (Knuth MMIX constants)
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                let unit = (state >> 40) as f32 / (1u64 << 24) as f32;
                unit * 2.0 - 1.0
            })
            .collect()
    }

    /// Standard basis vector `e_axis`, scaled by `scale`.
    pub fn axis_vector(dimension: usize, axis: usize, scale: f32) -> Vec<f32> {
        let mut v = vec![0.0; dimension];
        v[axis] = scale;
        v
    }

    /// A solid-color PNG whose color is derived from the seed and `salt`.
    pub fn png_bytes(&self, width: u32, height: u32, salt: u64) -> Vec<u8> {
        let [r, g, b, ..] = self.seed.wrapping_add(salt).to_le_bytes();
        encode_image(RgbImage::from_pixel(width, height, Rgb([r, g, b])), ImageFormat::Png)
    }

    /// A solid-color JPEG; useful to check that non-PNG uploads decode too.
    pub fn jpeg_bytes(&self, width: u32, height: u32) -> Vec<u8> {
        let [r, g, b, ..] = self.seed.to_be_bytes();
        encode_image(RgbImage::from_pixel(width, height, Rgb([r, g, b])), ImageFormat::Jpeg)
    }
}

fn encode_image(img: RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format)
        .expect("encoding an in-memory image cannot fail");
    buf.into_inner()
}

/// Test assertion helpers
pub mod assertions {
    /// Assert scores are in non-increasing order
    pub fn assert_sorted_desc(scores: &[f32], context: &str) {
        for pair in scores.windows(2) {
            assert!(
                pair[0] >= pair[1],
                "{}: scores not in descending order: {:?}",
                context,
                scores
            );
        }
    }

    /// Assert two vectors are element-wise equal within `eps`
    pub fn assert_close(actual: &[f32], expected: &[f32], eps: f32, context: &str) {
        assert_eq!(actual.len(), expected.len(), "{}: length mismatch", context);
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!(
                (a - e).abs() <= eps,
                "{}: index {} expected {}, got {}",
                context,
                i,
                e,
                a
            );
        }
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}
