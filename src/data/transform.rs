// ============================================================
// Layer 4 — CRNN Image Transform
// ============================================================
// Two stages:
//
//   prepare()   — once, at load time: colour conversion and a
//                 fixed-size resize to ImageShape (H × W)
//   to_pixels() — per access: optional photometric jitter, then
//                 normalisation (x / 255 - 0.5) / 0.5 → [-1, 1]
//
// Text is orientation-sensitive, so unlike detection pipelines
// there is no flipping; only brightness and contrast are jittered.

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use rand::Rng;

use crate::domain::sample::ImageShape;

/// Resize and normalise text-line crops for the CRNN.
#[derive(Debug, Clone)]
pub struct TransformCrnn {
    /// Target size every crop is resized to
    shape:   ImageShape,
    /// Apply brightness/contrast jitter in `to_pixels` (Train only)
    augment: bool,
}

impl TransformCrnn {
    pub fn new(shape: ImageShape, augment: bool) -> Self {
        Self { shape, augment }
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    /// Convert to the configured channel count and resize exactly.
    pub fn prepare(&self, img: DynamicImage) -> DynamicImage {
        let img = match self.shape.channels {
            1 => DynamicImage::ImageLuma8(img.to_luma8()),
            _ => DynamicImage::ImageRgb8(img.to_rgb8()),
        };
        img.resize_exact(
            self.shape.width as u32,
            self.shape.height as u32,
            FilterType::Triangle,
        )
    }

    /// Flatten a prepared image into channel-major normalised floats.
    pub fn to_pixels(&self, img: &DynamicImage) -> Vec<f32> {
        let jittered;
        let img = if self.augment {
            jittered = jitter(img.clone());
            &jittered
        } else {
            img
        };

        let (w, h) = img.dimensions();
        let mut out = Vec::with_capacity(self.shape.num_values());
        match self.shape.channels {
            1 => {
                let luma = img.to_luma8();
                out.extend(luma.pixels().map(|p| normalise(p[0])));
            }
            c => {
                let rgb = img.to_rgb8();
                for ch in 0..c.min(3) {
                    for y in 0..h {
                        for x in 0..w {
                            out.push(normalise(rgb.get_pixel(x, y)[ch]));
                        }
                    }
                }
            }
        }
        out
    }
}

fn normalise(v: u8) -> f32 {
    (v as f32 / 255.0 - 0.5) / 0.5
}

fn jitter(img: DynamicImage) -> DynamicImage {
    let mut rng = rand::thread_rng();
    let mut img = img;

    if rng.gen_bool(0.5) {
        img = img.brighten(rng.gen_range(-32..=32));
    }
    if rng.gen_bool(0.3) {
        img = img.adjust_contrast(rng.gen_range(-20.0..20.0));
    }
    img
}
