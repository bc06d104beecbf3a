use anyhow::Result;
use burn::data::dataset::Dataset;
use image::DynamicImage;
use std::path::Path;

use crate::data::{icdar15, transform::TransformCrnn};
use crate::domain::{
    charset::Charset,
    sample::{CorpusMode, ImageShape, TextLineItem},
};

/// One view (Train or Eval) of the ICDAR15 word corpus.
///
/// Images are decoded and resized once at load time; `get` only
/// applies the per-access jitter and normalisation.
pub struct Icdar15Dataset {
    /// Train or Eval; decides whether `get` jitters
    mode:      CorpusMode,
    transform: TransformCrnn,
    /// Resized crops paired with their encoded labels
    samples:   Vec<(DynamicImage, Vec<u32>)>,
}

impl Icdar15Dataset {
    /// Load one view from disk. Labels that need more than `max_steps`
    /// CTC outputs are dropped (see `icdar15::load_corpus`).
    pub fn load(
        root:      &Path,
        mode:      CorpusMode,
        charset:   &Charset,
        shape:     ImageShape,
        max_steps: usize,
    ) -> Result<Self> {
        let transform = TransformCrnn::new(shape, mode.augments());
        let samples   = icdar15::load_corpus(root, mode, charset, &transform, max_steps)?;
        Ok(Self { mode, transform, samples })
    }

    /// Build a view from images that still need resizing.
    pub fn from_samples(
        mode:    CorpusMode,
        shape:   ImageShape,
        samples: Vec<(DynamicImage, Vec<u32>)>,
    ) -> Self {
        let transform = TransformCrnn::new(shape, mode.augments());
        let samples = samples
            .into_iter()
            .map(|(img, label)| (transform.prepare(img), label))
            .collect();
        Self { mode, transform, samples }
    }

    pub fn mode(&self) -> CorpusMode { self.mode }

    pub fn shape(&self) -> ImageShape { self.transform.shape() }
}

impl Dataset<TextLineItem> for Icdar15Dataset {
    fn get(&self, index: usize) -> Option<TextLineItem> {
        self.samples
            .get(index)
            .map(|(img, label)| TextLineItem::new(self.transform.to_pixels(img), label.clone()))
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
