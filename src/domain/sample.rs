// ============================================================
// Layer 3 — Text-Line Sample Types
// ============================================================
// A sample is one cropped word image plus its transcription,
// already encoded as class indices:
//
//   pixels: [C * H * W] floats in [-1, 1], channel-major
//   label:  [label_len] class indices, never the blank (0)
//
// The corpus is split into two views selected by CorpusMode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which half of the corpus a dataset view is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorpusMode {
    Train,
    Eval,
}

impl CorpusMode {
    /// Photometric jitter is only applied to the training view.
    pub fn augments(self) -> bool {
        matches!(self, CorpusMode::Train)
    }
}

impl fmt::Display for CorpusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorpusMode::Train => write!(f, "Train"),
            CorpusMode::Eval => write!(f, "Eval"),
        }
    }
}

/// One labelled text-line image ready for collation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLineItem {
    /// Normalised pixels, channel-major, length C·H·W
    pub pixels: Vec<f32>,
    /// Class indices of the transcription
    pub label:  Vec<u32>,
}

impl TextLineItem {
    pub fn new(pixels: Vec<f32>, label: Vec<u32>) -> Self {
        Self { pixels, label }
    }

    pub fn label_len(&self) -> usize {
        self.label.len()
    }
}

/// Fewest model outputs a CTC alignment of `label` needs: one per
/// symbol, plus a blank between every pair of equal neighbours.
pub fn min_ctc_steps(label: &[u32]) -> usize {
    label.len() + label.windows(2).filter(|w| w[0] == w[1]).count()
}

/// Geometry every image is resized to before it reaches the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    /// 1 for grayscale, 3 for RGB
    pub channels: usize,
    /// Rows; the conv stack expects a multiple of 16, at least 32
    pub height:   usize,
    /// Columns; sets the number of CTC time steps
    pub width:    usize,
}

impl ImageShape {
    pub fn new(channels: usize, height: usize, width: usize) -> Self {
        Self { channels, height, width }
    }

    /// Number of floats in one flattened image.
    pub fn num_values(&self) -> usize {
        self.channels * self.height * self.width
    }
}
