// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From ICDAR15 files on disk to tensor batches:
//
//   gt.txt + word_N.png
//       │
//       ▼
//   icdar15           → parses ground truth, decodes images
//       │
//       ▼
//   TransformCrnn     → resize once; jitter + normalise per access
//       │
//       ▼
//   Icdar15Dataset    → implements Burn's Dataset trait
//       │
//       ▼
//   TextLineBatcher   → collates images, concatenated labels, lengths
//       │
//       ▼
//   DataLoader        → shuffled, prefetched batches for the trainer

/// ICDAR15 ground-truth parsing and corpus loading
pub mod icdar15;

/// Resize, jitter and normalisation of word crops
pub mod transform;

/// Implements Burn's Dataset trait for text-line samples
pub mod dataset;

/// Implements Burn's Batcher trait (the collation function)
pub mod batcher;
