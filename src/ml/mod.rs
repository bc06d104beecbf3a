// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that does tensor math lives here:
//
//   model.rs    — CRNN: 7-stage VGG-style conv stack, two
//                 bidirectional LSTMs, linear classifier.
//                 images [B, C, H, W] → logits [T, B, classes]
//
//   loss.rs     — CTC loss, log-space forward algorithm
//                 written in Burn tensor ops (autodiff)
//
//   optim.rs    — AdamW with AMSGrad as a SimpleOptimizer
//
//   device.rs   — DeviceTransfer: moves batches to the
//                 model's device
//
//   trainer.rs  — The Trainer: epoch loop, checkpoint save
//                 and resume
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Shi et al. (2016) An End-to-End Trainable Neural
//            Network for Image-based Sequence Recognition

/// CRNN architecture
pub mod model;

/// Connectionist Temporal Classification loss
pub mod loss;

/// AdamW + AMSGrad optimiser
pub mod optim;

/// Batch transfer to the training device
pub mod device;

/// Training loop, save_ckpt and resume_training
pub mod trainer;
