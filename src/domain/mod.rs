// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types shared by every other layer:
//
//   sample.rs  — corpus modes and the labelled text-line sample
//   charset.rs — character ↔ class-index mapping (index 0 is the CTC blank)
//   traits.rs  — the TrainingLogger abstraction injected into the trainer
//
// Nothing in here touches Burn, the filesystem or the terminal.

pub mod charset;

pub mod sample;

pub mod traits;
