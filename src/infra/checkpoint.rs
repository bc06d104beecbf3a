// ============================================================
// Layer 6 — Checkpoint Record
// ============================================================
// One file per checkpoint, holding exactly four fields:
//
//   model      → CRNN parameters
//   optimizer  → AdamW/AMSGrad state for every parameter
//   best_acc   → best evaluation accuracy seen so far
//   epoch      → last completed epoch
//
// The record is serialised with Burn's named MessagePack
// recorder at full precision and written to exactly the path
// given (no extension is appended). Save and load share this
// one record type, so the field names cannot drift apart.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    optim::Optimizer,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Record, Recorder},
    tensor::backend::AutodiffBackend,
};
use std::{fs, path::Path};

use crate::ml::{
    model::{Crnn, CrnnRecord},
    trainer::CrnnOptimizer,
};

pub type OptimizerRecord<B> = <CrnnOptimizer<B> as Optimizer<Crnn<B>, B>>::Record;

type CheckpointRecorder = NamedMpkBytesRecorder<FullPrecisionSettings>;

#[derive(Record)]
pub struct CheckpointRecord<B>
where
    B: AutodiffBackend,
{
    pub model:     CrnnRecord<B>,
    pub optimizer: OptimizerRecord<B>,
    pub best_acc:  f64,
    pub epoch:     usize,
}

/// Serialise `record` to `path`, creating parent directories and
/// replacing any existing file.
pub fn save_checkpoint<B: AutodiffBackend>(record: CheckpointRecord<B>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", parent.display()))?;
    }

    let epoch = record.epoch;
    let bytes = Recorder::<B>::record(&CheckpointRecorder::default(), record, ())
        .with_context(|| format!("Failed to serialise checkpoint for '{}'", path.display()))?;

    fs::write(path, bytes)
        .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

    tracing::debug!("Saved checkpoint: epoch {} → '{}'", epoch, path.display());
    Ok(())
}

/// Read a checkpoint written by `save_checkpoint`. A file missing
/// any of the four fields fails here with the field named.
pub fn load_checkpoint<B: AutodiffBackend>(path: &Path, device: &B::Device) -> Result<CheckpointRecord<B>> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read checkpoint '{}'", path.display()))?;

    Recorder::<B>::load(&CheckpointRecorder::default(), bytes, device)
        .with_context(|| format!("Cannot decode checkpoint '{}'", path.display()))
}
