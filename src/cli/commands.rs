// ============================================================
// Layer 1 — CLI Arguments
// ============================================================
// Every training flag is optional: when absent, the value from
// the YAML config file is used. Flag names keep the snake_case
// spelling of the config keys (--batch_size, --num_workers, ...).
//
// clap's derive macros generate help text, error messages for
// malformed values, and type conversion (string → usize, f64,
// DeviceKind, ...).

use clap::Args;
use std::path::PathBuf;

use crate::application::train_use_case::CheckpointOptions;
use crate::infra::settings::{DeviceKind, Settings};

/// Overrides for the training section of the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct TrainArgs {
    /// Number of epochs (exclusive upper bound of the epoch loop)
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Samples per batch
    #[arg(long = "batch_size")]
    pub batch_size: Option<usize>,

    /// Shuffle the training set every epoch
    #[arg(long)]
    pub shuffle: Option<bool>,

    /// Prefetch worker threads (0 = load on the training thread)
    #[arg(long = "num_workers")]
    pub num_workers: Option<usize>,

    /// Pin host memory for device transfer (hint only)
    #[arg(long = "pin_memory")]
    pub pin_memory: Option<bool>,

    /// cpu, gpu, wgpu, cuda or cuda:N
    #[arg(long)]
    pub device: Option<DeviceKind>,

    /// Learning rate
    #[arg(long)]
    pub lr: Option<f64>,

    /// Root of the ICDAR15 word-recognition corpus
    #[arg(long = "data_root")]
    pub data_root: Option<String>,

    /// Seed for batch shuffling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Checkpoint to resume from
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Where to write a checkpoint after the last epoch
    #[arg(long = "save_ckpt")]
    pub save_ckpt: Option<PathBuf>,
}

impl TrainArgs {
    /// Overwrite the settings fields for which a flag was given.
    pub fn apply(&self, s: &mut Settings) {
        let loader = &mut s.train.loader;
        if let Some(v) = self.epochs      { loader.epochs = v; }
        if let Some(v) = self.batch_size  { loader.batch_size = v; }
        if let Some(v) = self.shuffle     { loader.shuffle = v; }
        if let Some(v) = self.num_workers { loader.num_workers = v; }
        if let Some(v) = self.pin_memory  { loader.use_shared_memory = v; }
        if let Some(v) = self.device      { s.global.device = v; }
        if let Some(v) = self.lr          { s.optimizer.lr = v; }
        if let Some(v) = self.seed        { s.global.seed = Some(v); }
        if let Some(v) = &self.data_root  { s.dataset.root = v.clone(); }
    }

    pub fn checkpoint_options(&self) -> CheckpointOptions {
        CheckpointOptions {
            resume:    self.resume.clone(),
            save_ckpt: self.save_ckpt.clone(),
        }
    }
}
