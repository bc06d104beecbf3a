// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Wires one training run together, in order:
//
//   Step 1: Pick the backend from the device setting   (Layer 6 - infra)
//   Step 2: Build the trainer (loads both corpus views) (Layer 5 - ml)
//   Step 3: Optionally resume from a checkpoint         (Layer 6 - infra)
//   Step 4: Run the epoch loop                          (Layer 5 - ml)
//   Step 5: Optionally save a checkpoint + config JSON  (Layer 6 - infra)
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    data::dataset::Dataset,
    module::Module,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::infra::{
    checkpoint::load_checkpoint,
    logger::TracingLogger,
    settings::{DatasetSettings, DeviceKind, Settings},
};
use crate::ml::trainer::Trainer;

type CpuBackend = Autodiff<NdArray>;
type GpuBackend = Autodiff<Wgpu>;

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything one run needs, after CLI overrides have been merged
// into the settings file. Saved next to the checkpoint as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub epochs:       usize,
    pub batch_size:   usize,
    pub shuffle:      bool,
    pub num_workers:  usize,
    pub pin_memory:   bool,
    pub device:       DeviceKind,
    pub lr:           f64,
    pub weight_decay: f64,
    /// Shuffle seed; a random one is drawn when absent
    pub seed:         Option<u64>,
    pub dataset:      DatasetSettings,
}

impl From<&Settings> for TrainConfig {
    fn from(s: &Settings) -> Self {
        let loader = &s.train.loader;
        TrainConfig {
            epochs:       loader.epochs,
            batch_size:   loader.batch_size,
            shuffle:      loader.shuffle,
            num_workers:  loader.num_workers,
            pin_memory:   loader.use_shared_memory,
            device:       s.global.device,
            lr:           s.optimizer.lr,
            weight_decay: s.optimizer.weight_decay,
            seed:         s.global.seed,
            dataset:      s.dataset.clone(),
        }
    }
}

/// Checkpoint paths for one run.
#[derive(Debug, Clone, Default)]
pub struct CheckpointOptions {
    pub resume:    Option<PathBuf>,
    pub save_ckpt: Option<PathBuf>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config:  TrainConfig,
    options: CheckpointOptions,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig, options: CheckpointOptions) -> Self {
        Self { config, options }
    }

    /// Execute the full run on the configured backend.
    /// Returns the last completed epoch.
    pub fn execute(&self) -> Result<Option<usize>> {
        match self.config.device {
            DeviceKind::Cpu => self.run::<CpuBackend>(NdArrayDevice::Cpu),
            DeviceKind::Gpu(None) => self.run::<GpuBackend>(WgpuDevice::DefaultDevice),
            DeviceKind::Gpu(Some(i)) => self.run::<GpuBackend>(WgpuDevice::DiscreteGpu(i)),
        }
    }

    fn run<B: AutodiffBackend>(&self, device: B::Device) -> Result<Option<usize>> {
        let cfg = &self.config;
        tracing::info!("Using {} device: {:?}", cfg.device, device);

        // ── Step 2: Trainer ───────────────────────────────────────────────────
        let logger = Box::new(TracingLogger::new(cfg.epochs));
        let mut trainer = Trainer::<B>::new(cfg.clone(), device.clone(), logger)?;
        tracing::info!(
            "Trainer ready: {} parameters, {} batches per epoch, {} eval samples held",
            trainer.model().num_params(),
            trainer.num_batches(),
            trainer.eval_dataset().len()
        );

        // ── Step 3: Resume ────────────────────────────────────────────────────
        if let Some(path) = &self.options.resume {
            let ckpt = load_checkpoint::<B>(path, &device)?;
            trainer.start_epoch = trainer.resume_training(ckpt);
            tracing::info!(
                "Resumed from '{}': starting at epoch {} (best_acc={:.4})",
                path.display(),
                trainer.start_epoch,
                trainer.best_acc
            );
        }

        // ── Step 4: Train ─────────────────────────────────────────────────────
        let last = trainer.train();

        // ── Step 5: Save ──────────────────────────────────────────────────────
        if let Some(path) = &self.options.save_ckpt {
            match last {
                Some(epoch) => {
                    let best_acc = trainer.best_acc;
                    trainer.save_ckpt(path, best_acc, epoch)?;
                    save_config(cfg, path)?;
                }
                None => tracing::warn!(
                    "No epoch ran (start {} ≥ epochs {}); '{}' not written",
                    trainer.start_epoch,
                    trainer.config().epochs,
                    path.display()
                ),
            }
        }

        tracing::info!("Training complete!");
        Ok(last)
    }
}

/// Write `train_config.json` beside the checkpoint file.
pub fn save_config(cfg: &TrainConfig, ckpt_path: &Path) -> Result<PathBuf> {
    let path = ckpt_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("train_config.json");

    let json = serde_json::to_string_pretty(cfg)?;
    fs::write(&path, json)
        .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

    tracing::debug!("Saved training config to '{}'", path.display());
    Ok(path)
}
