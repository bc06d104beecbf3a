// ============================================================
// Layer 6 — Training Logger (tracing + indicatif)
// ============================================================
// Production TrainingLogger:
//
//   batch_progress   → indicatif bar, redrawn in place
//   epoch_end        → tracing event, target "__TRAINING__"
//   checkpoint_saved → tracing event, target "__TRAINING__"
//
// The bar is cleared when its epoch ends so only the durable
// lines stay in the terminal scroll-back.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use crate::domain::traits::{BatchProgress, TrainingLogger};

pub const TRAINING_TARGET: &str = "__TRAINING__";

#[derive(Default)]
pub struct TracingLogger {
    bar:    Option<ProgressBar>,
    epochs: usize,
}

impl TracingLogger {
    /// `epochs` is only used for the "Epoch e/N" prefix.
    pub fn new(epochs: usize) -> Self {
        Self { bar: None, epochs }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl TrainingLogger for TracingLogger {
    fn epoch_start(&mut self, epoch: usize, num_batches: usize) {
        let bar = ProgressBar::new(num_batches as u64);
        bar.set_style(Self::style());
        bar.set_prefix(format!("Epoch {}/{}", epoch, self.epochs));
        self.bar = Some(bar);
    }

    fn batch_progress(&mut self, p: &BatchProgress) {
        if let Some(bar) = &self.bar {
            bar.set_position(p.batch as u64);
            bar.set_message(format!("loss={:.4} (avg {:.4})", p.batch_loss, p.running_loss));
        }
    }

    fn epoch_end(&mut self, epoch: usize, mean_loss: f64) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        tracing::info!(target: TRAINING_TARGET, "Epoch {:>3}/{} | loss={:.4}", epoch, self.epochs, mean_loss);
    }

    fn checkpoint_saved(&mut self, path: &Path) {
        tracing::info!(target: TRAINING_TARGET, "Checkpoint saved to '{}'", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_lives_for_one_epoch() {
        let mut log = TracingLogger::new(2);
        log.epoch_start(1, 3);
        log.batch_progress(&BatchProgress { epoch: 1, batch: 2, num_batches: 3, batch_loss: 1.5, running_loss: 1.25 });
        assert_eq!(log.bar.as_ref().map(|b| b.position()), Some(2));

        log.epoch_end(1, 1.25);
        assert!(log.bar.is_none());
    }

    #[test]
    fn test_progress_without_bar_is_ignored() {
        let mut log = TracingLogger::default();
        log.batch_progress(&BatchProgress { epoch: 1, batch: 1, num_batches: 1, batch_loss: 0.0, running_loss: 0.0 });
        log.epoch_end(1, f64::NAN);
        log.checkpoint_saved(Path::new("ckpt.mpk"));
    }
}
