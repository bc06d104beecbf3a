// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The trainer reports through a TrainingLogger it receives at
// construction instead of a process-wide named logger. The
// production implementation lives in infra::logger; tests plug
// in a recorder and assert on the events.

use std::path::Path;

/// Snapshot of the running epoch, emitted once per batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchProgress {
    pub epoch:        usize,
    /// 1-based index of the batch that just finished.
    pub batch:        usize,
    pub num_batches:  usize,
    /// Loss of the batch that just finished.
    pub batch_loss:   f64,
    /// Mean loss over the batches seen so far in this epoch.
    pub running_loss: f64,
}

// ─── TrainingLogger ───────────────────────────────────────────────────────────
/// Sink for everything the training loop reports.
///
/// `batch_progress` is ephemeral (overwritten in place);
/// `epoch_end` and `checkpoint_saved` are durable.
pub trait TrainingLogger {
    /// Called before the first batch of an epoch.
    fn epoch_start(&mut self, _epoch: usize, _num_batches: usize) {}

    fn batch_progress(&mut self, progress: &BatchProgress);

    /// `mean_loss` is NaN when the epoch saw no batches.
    fn epoch_end(&mut self, epoch: usize, mean_loss: f64);

    fn checkpoint_saved(&mut self, path: &Path);
}
