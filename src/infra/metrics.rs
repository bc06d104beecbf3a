// ============================================================
// Layer 6 — Batch Meter
// ============================================================
// Running tracker for one scalar (the CTC loss) over an epoch.
// Updated once per batch, reset at the start of every epoch.
//
//   last  → value of the most recent batch
//   mean  → sum / count, NaN before the first update
//
// The NaN sentinel is what an epoch with zero batches reports.

/// Running last/mean tracker.
#[derive(Debug, Clone, Default)]
pub struct BatchMeter {
    count: usize,
    sum:   f64,
    last:  f64,
}

impl BatchMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, value: f64) {
        self.count += 1;
        self.sum   += value;
        self.last   = value;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn last(&self) -> f64 {
        self.last
    }

    pub fn mean(&self) -> f64 {
        if self.count > 0 { self.sum / self.count as f64 } else { f64::NAN }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_last() {
        let mut m = BatchMeter::new();
        m.update(2.0);
        m.update(4.0);
        assert_eq!(m.count(), 2);
        assert_eq!(m.last(), 4.0);
        assert!((m.mean() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_mean_is_nan() {
        assert!(BatchMeter::new().mean().is_nan());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut m = BatchMeter::new();
        m.update(1.5);
        m.reset();
        assert_eq!(m.count(), 0);
        assert!(m.mean().is_nan());
    }
}
