// ============================================================
// Layer 5 — CTC Loss
// ============================================================
// Connectionist Temporal Classification over log-probabilities
// shaped [T, B, C]. Targets arrive concatenated, exactly as the
// batcher produces them.
//
// Forward algorithm in log space, batched over samples:
//
//   extended label  l' = blank, y1, blank, y2, ..., yS, blank   (|l'| = 2S+1)
//
//   α₀(0) = y[0, blank]          α₀(1) = y[0, y1]
//   αₜ(s) = logsumexp(αₜ₋₁(s), αₜ₋₁(s-1), αₜ₋₁(s-2)·skip(s)) + y[t, l'(s)]
//
//   skip(s) holds only when l'(s) is a label that differs from l'(s-2).
//
//   -log p(y|x) = -logsumexp(α_{T'-1}(2S), α_{T'-1}(2S-1))
//
// Every step is built from burn tensor ops, so autodiff
// supplies the gradient. Masks and gather indices are built on
// the host from the (small) integer targets.
//
// Reference: Graves et al. (2006) Connectionist Temporal Classification

use burn::{
    nn::loss::Reduction,
    prelude::*,
};

/// Stand-in for log(0). Finite so masked arithmetic never yields NaN.
const NEG: f32 = -1.0e30;

/// Per-sample losses at or above this are infeasible alignments.
pub const INFEASIBLE: f32 = 1.0e29;

#[derive(Config, Debug)]
pub struct CtcLossConfig {
    #[config(default = 0)]
    pub blank: usize,
    /// Replace the loss of infeasible samples (and their gradients) with zero
    #[config(default = false)]
    pub zero_infinity: bool,
}

impl CtcLossConfig {
    pub fn init(&self) -> CtcLoss {
        CtcLoss {
            blank:         self.blank,
            zero_infinity: self.zero_infinity,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CtcLoss {
    pub blank:         usize,
    pub zero_infinity: bool,
}

impl CtcLoss {
    /// Reduced loss, shape `[1]`.
    ///
    /// `Mean` (and `Auto`) divides each sample's loss by its target
    /// length, then averages over the batch. `Sum` adds the raw losses.
    pub fn forward<B: Backend>(
        &self,
        log_probs:      Tensor<B, 3>,
        targets:        Tensor<B, 1, Int>,
        input_lengths:  &[usize],
        target_lengths: Tensor<B, 1, Int>,
        reduction:      Reduction,
    ) -> Tensor<B, 1> {
        let lengths = to_usize(target_lengths);
        let device  = log_probs.device();
        let losses  = self.forward_no_reduction(log_probs, targets, input_lengths, &lengths);

        match reduction {
            Reduction::Sum => losses.sum(),
            Reduction::Mean | Reduction::Auto => {
                let divisors: Vec<f32> = lengths.iter().map(|&l| l.max(1) as f32).collect();
                let divisors = Tensor::<B, 1>::from_floats(divisors.as_slice(), &device);
                (losses / divisors).mean()
            }
        }
    }

    /// Per-sample negative log-likelihood, shape `[B]`.
    pub fn forward_no_reduction<B: Backend>(
        &self,
        log_probs:      Tensor<B, 3>,
        targets:        Tensor<B, 1, Int>,
        input_lengths:  &[usize],
        target_lengths: &[usize],
    ) -> Tensor<B, 1> {
        let [steps, batch, _] = log_probs.dims();
        let device  = log_probs.device();
        let targets = to_usize(targets);

        let ext = ExtendedTargets::build(&targets, target_lengths, batch, self.blank);
        let l   = ext.len;

        // Emissions along each extended label: [B, T, L]
        let mut index = Vec::with_capacity(batch * steps * l);
        for b in 0..batch {
            for _ in 0..steps {
                index.extend(ext.labels[b * l..(b + 1) * l].iter().map(|&c| c as i64));
            }
        }
        let index = Tensor::<B, 1, Int>::from_ints(index.as_slice(), &device)
            .reshape([batch, steps, l]);
        let emissions = log_probs.swap_dims(0, 1).gather(2, index);

        let host = |v: &[f32]| Tensor::<B, 1>::from_floats(v, &device).reshape([batch, l]);
        let skip     = host(&ext.skip);
        let init     = host(&ext.init);
        let end_mask = host(&ext.end);

        let emit_at = |t: usize| {
            emissions.clone().slice([0..batch, t..t + 1, 0..l]).reshape([batch, l])
        };

        let mut alpha = emit_at(0) + init;
        let pad1 = Tensor::<B, 2>::full([batch, 1], NEG, &device);
        let pad2 = Tensor::<B, 2>::full([batch, 2], NEG, &device);

        for t in 1..steps {
            let stay   = alpha.clone();
            let step   = Tensor::cat(vec![pad1.clone(), alpha.clone().slice([0..batch, 0..l - 1])], 1);
            let jump   = Tensor::cat(vec![pad2.clone(), alpha.clone().slice([0..batch, 0..l - 2])], 1)
                + skip.clone();
            let next   = logsumexp3(stay, step, jump) + emit_at(t);

            // Samples shorter than T keep their final alpha.
            let keep: Vec<f32> = (0..batch)
                .map(|b| if t < input_lengths[b].min(steps) { 1.0 } else { 0.0 })
                .collect();
            let keep = Tensor::<B, 1>::from_floats(keep.as_slice(), &device).reshape([batch, 1]);
            alpha = next * keep.clone() + alpha * (keep.neg() + 1.0);
        }

        let last = alpha + end_mask;
        let max  = last.clone().max_dim(1).detach();
        let ll   = max.clone() + (last - max).exp().sum_dim(1).log();
        let losses = ll.neg().reshape([batch]);

        if !self.zero_infinity {
            return losses;
        }
        let finite: Vec<f32> = losses
            .clone()
            .into_data()
            .iter::<f32>()
            .map(|v| if v >= INFEASIBLE { 0.0 } else { 1.0 })
            .collect();
        losses * Tensor::<B, 1>::from_floats(finite.as_slice(), &device)
    }
}

/// Host-side extended labels and the masks derived from them, each
/// laid out `[B, L]` row-major.
struct ExtendedTargets {
    len:    usize,
    labels: Vec<usize>,
    /// 0 where the s-2 transition is allowed, NEG elsewhere
    skip:   Vec<f32>,
    /// 0 on the two admissible start positions
    init:   Vec<f32>,
    /// 0 on the two admissible end positions
    end:    Vec<f32>,
}

impl ExtendedTargets {
    fn build(targets: &[usize], lengths: &[usize], batch: usize, blank: usize) -> Self {
        // L ≥ 3 keeps the shifted slices non-empty even for empty targets.
        let s_max = lengths.iter().copied().max().unwrap_or(0).max(1);
        let len   = 2 * s_max + 1;

        let mut labels = vec![blank; batch * len];
        let mut skip   = vec![NEG; batch * len];
        let mut init   = vec![NEG; batch * len];
        let mut end    = vec![NEG; batch * len];

        let mut offset = 0;
        for b in 0..batch {
            let s   = lengths[b];
            let row = b * len;
            let seq = &targets[offset..offset + s];

            for (j, &c) in seq.iter().enumerate() {
                labels[row + 2 * j + 1] = c;
                if j > 0 && seq[j - 1] != c {
                    skip[row + 2 * j + 1] = 0.0;
                }
            }

            init[row] = 0.0;
            end[row + 2 * s] = 0.0;
            if s > 0 {
                init[row + 1] = 0.0;
                end[row + 2 * s - 1] = 0.0;
            }
            offset += s;
        }

        Self { len, labels, skip, init, end }
    }
}

fn logsumexp3<B: Backend>(a: Tensor<B, 2>, b: Tensor<B, 2>, c: Tensor<B, 2>) -> Tensor<B, 2> {
    let max = a.clone().max_pair(b.clone()).max_pair(c.clone()).detach();
    let sum = (a - max.clone()).exp() + (b - max.clone()).exp() + (c - max.clone()).exp();
    max + sum.log()
}

fn to_usize<B: Backend>(t: Tensor<B, 1, Int>) -> Vec<usize> {
    t.into_data().iter::<i64>().map(|v| v.max(0) as usize).collect()
}
