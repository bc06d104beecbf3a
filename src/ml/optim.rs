// ============================================================
// Layer 5 — AdamW with AMSGrad
// ============================================================
// Burn's AdamW has no AMSGrad variant, so the update rule is
// implemented here as a SimpleOptimizer and wrapped in Burn's
// OptimizerAdaptor (which handles parameter ids, records and
// device moves).
//
// Per parameter θ with gradient g at step t:
//
//   θ  = θ · (1 - lr·λ)                    (decoupled weight decay)
//   m  = β1·m + (1-β1)·g
//   v  = β2·v + (1-β2)·g²
//   v̂  = max(v̂, v)                          (AMSGrad)
//   θ  = θ - lr/(1-β1ᵗ) · m / (√v̂ / √(1-β2ᵗ) + ε)
//
// Reference: Loshchilov & Hutter (2019) Decoupled Weight Decay
//            Reddi et al. (2018) On the Convergence of Adam and Beyond

use burn::{
    module::AutodiffModule,
    optim::{adaptor::OptimizerAdaptor, LearningRate, SimpleOptimizer},
    prelude::*,
    record::Record,
    tensor::backend::AutodiffBackend,
};

#[derive(Config, Debug)]
pub struct AdamWAmsgradConfig {
    #[config(default = 0.9)]
    pub beta_1:       f32,
    #[config(default = 0.999)]
    pub beta_2:       f32,
    #[config(default = 1e-8)]
    pub epsilon:      f32,
    #[config(default = 1e-2)]
    pub weight_decay: f32,
    /// Divide by the running maximum of the second moment
    #[config(default = true)]
    pub amsgrad:      bool,
}

impl AdamWAmsgradConfig {
    pub fn init<B: AutodiffBackend, M: AutodiffModule<B>>(
        &self,
    ) -> OptimizerAdaptor<AdamWAmsgrad, M, B> {
        OptimizerAdaptor::from(self.build())
    }

    /// The bare update rule, without the module adaptor.
    pub fn build(&self) -> AdamWAmsgrad {
        AdamWAmsgrad {
            beta_1:       self.beta_1,
            beta_2:       self.beta_2,
            epsilon:      self.epsilon,
            weight_decay: self.weight_decay,
            amsgrad:      self.amsgrad,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AdamWAmsgrad {
    beta_1:       f32,
    beta_2:       f32,
    epsilon:      f32,
    weight_decay: f32,
    amsgrad:      bool,
}

/// Per-parameter optimizer state, persisted in checkpoints.
#[derive(Record, Clone)]
pub struct AmsgradState<B: Backend, const D: usize> {
    pub time:         usize,
    pub moment_1:     Tensor<B, D>,
    pub moment_2:     Tensor<B, D>,
    pub max_moment_2: Tensor<B, D>,
}

impl<B: Backend> SimpleOptimizer<B> for AdamWAmsgrad {
    type State<const D: usize> = AmsgradState<B, D>;

    fn step<const D: usize>(
        &self,
        lr:     LearningRate,
        tensor: Tensor<B, D>,
        grad:   Tensor<B, D>,
        state:  Option<Self::State<D>>,
    ) -> (Tensor<B, D>, Option<Self::State<D>>) {
        let (b1, b2) = (self.beta_1 as f64, self.beta_2 as f64);
        let grad_sq = grad.clone().powf_scalar(2.0);

        let state = match state {
            Some(prev) => {
                let moment_1 = prev.moment_1.mul_scalar(b1).add(grad.mul_scalar(1.0 - b1));
                let moment_2 = prev.moment_2.mul_scalar(b2).add(grad_sq.mul_scalar(1.0 - b2));
                let max_moment_2 = prev.max_moment_2.max_pair(moment_2.clone());
                AmsgradState { time: prev.time + 1, moment_1, moment_2, max_moment_2 }
            }
            None => {
                let moment_1 = grad.mul_scalar(1.0 - b1);
                let moment_2 = grad_sq.mul_scalar(1.0 - b2);
                AmsgradState { time: 1, moment_1, max_moment_2: moment_2.clone(), moment_2 }
            }
        };

        let t = state.time as i32;
        let bias_1 = 1.0 - b1.powi(t);
        let bias_2 = 1.0 - b2.powi(t);

        let second = if self.amsgrad { state.max_moment_2.clone() } else { state.moment_2.clone() };
        let denom = second
            .sqrt()
            .div_scalar(bias_2.sqrt())
            .add_scalar(self.epsilon as f64);
        let update = state.moment_1.clone().div(denom).mul_scalar(lr / bias_1);

        let decayed = tensor.mul_scalar(1.0 - lr * self.weight_decay as f64);
        (decayed.sub(update), Some(state))
    }

    fn to_device<const D: usize>(mut state: Self::State<D>, device: &B::Device) -> Self::State<D> {
        state.moment_1     = state.moment_1.to_device(device);
        state.moment_2     = state.moment_2.to_device(device);
        state.max_moment_2 = state.max_moment_2.to_device(device);
        state
    }
}
