use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig,
        BiLstm, BiLstmConfig,
        Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

/// How a conv stage downsamples its output.
#[derive(Clone, Copy, Debug)]
enum Pool {
    None,
    /// 2×2 window, stride 2 in both directions
    Square,
    /// 2×2 window, stride (2, 1), width padded by 1: halves height only
    Tall,
}

// (out_channels, kernel, padding, batch_norm, pool)
const CONV_STAGES: [(usize, usize, usize, bool, Pool); 7] = [
    (64,  3, 1, false, Pool::Square),
    (128, 3, 1, false, Pool::Square),
    (256, 3, 1, true,  Pool::None),
    (256, 3, 1, false, Pool::Tall),
    (512, 3, 1, true,  Pool::None),
    (512, 3, 1, false, Pool::Tall),
    (512, 2, 0, true,  Pool::None),
];

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct CrnnConfig {
    /// Charset size plus one for the CTC blank
    pub num_classes: usize,
    /// Input image channels (1 = grayscale)
    #[config(default = 1)]
    pub channels:    usize,
    /// Units per direction in each BiLSTM
    #[config(default = 256)]
    pub hidden_size: usize,
}

impl CrnnConfig {
    /// Build the conv stack stage by stage, then the recurrent head.
    /// Fresh modules start in training mode.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Crnn<B> {
        let mut in_channels = self.channels;
        let convs = CONV_STAGES
            .iter()
            .map(|&(out, kernel, padding, norm, pool)| {
                let block = ConvBlock::new(device, in_channels, out, kernel, padding, norm, pool);
                in_channels = out;
                block
            })
            .collect();

        let h = self.hidden_size;
        Crnn {
            convs,
            rnn1:       BiLstmConfig::new(in_channels, h, true).init(device),
            proj1:      LinearConfig::new(2 * h, h).init(device),
            rnn2:       BiLstmConfig::new(h, h, true).init(device),
            classifier: LinearConfig::new(2 * h, self.num_classes).init(device),
        }
    }
}

/// Number of time steps the model emits for an input of `width` pixels.
pub fn output_time_steps(width: usize) -> usize {
    width / 2 / 2 + 1
}

/// conv → (batch norm) → ReLU → (max pool)
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    /// Present on stages 3, 5 and 7
    norm: Option<BatchNorm<B>>,
    /// Absent on stages that keep their resolution
    pool: Option<MaxPool2d>,
}

impl<B: Backend> ConvBlock<B> {
    fn new(
        device:      &B::Device,
        in_channels: usize,
        out_channels: usize,
        kernel:      usize,
        padding:     usize,
        norm:        bool,
        pool:        Pool,
    ) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
            .with_padding(PaddingConfig2d::Explicit(padding, padding))
            .init(device);
        let norm = norm.then(|| BatchNormConfig::new(out_channels).init(device));
        let pool = match pool {
            Pool::None => None,
            Pool::Square => Some(MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init()),
            Pool::Tall => Some(
                MaxPool2dConfig::new([2, 2])
                    .with_strides([2, 1])
                    .with_padding(PaddingConfig2d::Explicit(0, 1))
                    .init(),
            ),
        };
        Self { conv, norm, pool }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = match &self.norm {
            Some(bn) => bn.forward(x),
            None => x,
        };
        let x = relu(x);
        match &self.pool {
            Some(pool) => pool.forward(x),
            None => x,
        }
    }
}

/// Convolutional-recurrent text-line recogniser.
///
/// images `[B, C, H, W]` → logits `[T, B, num_classes]`, where
/// `T = output_time_steps(W)`.
#[derive(Module, Debug)]
pub struct Crnn<B: Backend> {
    /// Seven VGG-style stages; height 32 collapses to 1
    pub convs:      Vec<ConvBlock<B>>,
    /// First bidirectional LSTM over the 512-d column features
    pub rnn1:       BiLstm<B>,
    /// Folds the two directions back to `hidden_size`
    pub proj1:      Linear<B>,
    pub rnn2:       BiLstm<B>,
    /// Per-step class scores, blank included
    pub classifier: Linear<B>,
}

impl<B: Backend> Crnn<B> {
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 3> {
        // Step 1: conv stack, [B, C, H, W] → [B, 512, H', T]
        let mut x = images;
        for block in &self.convs {
            x = block.forward(x);
        }

        // Step 2: column features. Heights above 32 leave more than one
        // row; average them out.
        let [batch, channels, _, steps] = x.dims();
        let features = x
            .mean_dim(2)
            .reshape([batch, channels, steps])
            .swap_dims(1, 2); // [B, T, 512]

        // Step 3: recurrent head
        let (seq, _) = self.rnn1.forward(features, None);
        let seq = self.proj1.forward(seq);
        let (seq, _) = self.rnn2.forward(seq, None);
        let logits = self.classifier.forward(seq); // [B, T, C]

        logits.swap_dims(0, 1)
    }
}
