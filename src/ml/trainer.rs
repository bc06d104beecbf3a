// ============================================================
// Layer 5 — Training Loop
// ============================================================
// The Trainer owns everything one optimisation run needs:
//
//   model        Crnn<B> on the configured device
//   optimizer    AdamW + AMSGrad (OptimizerAdaptor)
//   loss         CTC, blank = 0, mean reduction, infeasible
//                alignments zeroed
//   train loader Burn DataLoader over the Train view
//   eval view    built and held; the loop never iterates it
//   logger       injected TrainingLogger
//
// One step:
//   batch → device → forward [T, B, C] → log_softmax(dim 2)
//         → CTC(log_probs, labels, [T; B], label_lengths)
//         → backward → GradientsParams → optimizer.step
//
// Burn builds a fresh gradient set on every backward pass, so
// there is nothing to zero between steps.
//
// Reference: Burn Book §5, Graves et al. (2006) CTC

use anyhow::{ensure, Context, Result};
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    module::Module,
    nn::loss::Reduction,
    optim::{adaptor::OptimizerAdaptor, GradientsParams, Optimizer},
    prelude::*,
    tensor::{activation::log_softmax, backend::AutodiffBackend},
};
use std::{path::Path, sync::Arc};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{TextLineBatch, TextLineBatcher},
    dataset::Icdar15Dataset,
};
use crate::domain::{
    charset::Charset,
    sample::CorpusMode,
    traits::{BatchProgress, TrainingLogger},
};
use crate::infra::{
    checkpoint::{save_checkpoint, CheckpointRecord},
    metrics::BatchMeter,
};
use crate::ml::{
    device::{BackendTransfer, DeviceTransfer},
    loss::{CtcLoss, CtcLossConfig},
    model::{output_time_steps, Crnn, CrnnConfig},
    optim::{AdamWAmsgrad, AdamWAmsgradConfig},
};

pub type CrnnOptimizer<B> = OptimizerAdaptor<AdamWAmsgrad, Crnn<B>, B>;

/// Every sample in a batch uses all `steps` model outputs.
pub fn input_lengths(batch_size: usize, steps: usize) -> Vec<usize> {
    vec![steps; batch_size]
}

pub struct Trainer<B: AutodiffBackend> {
    model:        Crnn<B>,
    optimizer:    CrnnOptimizer<B>,
    loss:         CtcLoss,
    /// Collates on the backend's default device
    train_loader: Arc<dyn DataLoader<B, TextLineBatch<B>>>,
    /// Batches per epoch, the last one possibly short
    num_batches:  usize,
    /// Held for an evaluation pass; never iterated by `train`
    eval_dataset: Icdar15Dataset,
    config:       TrainConfig,
    /// Moves each batch to the model's device
    transfer:     BackendTransfer<B>,
    logger:       Box<dyn TrainingLogger>,
    /// First epoch `train` runs
    pub start_epoch: usize,
    pub best_acc:    f64,
}

impl<B: AutodiffBackend> Trainer<B> {
    /// Load both ICDAR15 views from `config.dataset.root` and build the trainer.
    pub fn new(config: TrainConfig, device: B::Device, logger: Box<dyn TrainingLogger>) -> Result<Self> {
        let charset = config.dataset.charset()?;
        let shape   = config.dataset.shape();
        let root    = Path::new(&config.dataset.root);
        let steps   = output_time_steps(shape.width);

        let train = Icdar15Dataset::load(root, CorpusMode::Train, &charset, shape, steps)
            .context("Failed to load the training view")?;
        let eval  = Icdar15Dataset::load(root, CorpusMode::Eval, &charset, shape, steps)
            .context("Failed to load the evaluation view")?;

        Self::from_datasets(config, train, eval, device, logger)
    }

    /// Build the trainer around views that are already in memory.
    pub fn from_datasets(
        config:       TrainConfig,
        train:        Icdar15Dataset,
        eval_dataset: Icdar15Dataset,
        device:       B::Device,
        logger:       Box<dyn TrainingLogger>,
    ) -> Result<Self> {
        let num_classes = config.dataset.charset()?.num_classes();
        let shape       = config.dataset.shape();

        ensure!(train.mode() == CorpusMode::Train, "Training view was built in {} mode", train.mode());
        ensure!(
            eval_dataset.mode() == CorpusMode::Eval,
            "Evaluation view was built in {} mode",
            eval_dataset.mode()
        );
        for view in [&train, &eval_dataset] {
            ensure!(
                view.shape() == shape,
                "{} view images are {:?}, configuration expects {:?}",
                view.mode(),
                view.shape(),
                shape
            );
        }

        // ── Model ─────────────────────────────────────────────────────────────
        let model: Crnn<B> = CrnnConfig::new(num_classes)
            .with_channels(shape.channels)
            .init(&device);
        tracing::info!("Model ready: CRNN, {} classes", num_classes);

        // ── Optimiser and loss ────────────────────────────────────────────────
        let optimizer = AdamWAmsgradConfig::new()
            .with_weight_decay(config.weight_decay as f32)
            .with_amsgrad(true)
            .init();
        let loss = CtcLossConfig::new()
            .with_blank(Charset::BLANK as usize)
            .with_zero_infinity(true)
            .init();

        // ── Training data loader ──────────────────────────────────────────────
        let num_batches = train.len().div_ceil(config.batch_size);
        let batcher = TextLineBatcher::new(shape);
        let mut builder = DataLoaderBuilder::new(batcher).batch_size(config.batch_size);
        if config.shuffle {
            let seed = config.seed.unwrap_or_else(rand::random);
            tracing::debug!("Shuffling training batches with seed {}", seed);
            builder = builder.shuffle(seed);
        }
        if config.num_workers > 0 {
            builder = builder.num_workers(config.num_workers);
        }
        tracing::info!(
            "Train: {} samples in {} batches | Eval: {} samples (held)",
            train.len(),
            num_batches,
            eval_dataset.len()
        );
        let train_loader = builder.build(train);

        let transfer = BackendTransfer::new(device, config.pin_memory);

        Ok(Self {
            model,
            optimizer,
            loss,
            train_loader,
            num_batches,
            eval_dataset,
            config,
            transfer,
            logger,
            start_epoch: 1,
            best_acc:    0.0,
        })
    }

    pub fn model(&self) -> &Crnn<B> { &self.model }

    pub fn config(&self) -> &TrainConfig { &self.config }

    pub fn eval_dataset(&self) -> &Icdar15Dataset { &self.eval_dataset }

    pub fn num_batches(&self) -> usize { self.num_batches }

    /// Run epochs `start_epoch..epochs`. The upper bound is exclusive,
    /// so `epochs = 3` from a fresh start trains epochs 1 and 2.
    ///
    /// Returns the last completed epoch, or `None` when the range is empty.
    pub fn train(&mut self) -> Option<usize> {
        let loader = Arc::clone(&self.train_loader);
        let mut meter = BatchMeter::new();
        let mut last  = None;

        for epoch in self.start_epoch..self.config.epochs {
            meter.reset();
            self.logger.epoch_start(epoch, self.num_batches);

            for (index, batch) in loader.iter().enumerate() {
                let loss = self.step(batch);
                meter.update(loss);

                self.logger.batch_progress(&BatchProgress {
                    epoch,
                    batch:        index + 1,
                    num_batches:  self.num_batches,
                    batch_loss:   meter.last(),
                    running_loss: meter.mean(),
                });
            }

            if meter.count() != self.num_batches {
                tracing::warn!(
                    "Epoch {} ran {} batches, expected {}",
                    epoch,
                    meter.count(),
                    self.num_batches
                );
            }

            self.logger.epoch_end(epoch, meter.mean());
            last = Some(epoch);
        }

        last
    }

    /// One forward/backward/update pass. Returns the scalar loss.
    fn step(&mut self, batch: TextLineBatch<B>) -> f64 {
        let batch  = self.transfer.transfer_to_device(batch);
        let n      = batch.batch_size();
        let logits = self.model.forward(batch.images);
        let steps  = logits.dims()[0];

        let log_probs     = log_softmax(logits, 2);
        let label_lengths = batch.label_lengths.reshape([n]);
        let loss = self.loss.forward(
            log_probs,
            batch.labels,
            &input_lengths(n, steps),
            label_lengths,
            Reduction::Mean,
        );
        let value: f64 = loss.clone().into_scalar().elem::<f64>();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optimizer.step(self.config.lr, self.model.clone(), grads);

        value
    }

    /// Write `{model, optimizer, best_acc, epoch}` to exactly `path`.
    pub fn save_ckpt(&mut self, path: &Path, best_acc: f64, epoch: usize) -> Result<()> {
        let record = CheckpointRecord {
            model:     self.model.clone().into_record(),
            optimizer: self.optimizer.to_record(),
            best_acc,
            epoch,
        };
        save_checkpoint(record, path)?;
        self.logger.checkpoint_saved(path);
        Ok(())
    }

    /// Restore model and optimizer state. Returns the epoch to resume
    /// from (`saved epoch + 1`); the caller decides whether to apply it.
    pub fn resume_training(&mut self, ckpt: CheckpointRecord<B>) -> usize {
        self.best_acc = ckpt.best_acc;
        let start_epoch = ckpt.epoch + 1;

        self.optimizer = self.optimizer.clone().load_record(ckpt.optimizer);
        self.model     = self.model.clone().load_record(ckpt.model);

        start_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::ImageShape;
    use crate::infra::{checkpoint::load_checkpoint, settings::{DatasetSettings, DeviceKind}};
    use burn::{
        backend::{Autodiff, NdArray},
        data::dataloader::batcher::Batcher,
    };
    use image::{DynamicImage, GrayImage, Luma};
    use std::{
        path::PathBuf,
        sync::Mutex,
    };

    type TestBackend = Autodiff<NdArray>;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Batch(usize, usize),
        EpochEnd(usize, f64),
        Saved(PathBuf),
    }

    #[derive(Clone, Default)]
    struct RecordingLogger {
        events: Arc<Mutex<Vec<Event>>>,
    }

    impl RecordingLogger {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn epoch_ends(&self) -> Vec<usize> {
            self.events()
                .into_iter()
                .filter_map(|e| match e { Event::EpochEnd(epoch, _) => Some(epoch), _ => None })
                .collect()
        }
    }

    impl TrainingLogger for RecordingLogger {
        fn batch_progress(&mut self, p: &BatchProgress) {
            self.events.lock().unwrap().push(Event::Batch(p.epoch, p.batch));
        }

        fn epoch_end(&mut self, epoch: usize, mean_loss: f64) {
            self.events.lock().unwrap().push(Event::EpochEnd(epoch, mean_loss));
        }

        fn checkpoint_saved(&mut self, path: &Path) {
            self.events.lock().unwrap().push(Event::Saved(path.to_path_buf()));
        }
    }

    const SHAPE: ImageShape = ImageShape { channels: 1, height: 32, width: 16 };

    fn config(epochs: usize) -> TrainConfig {
        TrainConfig {
            epochs,
            batch_size:   2,
            shuffle:      true,
            num_workers:  0,
            pin_memory:   false,
            device:       DeviceKind::Cpu,
            lr:           1e-3,
            weight_decay: 1e-2,
            seed:         Some(42),
            dataset: DatasetSettings {
                root:         "unused".to_string(),
                charset:      "abc".to_string(),
                lowercase:    true,
                image_height: SHAPE.height,
                image_width:  SHAPE.width,
                channels:     SHAPE.channels,
            },
        }
    }

    fn view(mode: CorpusMode, labels: &[&[u32]]) -> Icdar15Dataset {
        let samples = labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let img = GrayImage::from_fn(16, 32, |x, y| Luma([((x * 13 + y * 7 + i as u32 * 31) % 256) as u8]));
                (DynamicImage::ImageLuma8(img), label.to_vec())
            })
            .collect();
        Icdar15Dataset::from_samples(mode, SHAPE, samples)
    }

    fn trainer(epochs: usize, train: &[&[u32]], logger: &RecordingLogger) -> Trainer<TestBackend> {
        Trainer::from_datasets(
            config(epochs),
            view(CorpusMode::Train, train),
            view(CorpusMode::Eval, &[&[1]]),
            Default::default(),
            Box::new(logger.clone()),
        )
        .unwrap()
    }

    #[test]
    fn test_input_lengths_are_constant() {
        assert_eq!(input_lengths(3, 26), vec![26, 26, 26]);
        assert!(input_lengths(0, 26).is_empty());
    }

    #[test]
    fn test_epoch_upper_bound_is_exclusive() {
        let logger = RecordingLogger::default();
        let mut t  = trainer(3, &[&[1, 2], &[3], &[2, 1]], &logger);

        assert_eq!(t.num_batches(), 2);
        assert_eq!(t.train(), Some(2));
        assert_eq!(logger.epoch_ends(), vec![1, 2]);

        let batches: Vec<Event> = logger
            .events()
            .into_iter()
            .filter(|e| matches!(e, Event::Batch(..)))
            .collect();
        assert_eq!(
            batches,
            vec![Event::Batch(1, 1), Event::Batch(1, 2), Event::Batch(2, 1), Event::Batch(2, 2)]
        );

        for event in logger.events() {
            if let Event::EpochEnd(_, loss) = event {
                assert!(loss.is_finite() && loss > 0.0);
            }
        }
    }

    #[test]
    fn test_empty_range_runs_nothing() {
        let logger = RecordingLogger::default();
        let mut t  = trainer(3, &[&[1]], &logger);
        t.start_epoch = 3;

        assert_eq!(t.train(), None);
        assert!(logger.events().is_empty());
    }

    #[test]
    fn test_empty_dataset_reports_nan_mean() {
        let logger = RecordingLogger::default();
        let mut t  = trainer(2, &[], &logger);

        assert_eq!(t.train(), Some(1));
        let events = logger.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::EpochEnd(1, loss) if loss.is_nan()));
    }

    #[test]
    fn test_infeasible_label_does_not_blow_up_epoch_loss() {
        // Width 16 gives 5 time steps; six symbols cannot be aligned.
        assert_eq!(output_time_steps(SHAPE.width), 5);

        let logger = RecordingLogger::default();
        let mut t  = trainer(2, &[&[1, 2, 3, 1, 2, 3], &[1]], &logger);
        assert_eq!(t.train(), Some(1));

        let losses: Vec<f64> = logger
            .events()
            .into_iter()
            .filter_map(|e| match e { Event::EpochEnd(_, loss) => Some(loss), _ => None })
            .collect();
        assert_eq!(losses.len(), 1);
        assert!(losses[0].is_finite() && losses[0] > 0.0 && losses[0] < 1e6, "loss = {}", losses[0]);
    }

    #[test]
    fn test_views_must_match_configured_shape() {
        let wrong = Icdar15Dataset::from_samples(CorpusMode::Train, ImageShape::new(1, 32, 64), vec![]);
        let result = Trainer::<TestBackend>::from_datasets(
            config(2),
            wrong,
            view(CorpusMode::Eval, &[&[1]]),
            Default::default(),
            Box::new(RecordingLogger::default()),
        );
        assert!(result.is_err());

        let swapped = Trainer::<TestBackend>::from_datasets(
            config(2),
            view(CorpusMode::Eval, &[&[1]]),
            view(CorpusMode::Eval, &[&[1]]),
            Default::default(),
            Box::new(RecordingLogger::default()),
        );
        assert!(swapped.is_err());
    }

    #[test]
    fn test_save_then_resume() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs/crnn.ckpt");

        let logger = RecordingLogger::default();
        let mut t  = trainer(2, &[&[1, 2], &[3]], &logger);
        t.train();
        t.save_ckpt(&path, 0.87, 5).unwrap();
        assert_eq!(logger.events().last(), Some(&Event::Saved(path.clone())));

        let other  = RecordingLogger::default();
        let mut t2 = trainer(10, &[&[1, 2], &[3]], &other);
        let ckpt: CheckpointRecord<TestBackend> = load_checkpoint(&path, &Default::default()).unwrap();

        assert_eq!(t2.resume_training(ckpt), 6);
        assert!((t2.best_acc - 0.87).abs() < 1e-12);
        t.model().classifier.weight.val().into_data()
            .assert_eq(&t2.model().classifier.weight.val().into_data(), true);
    }

    fn max_abs_diff<const D: usize>(a: Tensor<TestBackend, D>, b: Tensor<TestBackend, D>) -> f32 {
        (a - b).abs().max().into_scalar().elem::<f32>()
    }

    #[test]
    fn test_resumed_trainer_takes_the_same_step() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("crnn.ckpt");

        let mut t = trainer(3, &[&[1, 2], &[3], &[2, 2]], &RecordingLogger::default());
        t.train();
        t.save_ckpt(&path, 0.0, 2).unwrap();

        let mut t2 = trainer(3, &[&[1, 2], &[3], &[2, 2]], &RecordingLogger::default());
        let ckpt: CheckpointRecord<TestBackend> = load_checkpoint(&path, &Default::default()).unwrap();
        t2.resume_training(ckpt);

        // Eval view: no jitter, so both trainers see identical pixels.
        let source = view(CorpusMode::Eval, &[&[1, 2], &[3, 1]]);
        let items: Vec<_> = (0..source.len()).filter_map(|i| source.get(i)).collect();
        let batch: TextLineBatch<TestBackend> = TextLineBatcher::new(SHAPE).batch(items, &Default::default());

        let loss_a = t.step(batch.clone());
        let loss_b = t2.step(batch);
        assert!((loss_a - loss_b).abs() < 1e-6);

        let (a, b) = (t.model(), t2.model());
        assert!(max_abs_diff(a.classifier.weight.val(), b.classifier.weight.val()) < 1e-6);
        assert!(max_abs_diff(a.proj1.weight.val(), b.proj1.weight.val()) < 1e-6);
    }

    #[test]
    fn test_missing_corpus_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(2);
        cfg.dataset.root = dir.path().display().to_string();

        let result = Trainer::<TestBackend>::new(cfg, Default::default(), Box::new(RecordingLogger::default()));
        assert!(result.is_err());
    }
}
