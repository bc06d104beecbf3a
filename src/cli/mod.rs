// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
//
//   crnn-ctc-trainer [--config configs/crnn_icdar15.yaml]
//                    [--epochs N] [--batch_size N] [--lr F] ...
//                    [--resume ckpt] [--save_ckpt ckpt]
//
// Flow: read YAML → apply flag overrides → validate → run.
// All business logic is delegated to Layer 2 (application).

pub mod commands;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::application::train_use_case::{TrainConfig, TrainUseCase};
use crate::infra::settings::Settings;
use commands::TrainArgs;

#[derive(Parser, Debug)]
#[command(
    name = "crnn-ctc-trainer",
    version,
    about = "Train a CRNN text recogniser with CTC loss on ICDAR15 word crops."
)]
pub struct Cli {
    /// YAML config file providing the default for every flag
    #[arg(long, default_value = "configs/crnn_icdar15.yaml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub train: TrainArgs,
}

impl Cli {
    /// Merge flags into the config file and hand off to the use case.
    pub fn run(self) -> Result<()> {
        let config = self.resolve()?;
        tracing::info!(
            "Training for epochs [1, {}) | batch_size={} | lr={} | device={}",
            config.epochs,
            config.batch_size,
            config.lr,
            config.device
        );

        let use_case = TrainUseCase::new(config, self.train.checkpoint_options());
        match use_case.execute()? {
            Some(epoch) => println!("Training complete. Last epoch: {epoch}."),
            None => println!("No epochs to run."),
        }
        Ok(())
    }

    /// Settings file + overrides, validated.
    pub fn resolve(&self) -> Result<TrainConfig> {
        let mut settings = Settings::from_yaml(&self.config)?;
        self.train.apply(&mut settings);
        settings.validate()?;
        Ok(TrainConfig::from(&settings))
    }
}
