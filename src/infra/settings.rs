// ============================================================
// Layer 6 — Settings (YAML configuration file)
// ============================================================
// The config file is read once at startup into typed structs;
// nothing downstream looks keys up by name.
//
//   Global:    { device, seed }
//   Dataset:   { root, charset, lowercase, image_height, image_width, channels }
//   Train:     { loader: { epochs, batch_size, shuffle, num_workers, use_shared_memory } }
//   Optimizer: { lr, weight_decay }
//
// CLI flags overwrite individual fields; `validate` then runs
// once on the merged result, before any model is built.

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path, str::FromStr};

use crate::domain::{charset::Charset, sample::ImageShape};

/// Where tensors live. `cpu` runs on NdArray, every GPU spelling on Wgpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeviceKind {
    Cpu,
    /// `None` lets Wgpu pick its default adapter
    Gpu(Option<usize>),
}

impl FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (name, index) = match s.split_once(':') {
            Some((name, idx)) => {
                let idx = idx
                    .parse::<usize>()
                    .map_err(|_| format!("invalid device index in '{s}'"))?;
                (name.to_string(), Some(idx))
            }
            None => (s.clone(), None),
        };

        match (name.as_str(), index) {
            ("cpu", None) => Ok(DeviceKind::Cpu),
            ("gpu" | "wgpu" | "cuda", idx) => Ok(DeviceKind::Gpu(idx)),
            _ => Err(format!("unknown device '{s}' (expected cpu, gpu, wgpu or cuda[:N])")),
        }
    }
}

impl TryFrom<String> for DeviceKind {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DeviceKind> for String {
    fn from(d: DeviceKind) -> Self {
        d.to_string()
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Cpu => write!(f, "cpu"),
            DeviceKind::Gpu(None) => write!(f, "gpu"),
            DeviceKind::Gpu(Some(i)) => write!(f, "gpu:{i}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "Global")]
    pub global:    GlobalSettings,
    #[serde(rename = "Dataset")]
    pub dataset:   DatasetSettings,
    #[serde(rename = "Train")]
    pub train:     TrainSettings,
    #[serde(rename = "Optimizer")]
    pub optimizer: OptimizerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub device: DeviceKind,
    #[serde(default)]
    pub seed:   Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSettings {
    pub root:         String,
    pub charset:      String,
    #[serde(default = "default_true")]
    pub lowercase:    bool,
    #[serde(default = "default_height")]
    pub image_height: usize,
    #[serde(default = "default_width")]
    pub image_width:  usize,
    #[serde(default = "default_channels")]
    pub channels:     usize,
}

impl DatasetSettings {
    pub fn shape(&self) -> ImageShape {
        ImageShape::new(self.channels, self.image_height, self.image_width)
    }

    pub fn charset(&self) -> Result<Charset> {
        Charset::new(&self.charset, self.lowercase)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainSettings {
    pub loader: LoaderSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderSettings {
    pub epochs:            usize,
    pub batch_size:        usize,
    #[serde(default = "default_true")]
    pub shuffle:           bool,
    #[serde(default)]
    pub num_workers:       usize,
    /// Maps to the `pin_memory` flag
    #[serde(default)]
    pub use_shared_memory: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerSettings {
    pub lr:           f64,
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f64,
}

fn default_true() -> bool { true }
fn default_height() -> usize { 32 }
fn default_width() -> usize { 100 }
fn default_channels() -> usize { 1 }
fn default_weight_decay() -> f64 { 1e-2 }

impl Settings {
    /// Parse a YAML settings file. Does not validate.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file '{}'", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        let loader = &self.train.loader;
        ensure!(loader.epochs >= 1, "Train.loader.epochs must be at least 1, got {}", loader.epochs);
        ensure!(loader.batch_size > 0, "Train.loader.batch_size must be positive");

        let lr = self.optimizer.lr;
        ensure!(lr.is_finite() && lr > 0.0, "Optimizer.lr must be a positive finite number, got {lr}");
        let wd = self.optimizer.weight_decay;
        ensure!(wd.is_finite() && wd >= 0.0, "Optimizer.weight_decay must be non-negative, got {wd}");

        let ds = &self.dataset;
        if ds.image_height < 32 || ds.image_height % 16 != 0 {
            bail!(
                "Dataset.image_height must be a multiple of 16 and at least 32, got {}",
                ds.image_height
            );
        }
        ensure!(ds.image_width >= 4, "Dataset.image_width must be at least 4, got {}", ds.image_width);
        ensure!(
            ds.channels == 1 || ds.channels == 3,
            "Dataset.channels must be 1 or 3, got {}",
            ds.channels
        );
        ds.charset().context("Dataset.charset is invalid")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
Global:
  device: cuda:0
  seed: 7
Dataset:
  root: data/icdar15
  charset: "0123456789abcdefghijklmnopqrstuvwxyz"
Train:
  loader:
    epochs: 3
    batch_size: 4
    num_workers: 2
    use_shared_memory: true
Optimizer:
  lr: 0.001
"#;

    fn parse() -> Settings {
        serde_yaml::from_str(YAML).unwrap()
    }

    #[test]
    fn test_parse_fills_defaults() {
        let s = parse();
        assert_eq!(s.global.device, DeviceKind::Gpu(Some(0)));
        assert_eq!(s.global.seed, Some(7));
        assert_eq!(s.dataset.shape(), ImageShape::new(1, 32, 100));
        assert!(s.train.loader.shuffle);
        assert!((s.optimizer.weight_decay - 0.01).abs() < 1e-12);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_device_spellings() {
        assert_eq!("CPU".parse::<DeviceKind>().unwrap(), DeviceKind::Cpu);
        assert_eq!("wgpu".parse::<DeviceKind>().unwrap(), DeviceKind::Gpu(None));
        assert_eq!("cuda:1".parse::<DeviceKind>().unwrap(), DeviceKind::Gpu(Some(1)));
        assert!("tpu".parse::<DeviceKind>().is_err());
        assert!("cpu:1".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn test_unknown_device_fails_to_parse() {
        let yaml = YAML.replace("cuda:0", "abacus");
        assert!(serde_yaml::from_str::<Settings>(&yaml).is_err());
    }

    #[test]
    fn test_validate_names_offending_key() {
        let mut s = parse();
        s.train.loader.batch_size = 0;
        let err = s.validate().unwrap_err().to_string();
        assert!(err.contains("Train.loader.batch_size"));

        let mut s = parse();
        s.optimizer.lr = f64::NAN;
        assert!(s.validate().unwrap_err().to_string().contains("Optimizer.lr"));

        let mut s = parse();
        s.train.loader.epochs = 0;
        assert!(s.validate().unwrap_err().to_string().contains("Train.loader.epochs"));

        let mut s = parse();
        s.dataset.image_height = 40;
        assert!(s.validate().unwrap_err().to_string().contains("Dataset.image_height"));

        let mut s = parse();
        s.dataset.charset = "abca".to_string();
        assert!(s.validate().unwrap_err().to_string().contains("Dataset.charset"));
    }

    #[test]
    fn test_from_yaml_reads_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.yaml");
        fs::write(&path, YAML).unwrap();
        assert_eq!(Settings::from_yaml(&path).unwrap().train.loader.epochs, 3);
        assert!(Settings::from_yaml(&dir.path().join("missing.yaml")).is_err());
    }
}
