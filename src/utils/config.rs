//! Configuration management
//!
//! Provides unified configuration for the whole pix2pix pipeline: data,
//! networks and losses, and the optimization schedule.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::Direction;
use crate::model::{CriticArch, GeneratorArch, NetworkConfig};
use crate::training::LrPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data configuration
    pub data: DataConfig,
    /// Model and loss configuration
    pub model: ModelConfig,
    /// Optimization configuration
    pub training: TrainingConfigFile,
}

/// Data-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory of aligned A|B images
    pub data_root: String,
    /// "AtoB" or "BtoA"
    pub which_direction: String,
    /// Batch size
    pub batch_size: usize,
    /// Side length of each image half
    pub fine_size: u32,
    /// Fraction of source pixels kept by the sparse mask
    pub mask_keep: f64,
    /// Shuffle batches each epoch
    pub shuffle: bool,
}

/// Model and loss configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Experiment name (subdirectory of checkpoints_dir)
    pub name: String,
    /// Root directory for checkpoints
    pub checkpoints_dir: String,
    /// Source image channels
    pub input_nc: i64,
    /// Target image channels
    pub output_nc: i64,
    /// Generator base filters
    pub ngf: i64,
    /// Critic base filters
    pub ndf: i64,
    /// Number of label classes
    pub n_classes: i64,
    /// Latent noise size, 0 disables noise
    pub nz: i64,
    /// Generator architecture name
    pub which_model_net_g: String,
    /// Critic architecture name
    pub which_model_net_d: String,
    /// Critic conditioned on the source image
    pub img_conditional_d: bool,
    /// Weight of the masked L1 reconstruction term
    pub lambda_a: f64,
    /// Weight of the generator adversarial term
    pub lambda_gan: f64,
    /// Weight of the gradient penalty
    pub wgan_gp_lambda: f64,
    /// Target gradient norm of the penalty
    pub wgan_gp_center: f64,
    /// Image pool capacity, 0 disables the pool
    pub pool_size: usize,
    /// Build the critic and optimizers
    pub is_train: bool,
    /// Resume from `which_epoch`
    pub continue_train: bool,
    /// Checkpoint label to load
    pub which_epoch: String,
    /// Frames in latent interpolations
    pub num_interpolate: usize,
    /// Std of the diagnostic noise endpoints
    pub test_std: f64,
    /// Default second label of the latent-space interpolation
    pub target_label: i64,
}

/// Optimization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfigFile {
    /// Generator learning rate
    pub lr_g: f64,
    /// Critic learning rate
    pub lr_d: f64,
    /// Adam beta1
    pub beta1: f64,
    /// Learning rate policy name
    pub lr_policy: String,
    /// Epochs at the initial learning rate
    pub niter: usize,
    /// Epochs of linear decay to zero
    pub niter_decay: usize,
    /// First epoch number
    pub epoch_count: usize,
    /// Checkpoint save frequency (epochs)
    pub save_epoch_freq: usize,
    /// Debug log frequency (steps)
    pub print_freq: usize,
    /// Device: "cpu" or "cuda"
    pub device: String,
    /// Seed for libtorch and the data order
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                data_root: "datasets/facades".to_string(),
                which_direction: "AtoB".to_string(),
                batch_size: 1,
                fine_size: 256,
                mask_keep: 0.1,
                shuffle: true,
            },
            model: ModelConfig {
                name: "sparse_wgangp".to_string(),
                checkpoints_dir: "checkpoints".to_string(),
                input_nc: 3,
                output_nc: 3,
                ngf: 64,
                ndf: 64,
                n_classes: 10,
                nz: 0,
                which_model_net_g: "gated".to_string(),
                which_model_net_d: "gated".to_string(),
                img_conditional_d: true,
                lambda_a: 100.0,
                lambda_gan: 1.0,
                wgan_gp_lambda: 10.0,
                wgan_gp_center: 1.0,
                pool_size: 0,
                is_train: true,
                continue_train: false,
                which_epoch: "latest".to_string(),
                num_interpolate: 8,
                test_std: 0.2,
                target_label: 0,
            },
            training: TrainingConfigFile {
                lr_g: 2e-4,
                lr_d: 2e-4,
                beta1: 0.5,
                lr_policy: "lambda".to_string(),
                niter: 100,
                niter_decay: 100,
                epoch_count: 1,
                save_epoch_freq: 5,
                print_freq: 100,
                device: "cpu".to_string(),
                seed: 42,
            },
        }
    }
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_toml(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_toml(&self, path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn save_json(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from TOML or JSON depending on the extension
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if path.ends_with(".toml") {
            Self::from_toml(path)
        } else {
            Self::from_json(path)
        }
    }

    /// Get device from configuration
    pub fn get_device(&self) -> tch::Device {
        match self.training.device.to_lowercase().as_str() {
            "cuda" | "gpu" => {
                if tch::Cuda::is_available() {
                    tch::Device::Cuda(0)
                } else {
                    tracing::warn!("CUDA requested but not available, falling back to CPU");
                    tch::Device::Cpu
                }
            }
            _ => tch::Device::Cpu,
        }
    }

    /// Shape hyperparameters for the network registry
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            input_nc: self.model.input_nc,
            output_nc: self.model.output_nc,
            ngf: self.model.ngf,
            ndf: self.model.ndf,
            n_classes: self.model.n_classes,
            nz: self.model.nz,
            img_conditional_d: self.model.img_conditional_d,
        }
    }

    /// Directory holding this experiment's checkpoints
    pub fn experiment_dir(&self) -> PathBuf {
        Path::new(&self.model.checkpoints_dir).join(&self.model.name)
    }

    /// Total number of epochs including the decay phase
    pub fn total_epochs(&self) -> usize {
        self.training.niter + self.training.niter_decay
    }

    /// Inference settings: no critic, weights from `which_epoch`, one
    /// sample per batch so every sample gets its own visuals
    pub fn for_inference(mut self, which_epoch: &str) -> Self {
        self.model.is_train = false;
        self.model.which_epoch = which_epoch.to_string();
        self.data.batch_size = 1;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.data.batch_size == 0 {
            anyhow::bail!("Batch size must be > 0");
        }
        if self.data.fine_size < 4 {
            anyhow::bail!("Image size must be >= 4");
        }
        if !(self.data.mask_keep > 0.0 && self.data.mask_keep <= 1.0) {
            anyhow::bail!("Mask keep fraction must be in (0, 1]");
        }
        if self.model.n_classes <= 0 {
            anyhow::bail!("Number of classes must be > 0");
        }
        for (name, nc) in [("input_nc", self.model.input_nc), ("output_nc", self.model.output_nc)] {
            if nc != 1 && nc != 3 {
                anyhow::bail!("{} must be 1 or 3, got {}", name, nc);
            }
        }
        if self.model.target_label < 0 || self.model.target_label >= self.model.n_classes {
            anyhow::bail!(
                "target_label {} is outside 0..{}",
                self.model.target_label,
                self.model.n_classes
            );
        }
        if self.model.nz < 0 {
            anyhow::bail!("Noise dimension must be >= 0");
        }
        if self.model.lambda_a < 0.0 || self.model.lambda_gan < 0.0 || self.model.wgan_gp_lambda < 0.0 {
            anyhow::bail!("Loss weights must be non-negative");
        }
        if self.model.num_interpolate < 2 {
            anyhow::bail!("Latent interpolation needs at least 2 frames");
        }
        if self.total_epochs() < self.training.epoch_count {
            anyhow::bail!("epoch_count is past the last epoch");
        }
        self.data.which_direction.parse::<Direction>()?;
        self.model.which_model_net_g.parse::<GeneratorArch>()?;
        self.model.which_model_net_d.parse::<CriticArch>()?;
        self.training.lr_policy.parse::<LrPolicy>()?;
        Ok(())
    }
}

/// Create default configuration file if it doesn't exist
pub fn ensure_config_exists(path: &str) -> anyhow::Result<Config> {
    if Path::new(path).exists() {
        Config::load(path)
    } else {
        let config = Config::default();
        if path.ends_with(".toml") {
            config.save_toml(path)?;
        } else {
            config.save_json(path)?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.model.wgan_gp_center, 1.0);
        assert_eq!(config.total_epochs(), 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.model.pool_size = 50;
        config.save_toml(path).unwrap();

        let loaded = Config::load(path).unwrap();
        assert_eq!(loaded.model.pool_size, 50);
        assert_eq!(loaded.data.which_direction, "AtoB");
    }

    #[test]
    fn test_ensure_config_exists_writes_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let path = path.to_str().unwrap();

        let config = ensure_config_exists(path).unwrap();
        assert!(Path::new(path).exists());
        assert_eq!(config.model.name, "sparse_wgangp");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.training.lr_policy = "plateau".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.which_model_net_d = "pixel".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.data.mask_keep = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.target_label = config.model.n_classes;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.target_label = -1;
        assert!(config.validate().is_err());

        for nc in [0, 2, 4] {
            let mut config = Config::default();
            config.model.input_nc = nc;
            assert!(config.validate().is_err());

            let mut config = Config::default();
            config.model.output_nc = nc;
            assert!(config.validate().is_err());
        }

        let mut config = Config::default();
        config.data.fine_size = 3;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.input_nc = 1;
        config.data.fine_size = 4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inference_config_renders_one_sample_per_batch() {
        let mut config = Config::default();
        config.data.batch_size = 16;

        let config = config.for_inference("10");
        assert!(!config.model.is_train);
        assert_eq!(config.model.which_epoch, "10");
        assert_eq!(config.data.batch_size, 1);
    }

    #[test]
    fn test_experiment_dir() {
        let config = Config::default();
        assert_eq!(config.experiment_dir(), PathBuf::from("checkpoints/sparse_wgangp"));
    }
}
