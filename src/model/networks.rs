//! Generator/critic pair with their variable stores
//!
//! Owns the parameters of both networks and provides optimizer construction
//! and checkpoint persistence for them.

use std::path::Path;

use tch::{nn, nn::OptimizerConfig, nn::VarStore, Device};
use tracing::info;

use super::network::{Critic, ImageGenerator, NetworkConfig};
use super::registry::{CriticArch, GeneratorArch};
use crate::error::Result;
use crate::utils::checkpoint::{load_network, save_network};

/// Tag of generator checkpoints
pub const GENERATOR_TAG: &str = "G";
/// Tag of critic checkpoints
pub const CRITIC_TAG: &str = "D";

/// Generator and (in training) critic
pub struct Networks {
    /// Generator network
    pub generator: Box<dyn ImageGenerator>,
    /// Critic network, absent in inference-only mode
    pub critic: Option<Box<dyn Critic>>,
    /// Variable store for generator
    pub gen_vs: VarStore,
    /// Variable store for critic
    pub disc_vs: Option<VarStore>,
    /// Device (CPU/GPU)
    pub device: Device,
}

impl Networks {
    /// Build both networks from the registry
    ///
    /// # Arguments
    ///
    /// * `config` - Shape hyperparameters
    /// * `gen_arch` - Generator architecture
    /// * `critic_arch` - Critic architecture, `None` for inference-only
    /// * `device` - Device to create parameters on
    pub fn new(
        config: &NetworkConfig,
        gen_arch: GeneratorArch,
        critic_arch: Option<CriticArch>,
        device: Device,
    ) -> Self {
        let gen_vs = VarStore::new(device);
        let generator = gen_arch.build(&gen_vs.root(), config);
        log_network("generator", &gen_arch.to_string(), &gen_vs);

        let (critic, disc_vs) = match critic_arch {
            Some(arch) => {
                let disc_vs = VarStore::new(device);
                let critic = arch.build(&disc_vs.root(), config);
                log_network("critic", &arch.to_string(), &disc_vs);
                (Some(critic), Some(disc_vs))
            }
            None => (None, None),
        };

        Self {
            generator,
            critic,
            gen_vs,
            disc_vs,
            device,
        }
    }

    /// Adam optimizer over the generator parameters
    pub fn gen_optimizer(&self, lr: f64, beta1: f64) -> Result<nn::Optimizer> {
        Ok(adam(beta1).build(&self.gen_vs, lr)?)
    }

    /// Adam optimizer over the critic parameters, if there is a critic
    pub fn disc_optimizer(&self, lr: f64, beta1: f64) -> Result<Option<nn::Optimizer>> {
        match &self.disc_vs {
            Some(vs) => Ok(Some(adam(beta1).build(vs, lr)?)),
            None => Ok(None),
        }
    }

    /// Save both networks under `epoch_label`
    pub fn save(&self, dir: &Path, epoch_label: &str) -> Result<()> {
        save_network(&self.gen_vs, dir, GENERATOR_TAG, epoch_label)?;
        if let Some(vs) = &self.disc_vs {
            save_network(vs, dir, CRITIC_TAG, epoch_label)?;
        }
        Ok(())
    }

    /// Load the generator, and the critic when one exists
    pub fn load(&mut self, dir: &Path, epoch_label: &str) -> Result<()> {
        load_network(&mut self.gen_vs, dir, GENERATOR_TAG, epoch_label)?;
        if let Some(vs) = self.disc_vs.as_mut() {
            load_network(vs, dir, CRITIC_TAG, epoch_label)?;
        }
        Ok(())
    }

    /// Total number of generator parameters
    pub fn gen_parameters(&self) -> usize {
        num_parameters(&self.gen_vs)
    }

    /// Total number of critic parameters
    pub fn disc_parameters(&self) -> usize {
        self.disc_vs.as_ref().map(num_parameters).unwrap_or(0)
    }
}

fn adam(beta1: f64) -> nn::Adam {
    nn::Adam {
        beta1,
        beta2: 0.999,
        ..Default::default()
    }
}

fn num_parameters(vs: &VarStore) -> usize {
    vs.trainable_variables().iter().map(|t| t.numel()).sum()
}

fn log_network(role: &str, arch: &str, vs: &VarStore) {
    info!(
        "Built {} [{}]: {} parameters",
        role,
        arch,
        num_parameters(vs)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn small_config() -> NetworkConfig {
        NetworkConfig {
            input_nc: 1,
            output_nc: 1,
            ngf: 4,
            ndf: 4,
            n_classes: 2,
            nz: 0,
            img_conditional_d: true,
        }
    }

    #[test]
    fn test_inference_networks_have_no_critic() {
        let nets = Networks::new(&small_config(), GeneratorArch::Gated, None, Device::Cpu);

        assert!(nets.critic.is_none());
        assert_eq!(nets.disc_parameters(), 0);
        assert!(nets.gen_parameters() > 0);
        assert!(nets.disc_optimizer(1e-4, 0.5).unwrap().is_none());
    }

    #[test]
    fn test_training_networks_build_adam_optimizers() {
        let nets = Networks::new(
            &small_config(),
            GeneratorArch::Gated,
            Some(CriticArch::Gated),
            Device::Cpu,
        );

        let mut gen_opt = nets.gen_optimizer(2e-4, 0.5).unwrap();
        let disc_opt = nets.disc_optimizer(1e-4, 0.5).unwrap();
        assert!(disc_opt.is_some());
        gen_opt.set_lr(1e-5);
        gen_opt.zero_grad();
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let nets = Networks::new(
            &small_config(),
            GeneratorArch::Plain,
            Some(CriticArch::Plain),
            Device::Cpu,
        );
        nets.save(dir.path(), "latest").unwrap();

        assert!(dir.path().join("latest_net_G.pt").exists());
        assert!(dir.path().join("latest_net_D.pt").exists());

        let mut other = Networks::new(
            &small_config(),
            GeneratorArch::Plain,
            Some(CriticArch::Plain),
            Device::Cpu,
        );
        other.load(dir.path(), "latest").unwrap();
    }
}
