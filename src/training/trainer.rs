//! Training loop for the sparse pix2pix model
//!
//! Runs epochs `epoch_count..=niter + niter_decay`, one
//! `optimize_parameters` call per batch, steps the learning-rate schedule at
//! the end of every epoch and writes checkpoints and metrics to the
//! experiment directory.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use super::metrics::{EMATracker, EpochAccumulator, TrainingMetrics};
use super::pix2pix::SparseWganGpPix2Pix;
use crate::data::DataLoader;
use crate::utils::checkpoint::{checkpoint_meta, save_checkpoint_meta};
use crate::utils::config::Config;

/// Label of the rolling checkpoint
pub const LATEST_LABEL: &str = "latest";

/// Trainer driving a model over a data loader
pub struct Trainer {
    config: Config,
    metrics: TrainingMetrics,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: Config) -> Self {
        Self {
            config,
            metrics: TrainingMetrics::new(),
        }
    }

    /// Train the model
    ///
    /// # Arguments
    ///
    /// * `model` - Model built in training mode
    /// * `data_loader` - DataLoader providing training batches
    ///
    /// # Returns
    ///
    /// Training metrics
    pub fn train(
        &mut self,
        model: &mut SparseWganGpPix2Pix,
        data_loader: &mut DataLoader,
    ) -> anyhow::Result<&TrainingMetrics> {
        let t = &self.config.training;
        let first_epoch = t.epoch_count;
        let last_epoch = self.config.total_epochs();
        let num_batches = data_loader.num_batches();
        let save_every = t.save_epoch_freq.max(1);
        let print_every = t.print_freq.max(1);

        let experiment_dir = self.config.experiment_dir();
        std::fs::create_dir_all(&experiment_dir)?;
        self.config.save_json(&experiment_dir.join("config.json").to_string_lossy())?;

        info!(
            "Starting training for epochs {}..={}, {} batches per epoch",
            first_epoch, last_epoch, num_batches
        );

        let mut l1_ema = EMATracker::new(0.1);
        let mut total_steps = 0usize;

        for epoch in first_epoch..=last_epoch {
            let lr = model.current_lr().unwrap_or(0.0);
            let mut epoch_errors = EpochAccumulator::default();

            // Progress bar for epoch
            let pb = ProgressBar::new(num_batches as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
                    .progress_chars("##-"),
            );

            for batch in data_loader.iter() {
                model.set_input(&batch)?;
                model.optimize_parameters()?;

                let errors = model.current_errors();
                epoch_errors.add(errors, model.current_penalty());
                l1_ema.update(errors.g_l1);
                total_steps += 1;

                if total_steps % print_every == 0 {
                    debug!(
                        "step {}: G_GAN={:.4} G_L1={:.4} D_real={:.4} D_fake={:.4}",
                        total_steps, errors.g_gan, errors.g_l1, errors.d_real, errors.d_fake
                    );
                }

                pb.set_message(format!(
                    "G_GAN: {:.4}, G_L1: {:.4}, D: {:.4}",
                    errors.g_gan,
                    l1_ema.value(),
                    errors.d_real + errors.d_fake
                ));
                pb.inc(1);
            }

            pb.finish_with_message("done");

            if epoch_errors.steps() == 0 {
                warn!("Epoch {} produced no batches", epoch);
            }

            let (mean, penalty) = epoch_errors.mean();
            self.metrics.record_epoch(epoch, mean, penalty, lr);

            info!(
                "Epoch {}/{}: G_GAN={:.4}, G_L1={:.4}, D_real={:.4}, D_fake={:.4}, D_gp={:.4}",
                epoch, last_epoch, mean.g_gan, mean.g_l1, mean.d_real, mean.d_fake, penalty
            );

            if epoch % save_every == 0 {
                self.save(model, LATEST_LABEL, epoch)?;
                self.save(model, &epoch.to_string(), epoch)?;

                match model.current_visuals() {
                    Ok(visuals) => {
                        let prefix = format!("epoch{:03}_", epoch);
                        visuals.save_png(&experiment_dir.join("images"), &prefix)?;
                    }
                    Err(e) => warn!("No visuals for epoch {}: {}", epoch, e),
                }
                info!("Saved checkpoint at epoch {}", epoch);
            }

            model.update_learning_rate()?;
        }

        // Save final model
        self.save(model, LATEST_LABEL, last_epoch)?;

        let metrics_path = experiment_dir.join("training_metrics.csv");
        if let Err(e) = self.metrics.save_csv(&metrics_path.to_string_lossy()) {
            warn!("Failed to save metrics: {}", e);
        }

        Ok(&self.metrics)
    }

    fn save(&self, model: &SparseWganGpPix2Pix, label: &str, epoch: usize) -> anyhow::Result<()> {
        model.save(label)?;
        let meta = checkpoint_meta(label, epoch, model.current_errors());
        save_checkpoint_meta(&self.config.experiment_dir(), &meta)?;
        Ok(())
    }

    /// Get training metrics
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Get configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PairedImageDataset;
    use crate::utils::checkpoint::load_checkpoint_meta;
    use ndarray::Array4;
    use tch::Device;
    use tempfile::tempdir;

    fn tiny_config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.model.checkpoints_dir = dir.to_string_lossy().into_owned();
        config.model.input_nc = 1;
        config.model.output_nc = 1;
        config.model.ngf = 4;
        config.model.ndf = 4;
        config.model.n_classes = 2;
        config.data.batch_size = 2;
        config.training.niter = 1;
        config.training.niter_decay = 1;
        config.training.save_epoch_freq = 1;
        config
    }

    fn tiny_loader() -> DataLoader {
        let dataset = PairedImageDataset::new(
            Array4::from_elem((4, 1, 4, 4), 0.5),
            Array4::from_elem((4, 1, 4, 4), -0.5),
            Array4::ones((4, 1, 4, 4)),
            vec![0, 1, 0, 1],
        )
        .unwrap();
        DataLoader::new(dataset, 2, true, true, 3)
    }

    #[test]
    fn test_train_writes_checkpoints_and_metrics() {
        let dir = tempdir().unwrap();
        let config = tiny_config(dir.path());
        let mut model = SparseWganGpPix2Pix::new(&config, Device::Cpu).unwrap();
        let mut loader = tiny_loader();

        let mut trainer = Trainer::new(config.clone());
        let metrics = trainer.train(&mut model, &mut loader).unwrap();

        assert_eq!(metrics.epochs, vec![1, 2]);
        assert!(metrics.errors.iter().all(|e| e.is_finite()));

        let exp = config.experiment_dir();
        for name in ["latest_net_G.pt", "latest_net_D.pt", "1_net_G.pt", "2_net_D.pt"] {
            assert!(exp.join(name).exists(), "missing {}", name);
        }
        assert!(exp.join("training_metrics.csv").exists());
        assert!(exp.join("images").join("epoch001_fake_B.png").exists());

        let meta = load_checkpoint_meta(&exp, "latest").unwrap();
        assert_eq!(meta.epoch, 2);
    }
}
