//! Training metrics for monitoring WGAN-GP progress
//!
//! Per-epoch averages of the four reported losses plus the gradient penalty
//! and learning rate, with CSV persistence.

use super::state::CurrentErrors;

/// Metrics collected during training, one row per epoch
#[derive(Debug, Clone, Default)]
pub struct TrainingMetrics {
    /// Epoch numbers
    pub epochs: Vec<usize>,
    /// Mean losses per epoch
    pub errors: Vec<CurrentErrors>,
    /// Mean weighted gradient penalty per epoch
    pub penalties: Vec<f64>,
    /// Generator learning rate used during the epoch
    pub learning_rates: Vec<f64>,
}

impl TrainingMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record epoch metrics
    pub fn record_epoch(&mut self, epoch: usize, errors: CurrentErrors, penalty: f64, lr: f64) {
        self.epochs.push(epoch);
        self.errors.push(errors);
        self.penalties.push(penalty);
        self.learning_rates.push(lr);
    }

    /// Get number of recorded epochs
    pub fn num_epochs(&self) -> usize {
        self.errors.len()
    }

    /// Get latest losses
    pub fn latest(&self) -> Option<CurrentErrors> {
        self.errors.last().copied()
    }

    /// Wasserstein estimate `-(D_real + D_fake)` of the latest epoch
    ///
    /// The critic scores real inputs low, so the gap between fake and real
    /// scores is the negated sum of the two reported terms.
    pub fn latest_wasserstein(&self) -> Option<f64> {
        self.latest().map(|e| -(e.d_real + e.d_fake))
    }

    /// Save metrics to CSV file
    pub fn save_csv(&self, path: &str) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record(["epoch", "G_GAN", "G_L1", "D_real", "D_fake", "D_gp", "lr"])?;

        for i in 0..self.num_epochs() {
            let e = &self.errors[i];
            writer.write_record([
                self.epochs[i].to_string(),
                e.g_gan.to_string(),
                e.g_l1.to_string(),
                e.d_real.to_string(),
                e.d_fake.to_string(),
                self.penalties[i].to_string(),
                self.learning_rates[i].to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Load metrics from CSV file
    pub fn load_csv(path: &str) -> anyhow::Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut metrics = Self::new();

        for result in reader.records() {
            let record = result?;
            let errors = CurrentErrors {
                g_gan: record[1].parse()?,
                g_l1: record[2].parse()?,
                d_real: record[3].parse()?,
                d_fake: record[4].parse()?,
            };
            metrics.record_epoch(record[0].parse()?, errors, record[5].parse()?, record[6].parse()?);
        }

        Ok(metrics)
    }
}

/// Running sum of step losses within one epoch
#[derive(Debug, Clone, Default)]
pub struct EpochAccumulator {
    sum: CurrentErrors,
    penalty: f64,
    steps: usize,
}

impl EpochAccumulator {
    /// Add the losses of one step
    pub fn add(&mut self, errors: CurrentErrors, penalty: f64) {
        self.sum.g_gan += errors.g_gan;
        self.sum.g_l1 += errors.g_l1;
        self.sum.d_real += errors.d_real;
        self.sum.d_fake += errors.d_fake;
        self.penalty += penalty;
        self.steps += 1;
    }

    /// Number of steps added
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Mean losses and penalty, zeros if nothing was added
    pub fn mean(&self) -> (CurrentErrors, f64) {
        if self.steps == 0 {
            return (CurrentErrors::default(), 0.0);
        }
        let n = self.steps as f64;
        let errors = CurrentErrors {
            g_gan: self.sum.g_gan / n,
            g_l1: self.sum.g_l1 / n,
            d_real: self.sum.d_real / n,
            d_fake: self.sum.d_fake / n,
        };
        (errors, self.penalty / n)
    }
}

/// Exponential moving average tracker
#[derive(Debug)]
pub struct EMATracker {
    value: f64,
    alpha: f64,
    initialized: bool,
}

impl EMATracker {
    /// Create new EMA tracker
    ///
    /// # Arguments
    ///
    /// * `alpha` - Smoothing factor (0 < alpha <= 1). Higher = more weight on recent
    pub fn new(alpha: f64) -> Self {
        Self {
            value: 0.0,
            alpha: alpha.clamp(0.001, 1.0),
            initialized: false,
        }
    }

    /// Update with new value
    pub fn update(&mut self, new_value: f64) {
        if !self.initialized {
            self.value = new_value;
            self.initialized = true;
        } else {
            self.value = self.alpha * new_value + (1.0 - self.alpha) * self.value;
        }
    }

    /// Get current EMA value
    pub fn value(&self) -> f64 {
        self.value
    }
}
