//! Training module for the sparse WGAN-GP pix2pix model
//!
//! This module provides:
//! - Wasserstein criterion, gradient penalty and masked L1 losses
//! - Image pool, learning-rate schedule and the optimizer interface
//! - The per-step state, step functions and the model that orders them
//! - Latent interpolation diagnostics
//! - Training loop and metrics

mod image_pool;
mod latent;
mod losses;
mod metrics;
mod optimizer;
mod pix2pix;
mod scheduler;
mod state;
mod steps;
mod trainer;

pub use image_pool::ImagePool;
pub use latent::{interpolation_weights, label_frames, noise_frames, shadow};
pub use losses::{gradient_penalty, masked_l1, WganLoss};
pub use metrics::{EMATracker, EpochAccumulator, TrainingMetrics};
pub use optimizer::StepOptimizer;
pub use pix2pix::{Optimizers, SparseWganGpPix2Pix};
pub use scheduler::{LrPolicy, LrScheduler};
pub use state::{CurrentErrors, Phase, StepInputs, TrainingState};
pub use steps::{backward_d, backward_g, forward, LossWeights};
pub use trainer::{Trainer, LATEST_LABEL};
