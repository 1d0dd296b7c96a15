//! # Sparse WGAN-GP pix2pix
//!
//! Training core of a conditional image-to-image translator that learns from
//! sparse, masked source images, with a Wasserstein critic regularized by a
//! gradient penalty.
//!
//! ## Modules
//!
//! - `data`: Batch schema, paired datasets and the data loader
//! - `model`: Generator and critic architectures behind trait interfaces
//! - `training`: Losses, step functions, the model and the training loop
//! - `utils`: Configuration, checkpoints and image rendering
//! - `autodiff`: Graph operations the losses rely on
//! - `error`: Error type of the library

pub mod autodiff;
pub mod data;
pub mod error;
pub mod model;
pub mod training;
pub mod utils;

pub use data::{DataLoader, Direction, PairedImageDataset, RawBatch};
pub use error::{Error, Result};
pub use model::{Critic, CriticArch, GeneratorArch, ImageGenerator, NetworkConfig, Networks};
pub use training::{CurrentErrors, SparseWganGpPix2Pix, Trainer, TrainingMetrics};
pub use utils::{Config, Visuals};
