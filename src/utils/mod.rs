//! Utility module with helper functions
//!
//! This module provides:
//! - Configuration handling
//! - Checkpoint save/load utilities
//! - Tensor-to-image rendering

pub mod checkpoint;
pub mod config;
pub mod visuals;

pub use checkpoint::{checkpoint_meta, load_checkpoint_meta, save_checkpoint_meta, CheckpointMeta};
pub use config::{ensure_config_exists, Config};
pub use visuals::{save_image, tensor_to_image, ImageArray, Visuals};
