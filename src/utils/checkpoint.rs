//! Checkpoint save/load utilities
//!
//! Network weights are stored one file per network as
//! `{epoch_label}_net_{tag}.pt`; each save also writes a small JSON metadata
//! file with the losses at that point.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tch::nn::VarStore;

use crate::error::Result;
use crate::training::CurrentErrors;

/// Checkpoint metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Epoch label ("latest" or an epoch number)
    pub label: String,
    /// Epoch the checkpoint was taken at
    pub epoch: usize,
    /// Losses of the last step before saving
    pub errors: CurrentErrors,
    /// Timestamp of checkpoint
    pub timestamp: String,
}

/// Path of a network file inside `dir`
pub fn network_path(dir: &Path, tag: &str, epoch_label: &str) -> PathBuf {
    dir.join(format!("{}_net_{}.pt", epoch_label, tag))
}

/// Save the parameters of one network
pub fn save_network(vs: &VarStore, dir: &Path, tag: &str, epoch_label: &str) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = network_path(dir, tag, epoch_label);
    vs.save(&path)?;
    tracing::debug!("Saved network {} to {}", tag, path.display());
    Ok(())
}

/// Load the parameters of one network
pub fn load_network(vs: &mut VarStore, dir: &Path, tag: &str, epoch_label: &str) -> Result<()> {
    let path = network_path(dir, tag, epoch_label);
    vs.load(&path)?;
    tracing::info!("Loaded network {} from {}", tag, path.display());
    Ok(())
}

/// Write checkpoint metadata next to the weights
pub fn save_checkpoint_meta(dir: &Path, meta: &CheckpointMeta) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}_meta.json", meta.label));
    std::fs::write(&path, serde_json::to_string_pretty(meta)?)?;
    Ok(path)
}

/// Load checkpoint metadata
pub fn load_checkpoint_meta(dir: &Path, epoch_label: &str) -> anyhow::Result<CheckpointMeta> {
    let path = dir.join(format!("{}_meta.json", epoch_label));
    let content = std::fs::read_to_string(&path)?;
    let meta: CheckpointMeta = serde_json::from_str(&content)?;
    Ok(meta)
}

/// Build metadata stamped with the current time
pub fn checkpoint_meta(label: &str, epoch: usize, errors: CurrentErrors) -> CheckpointMeta {
    CheckpointMeta {
        label: label.to_string(),
        epoch,
        errors,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}
