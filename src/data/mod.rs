//! Data module feeding paired images to the model
//!
//! This module provides:
//! - The batch schema and translation direction
//! - An in-memory paired dataset and seeded DataLoader
//! - A reader for folders of side-by-side A|B images

mod batch;
mod folder;
mod loader;

pub use batch::{Direction, RawBatch};
pub use folder::{load_aligned_folder, FolderOptions};
pub use loader::{DataLoader, PairedImageDataset};
