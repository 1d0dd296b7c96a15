//! Aligned image folder reader
//!
//! Each PNG holds the A and B images side by side (A on the left) and is
//! named `<label>_<anything>.png`. The sparse source is simulated by keeping a
//! random fraction of A's pixels; A is stored pre-masked.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use ndarray::{Array4, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::loader::PairedImageDataset;
use crate::error::{Error, Result};

/// Options of the folder reader
#[derive(Debug, Clone)]
pub struct FolderOptions {
    /// Side length each half is resized to
    pub fine_size: u32,
    /// Channels of A (1 or 3)
    pub input_nc: i64,
    /// Channels of B (1 or 3)
    pub output_nc: i64,
    /// Fraction of A's pixels kept by the mask
    pub mask_keep: f64,
    /// Seed of the mask sampling
    pub seed: u64,
}

/// Read every `*.png` in `dir` into a paired dataset
pub fn load_aligned_folder(dir: &Path, options: &FolderOptions) -> Result<PairedImageDataset> {
    for nc in [options.input_nc, options.output_nc] {
        if nc != 1 && nc != 3 {
            return Err(Error::Dataset(format!("images have 1 or 3 channels, got {}", nc)));
        }
    }
    let paths = list_pngs(dir)?;
    if paths.is_empty() {
        return Err(Error::Dataset(format!("no PNG images in {}", dir.display())));
    }

    let size = options.fine_size as usize;
    let n = paths.len();
    let mut a = Array4::<f32>::zeros((n, options.input_nc as usize, size, size));
    let mut b = Array4::<f32>::zeros((n, options.output_nc as usize, size, size));
    let mut mask = Array4::<f32>::zeros((n, 1, size, size));
    let mut labels = Vec::with_capacity(n);
    let mut rng = StdRng::seed_from_u64(options.seed);

    for (i, path) in paths.iter().enumerate() {
        labels.push(parse_label(path)?);

        let pair = image::open(path)?.resize_exact(
            2 * options.fine_size,
            options.fine_size,
            FilterType::Triangle,
        );
        let rgb = pair.to_rgb8();

        for y in 0..size {
            for x in 0..size {
                let keep = rng.gen_bool(options.mask_keep);
                mask[[i, 0, y, x]] = if keep { 1.0 } else { 0.0 };

                let left = rgb.get_pixel(x as u32, y as u32).0;
                let right = rgb.get_pixel((x + size) as u32, y as u32).0;
                write_pixel(&mut a.index_axis_mut(Axis(0), i), left, y, x, keep);
                write_pixel(&mut b.index_axis_mut(Axis(0), i), right, y, x, true);
            }
        }
    }

    tracing::info!("Loaded {} aligned pairs from {}", n, dir.display());
    PairedImageDataset::new(a, b, mask, labels)
}

fn list_pngs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("png"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Label is the file name up to the first underscore
fn parse_label(path: &Path) -> Result<i64> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    stem.split('_')
        .next()
        .and_then(|prefix| prefix.parse().ok())
        .ok_or_else(|| Error::Dataset(format!("no label prefix in {}", path.display())))
}

/// Store one RGB pixel into a (C, H, W) view, converting to gray for C = 1
fn write_pixel(
    image: &mut ndarray::ArrayViewMut3<f32>,
    rgb: [u8; 3],
    y: usize,
    x: usize,
    keep: bool,
) {
    let scale = |v: f32| if keep { v / 127.5 - 1.0 } else { 0.0 };
    if image.shape()[0] == 1 {
        let gray = 0.299 * rgb[0] as f32 + 0.587 * rgb[1] as f32 + 0.114 * rgb[2] as f32;
        image[[0, y, x]] = scale(gray);
    } else {
        for c in 0..3 {
            image[[c, y, x]] = scale(rgb[c] as f32);
        }
    }
}
