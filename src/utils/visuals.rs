//! Rendering of image tensors for display
//!
//! Tensors in [-1, 1] become 8-bit RGB arrays in (height, width, channel)
//! order. Only the first sample of a batch is rendered.

use std::path::{Path, PathBuf};

use ndarray::Array3;
use tch::{Kind, Tensor};

use crate::error::{Error, Result};

/// Display-ready image, shape (height, width, 3)
pub type ImageArray = Array3<u8>;

/// Ordered collection of named images
#[derive(Debug, Clone, Default)]
pub struct Visuals {
    entries: Vec<(String, ImageArray)>,
}

impl Visuals {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an image under `name`
    pub fn push(&mut self, name: impl Into<String>, image: ImageArray) {
        self.entries.push((name.into(), image));
    }

    /// Look up an image by name
    pub fn get(&self, name: &str) -> Option<&ImageArray> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, image)| image)
    }

    /// Names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ImageArray)> {
        self.entries.iter().map(|(n, image)| (n.as_str(), image))
    }

    /// Number of images
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write every image as `{prefix}{name}.png` into `dir`
    pub fn save_png(&self, dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        self.iter()
            .map(|(name, image)| {
                let path = dir.join(format!("{}{}.png", prefix, name));
                save_image(image, &path)?;
                Ok(path)
            })
            .collect()
    }
}

/// Render the first sample of `tensor` to an 8-bit RGB array
///
/// Values are clamped to [-1, 1] and mapped to [0, 255]. Single-channel
/// images are tiled to three channels. With `normalize`, the tensor is first
/// min-max rescaled into [-1, 1].
pub fn tensor_to_image(tensor: &Tensor, normalize: bool) -> Result<ImageArray> {
    let image = match tensor.dim() {
        4 => tensor.get(0),
        3 => tensor.shallow_clone(),
        d => {
            return Err(Error::InvalidBatch(format!(
                "cannot render a {}-dimensional tensor",
                d
            )))
        }
    };
    let image = image.detach().to_device(tch::Device::Cpu).to_kind(Kind::Float);

    let image = if normalize {
        let min = image.min().double_value(&[]);
        let max = image.max().double_value(&[]);
        (image - min) / (max - min + 1e-5) * 2.0 - 1.0
    } else {
        image
    };

    let image = image.clamp(-1.0, 1.0);
    let image = match image.size()[0] {
        1 => image.repeat([3, 1, 1]),
        3 => image,
        c if c > 3 => image.narrow(0, 0, 3),
        c => {
            return Err(Error::InvalidBatch(format!(
                "cannot render an image with {} channels",
                c
            )))
        }
    };

    let (height, width) = (image.size()[1] as usize, image.size()[2] as usize);
    let scaled = ((image + 1.0) / 2.0 * 255.0).permute([1, 2, 0]).contiguous();
    let values: Vec<f32> = Vec::try_from(&scaled)?;
    let pixels: Vec<u8> = values.into_iter().map(|v| v as u8).collect();

    Ok(Array3::from_shape_vec((height, width, 3), pixels)?)
}

/// Save an RGB array as PNG
pub fn save_image(image: &ImageArray, path: &Path) -> Result<()> {
    let (height, width, _) = image.dim();
    let raw: Vec<u8> = image.iter().copied().collect();
    let buffer = image::RgbImage::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| Error::InvalidBatch("image buffer size mismatch".to_string()))?;
    buffer.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;
    use tempfile::tempdir;

    #[test]
    fn test_tensor_to_image_scaling() {
        // One grayscale 1x2 image with the extremes of the range
        let t = Tensor::from_slice(&[-1.0f32, 1.0]).view([1, 1, 1, 2]);
        let image = tensor_to_image(&t, false).unwrap();

        assert_eq!(image.dim(), (1, 2, 3));
        assert_eq!(image[[0, 0, 0]], 0);
        assert_eq!(image[[0, 1, 2]], 255);
    }

    #[test]
    fn test_tensor_to_image_clamps() {
        let t = Tensor::full([1, 3, 2, 2], 5.0, (Kind::Float, Device::Cpu));
        let image = tensor_to_image(&t, false).unwrap();
        assert!(image.iter().all(|&v| v == 255));
    }

    #[test]
    fn test_tensor_to_image_normalize() {
        let t = Tensor::from_slice(&[10.0f32, 20.0, 30.0, 40.0]).view([1, 2, 2]);
        let image = tensor_to_image(&t, true).unwrap();

        assert_eq!(image[[0, 0, 0]], 0);
        assert!(image[[1, 1, 0]] >= 254);
    }

    #[test]
    fn test_visuals_save_png() {
        let dir = tempdir().unwrap();
        let mut visuals = Visuals::new();
        visuals.push("fake_B", Array3::zeros((4, 4, 3)));
        visuals.push("real_B", Array3::from_elem((4, 4, 3), 200u8));

        assert_eq!(visuals.names(), vec!["fake_B", "real_B"]);
        let paths = visuals.save_png(dir.path(), "epoch001_").unwrap();

        assert_eq!(paths.len(), 2);
        assert!(dir.path().join("epoch001_real_B.png").exists());
    }
}
