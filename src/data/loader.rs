//! DataLoader for batching and iterating over paired image data
//!
//! Provides batching for training with support for:
//! - Random shuffling (seeded)
//! - Drop last incomplete batch
//! - Iteration over batches

use ndarray::{Array4, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tch::{Device, Tensor};

use super::batch::RawBatch;
use crate::error::{Error, Result};

/// In-memory paired dataset
///
/// Arrays are (num_samples, channels, height, width); images in [-1, 1],
/// masks in [0, 1] with a single channel.
#[derive(Debug, Clone)]
pub struct PairedImageDataset {
    pub a: Array4<f32>,
    pub b: Array4<f32>,
    pub mask: Array4<f32>,
    pub labels: Vec<i64>,
}

impl PairedImageDataset {
    /// Create a dataset, checking that all fields agree on N, H and W
    pub fn new(a: Array4<f32>, b: Array4<f32>, mask: Array4<f32>, labels: Vec<i64>) -> Result<Self> {
        let n = a.shape()[0];
        if b.shape()[0] != n || mask.shape()[0] != n || labels.len() != n {
            return Err(Error::Dataset(format!(
                "sample counts differ: a={}, b={}, mask={}, labels={}",
                n,
                b.shape()[0],
                mask.shape()[0],
                labels.len()
            )));
        }
        if a.shape()[2..] != b.shape()[2..] || a.shape()[2..] != mask.shape()[2..] {
            return Err(Error::Dataset("spatial sizes differ between a, b and mask".to_string()));
        }
        if mask.shape()[1] != 1 {
            return Err(Error::Dataset(format!(
                "mask must have 1 channel, got {}",
                mask.shape()[1]
            )));
        }
        Ok(Self { a, b, mask, labels })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// DataLoader for iterating over batched image pairs
pub struct DataLoader {
    data: PairedImageDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    device: Device,
    rng: StdRng,
    indices: Vec<usize>,
    current_idx: usize,
}

impl DataLoader {
    /// Create a new DataLoader
    ///
    /// # Arguments
    ///
    /// * `data` - Paired dataset
    /// * `batch_size` - Number of samples per batch
    /// * `shuffle` - Whether to shuffle data each epoch
    /// * `drop_last` - Whether to drop incomplete final batch
    /// * `seed` - Seed of the shuffling order
    pub fn new(
        data: PairedImageDataset,
        batch_size: usize,
        shuffle: bool,
        drop_last: bool,
        seed: u64,
    ) -> Self {
        let indices: Vec<usize> = (0..data.len()).collect();

        let mut loader = Self {
            data,
            batch_size,
            shuffle,
            drop_last,
            device: Device::Cpu,
            rng: StdRng::seed_from_u64(seed),
            indices,
            current_idx: 0,
        };

        if shuffle {
            loader.shuffle_indices();
        }

        loader
    }

    /// Place produced batches on `device`
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Get the number of batches per epoch
    pub fn num_batches(&self) -> usize {
        let num_samples = self.data.len();
        if self.drop_last {
            num_samples / self.batch_size
        } else {
            (num_samples + self.batch_size - 1) / self.batch_size
        }
    }

    /// Get total number of samples
    pub fn num_samples(&self) -> usize {
        self.data.len()
    }

    fn shuffle_indices(&mut self) {
        self.indices.shuffle(&mut self.rng);
    }

    /// Reset for new epoch
    pub fn reset(&mut self) {
        self.current_idx = 0;
        if self.shuffle {
            self.shuffle_indices();
        }
    }

    /// Get next batch
    ///
    /// Returns None when epoch is complete
    pub fn next_batch(&mut self) -> Option<RawBatch> {
        let num_samples = self.indices.len();
        let start = self.current_idx;

        if start >= num_samples {
            return None;
        }

        let end = (start + self.batch_size).min(num_samples);

        // Skip incomplete batch if drop_last
        if self.drop_last && end - start < self.batch_size {
            return None;
        }

        let idx = &self.indices[start..end];
        let labels: Vec<i64> = idx.iter().map(|&i| self.data.labels[i]).collect();
        let batch = RawBatch {
            a: to_tensor(&self.data.a.select(Axis(0), idx)),
            b: to_tensor(&self.data.b.select(Axis(0), idx)),
            a_mask: to_tensor(&self.data.mask.select(Axis(0), idx)),
            label: Tensor::from_slice(&labels),
            a_sparse: None,
        }
        .to_device(self.device);

        self.current_idx = end;
        Some(batch)
    }

    /// Iterate over all batches of a fresh epoch
    pub fn iter(&mut self) -> DataLoaderIter<'_> {
        self.reset();
        DataLoaderIter { loader: self }
    }
}

/// Iterator adapter for DataLoader
pub struct DataLoaderIter<'a> {
    loader: &'a mut DataLoader,
}

impl<'a> Iterator for DataLoaderIter<'a> {
    type Item = RawBatch;

    fn next(&mut self) -> Option<Self::Item> {
        self.loader.next_batch()
    }
}

fn to_tensor(array: &Array4<f32>) -> Tensor {
    let shape: Vec<i64> = array.shape().iter().map(|&d| d as i64).collect();
    let values: Vec<f32> = array.iter().copied().collect();
    Tensor::from_slice(&values).view(shape.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(n: usize) -> PairedImageDataset {
        PairedImageDataset::new(
            Array4::zeros((n, 1, 4, 4)),
            Array4::zeros((n, 3, 4, 4)),
            Array4::ones((n, 1, 4, 4)),
            (0..n as i64).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_dataset_rejects_mismatched_counts() {
        let result = PairedImageDataset::new(
            Array4::zeros((3, 1, 4, 4)),
            Array4::zeros((2, 1, 4, 4)),
            Array4::ones((3, 1, 4, 4)),
            vec![0, 1, 2],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_dataloader_basic() {
        let mut loader = DataLoader::new(dataset(10), 3, false, false, 0);

        assert_eq!(loader.num_batches(), 4); // ceil(10/3) = 4
        assert_eq!(loader.num_samples(), 10);

        let first = loader.next_batch().unwrap();
        assert_eq!(first.a.size(), vec![3, 1, 4, 4]);
        assert_eq!(first.b.size(), vec![3, 3, 4, 4]);
        assert_eq!(first.a_mask.size(), vec![3, 1, 4, 4]);
        assert_eq!(Vec::<i64>::try_from(&first.label).unwrap(), vec![0, 1, 2]);

        let sizes: Vec<i64> = loader.iter().map(|b| b.batch_size()).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);
    }

    #[test]
    fn test_dataloader_drop_last() {
        let mut loader = DataLoader::new(dataset(10), 3, true, true, 7);

        assert_eq!(loader.num_batches(), 3); // floor(10/3) = 3
        let batches: Vec<_> = loader.iter().collect();
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.batch_size() == 3));
    }
}
