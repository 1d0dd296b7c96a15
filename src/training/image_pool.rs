//! History buffer of generated samples
//!
//! Feeding the critic a mix of current and past fakes keeps it from
//! overfitting to the latest generator. Once full, each incoming sample has a
//! one-in-two chance of being swapped with a random stored one.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tch::Tensor;

/// Bounded pool of past generator outputs
pub struct ImagePool<R: Rng = StdRng> {
    pool_size: usize,
    images: Vec<Tensor>,
    rng: R,
}

impl ImagePool<StdRng> {
    /// Create a pool of `pool_size` samples (0 disables buffering)
    pub fn new(pool_size: usize) -> Self {
        Self::with_rng(pool_size, StdRng::from_entropy())
    }
}

impl<R: Rng> ImagePool<R> {
    /// Create a pool drawing its decisions from `rng`
    pub fn with_rng(pool_size: usize, rng: R) -> Self {
        Self {
            pool_size,
            images: Vec::with_capacity(pool_size),
            rng,
        }
    }

    /// Number of stored samples
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Stored samples, each of shape (1, ...)
    pub fn images(&self) -> &[Tensor] {
        &self.images
    }

    /// Return a batch of the same size as `images`, mixing in past samples
    pub fn query(&mut self, images: &Tensor) -> Tensor {
        if self.pool_size == 0 {
            return images.shallow_clone();
        }

        let batch_size = images.size()[0];
        let mut returned = Vec::with_capacity(batch_size as usize);

        for i in 0..batch_size {
            let image = images.get(i).unsqueeze(0).detach();

            if self.images.len() < self.pool_size {
                self.images.push(image.copy());
                returned.push(image);
            } else if self.rng.gen_bool(0.5) {
                let slot = self.rng.gen_range(0..self.pool_size);
                let previous = std::mem::replace(&mut self.images[slot], image.copy());
                returned.push(previous);
            } else {
                returned.push(image);
            }
        }

        Tensor::cat(&returned, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    fn same(a: &Tensor, b: &Tensor) -> bool {
        a.size() == b.size() && a.equal(b)
    }

    #[test]
    fn test_zero_pool_is_identity() {
        let mut pool = ImagePool::new(0);
        let batch = Tensor::randn([3, 2, 4, 4], (Kind::Float, Device::Cpu));

        let out = pool.query(&batch);
        assert!(same(&out, &batch));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_pool_fills_then_stays_bounded() {
        let k = 3;
        let mut pool = ImagePool::with_rng(k, StdRng::seed_from_u64(11));

        for step in 0..10 {
            let sample = Tensor::full([1, 1, 2, 2], step as f64, (Kind::Float, Device::Cpu));
            let out = pool.query(&sample);

            assert_eq!(out.size(), vec![1, 1, 2, 2]);
            assert!(pool.len() <= k);
            if step < k {
                assert!(same(&out, &sample));
                assert_eq!(pool.len(), step + 1);
            }
        }
        assert_eq!(pool.len(), k);
    }

    #[test]
    fn test_batch_size_preserved() {
        let mut pool = ImagePool::with_rng(2, StdRng::seed_from_u64(5));
        for _ in 0..4 {
            let batch = Tensor::randn([5, 3, 4, 4], (Kind::Float, Device::Cpu));
            assert_eq!(pool.query(&batch).size(), vec![5, 3, 4, 4]);
            assert!(pool.len() <= 2);
        }
    }

    #[test]
    fn test_single_slot_swap() {
        for seed in 0..8 {
            let mut pool = ImagePool::with_rng(1, StdRng::seed_from_u64(seed));
            let a = Tensor::zeros([1, 1, 2, 2], (Kind::Float, Device::Cpu));
            let b = Tensor::ones([1, 1, 2, 2], (Kind::Float, Device::Cpu));

            assert!(same(&pool.query(&a), &a));
            let out = pool.query(&b);

            // Either A comes back and B is stored, or B passes through and A stays
            if same(&out, &a) {
                assert!(same(&pool.images()[0], &b));
            } else {
                assert!(same(&out, &b));
                assert!(same(&pool.images()[0], &a));
            }
        }
    }

    #[test]
    fn test_returned_samples_are_detached() {
        let mut pool = ImagePool::with_rng(2, StdRng::seed_from_u64(1));
        let batch = Tensor::randn([2, 1, 2, 2], (Kind::Float, Device::Cpu)).set_requires_grad(true);
        let out = pool.query(&(&batch * 2.0));
        assert!(!out.requires_grad());
    }
}
