//! Batch schema handed to the model by the batch source

use std::fmt;
use std::str::FromStr;

use tch::{Device, Tensor};

use crate::error::Error;

/// Translation direction of a paired dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// A is the source, B the target
    AtoB,
    /// B is the source, A the target
    BtoA,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AtoB" => Ok(Direction::AtoB),
            "BtoA" => Ok(Direction::BtoA),
            other => Err(Error::UnknownDirection(other.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::AtoB => write!(f, "AtoB"),
            Direction::BtoA => write!(f, "BtoA"),
        }
    }
}

/// One batch as produced by a dataset
///
/// All tensors share the batch dimension N:
/// - `a`, `b`: (N, C, H, W) images in [-1, 1]
/// - `a_mask`: (N, 1, H, W) soft mask in [0, 1]
/// - `label`: (N,) int64 class ids
#[derive(Debug)]
pub struct RawBatch {
    pub a: Tensor,
    pub b: Tensor,
    pub a_mask: Tensor,
    pub label: Tensor,
    /// Optional sparse representation of A
    pub a_sparse: Option<Tensor>,
}

impl RawBatch {
    /// Number of samples
    pub fn batch_size(&self) -> i64 {
        self.a.size()[0]
    }

    /// Source and target images for `direction`
    pub fn oriented(&self, direction: Direction) -> (&Tensor, &Tensor) {
        match direction {
            Direction::AtoB => (&self.a, &self.b),
            Direction::BtoA => (&self.b, &self.a),
        }
    }

    /// Move every tensor to `device`
    pub fn to_device(&self, device: Device) -> Self {
        Self {
            a: self.a.to_device(device),
            b: self.b.to_device(device),
            a_mask: self.a_mask.to_device(device),
            label: self.label.to_device(device),
            a_sparse: self.a_sparse.as_ref().map(|t| t.to_device(device)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Kind;

    #[test]
    fn test_direction_parse() {
        assert_eq!("AtoB".parse::<Direction>().unwrap(), Direction::AtoB);
        assert_eq!("BtoA".parse::<Direction>().unwrap(), Direction::BtoA);
        assert!("AtoC".parse::<Direction>().is_err());
        assert_eq!(Direction::BtoA.to_string(), "BtoA");
    }

    #[test]
    fn test_oriented_swaps_images() {
        let opts = (Kind::Float, Device::Cpu);
        let batch = RawBatch {
            a: Tensor::zeros([2, 1, 4, 4], opts),
            b: Tensor::ones([2, 3, 4, 4], opts),
            a_mask: Tensor::ones([2, 1, 4, 4], opts),
            label: Tensor::from_slice(&[0i64, 1]),
            a_sparse: None,
        };

        let (source, target) = batch.oriented(Direction::BtoA);
        assert_eq!(source.size()[1], 3);
        assert_eq!(target.size()[1], 1);
        assert_eq!(batch.batch_size(), 2);
    }
}
