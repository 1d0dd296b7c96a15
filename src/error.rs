//! Error types for the pix2pix training core

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Scheduler requested with a policy that has no implementation
    #[error("learning rate policy [{0}] is not implemented")]
    UnsupportedLrPolicy(String),

    /// Architecture name not present in the network registry
    #[error("unknown {kind} architecture: {name}")]
    UnknownArchitecture { kind: &'static str, name: String },

    /// Direction flag other than AtoB / BtoA
    #[error("unknown direction: {0}")]
    UnknownDirection(String),

    /// Input-gradient shape differs from the interpolated input
    #[error("gradient shape {grad:?} does not match input shape {input:?}")]
    ShapeMismatch { grad: Vec<i64>, input: Vec<i64> },

    /// A loss term evaluated to NaN or infinity
    #[error("non-finite {name} loss: {value}")]
    NonFiniteLoss { name: &'static str, value: f64 },

    /// Batch violates the batch schema
    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    /// Operation needs a staged batch
    #[error("no input staged, call set_input first")]
    MissingInput,

    /// Operation needs a generator output
    #[error("no generator output, call forward first")]
    MissingOutput,

    /// Training operation called on an inference-only model
    #[error("model was built for inference only")]
    InferenceOnly,

    /// Generator or critic has no gate signal
    #[error("{0} architecture does not expose a gate signal")]
    GateUnavailable(&'static str),

    /// Noise path requested while nz = 0
    #[error("latent noise is disabled (nz = 0)")]
    NoiseDisabled,

    /// Dataset could not be assembled
    #[error("dataset error: {0}")]
    Dataset(String),

    /// libtorch error
    #[error("tensor error: {0}")]
    Tch(#[from] tch::TchError),

    /// Image decoding/encoding error
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Array reshape error
    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a non-finite loss error if `value` is NaN or infinite
    pub fn check_finite(name: &'static str, value: f64) -> Result<f64> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Error::NonFiniteLoss { name, value })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_finite() {
        assert_eq!(Error::check_finite("D_real", 0.25).unwrap(), 0.25);
        assert!(matches!(
            Error::check_finite("G_L1", f64::NAN),
            Err(Error::NonFiniteLoss { name: "G_L1", .. })
        ));
        assert!(Error::check_finite("G_GAN", f64::INFINITY).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::UnsupportedLrPolicy("cosine".to_string());
        assert_eq!(err.to_string(), "learning rate policy [cosine] is not implemented");
    }
}
