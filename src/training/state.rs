//! Per-step training state
//!
//! Everything one `optimize_parameters` call reads and writes, kept in one
//! struct that the step functions receive by `&mut`.

use serde::{Deserialize, Serialize};
use tch::Tensor;

use crate::error::{Error, Result};

/// Tensors staged by `set_input`
#[derive(Debug)]
pub struct StepInputs {
    /// Source image (N, C_in, H, W)
    pub real_a: Tensor,
    /// Target image (N, C_out, H, W)
    pub real_b: Tensor,
    /// Source mask (N, 1, H, W)
    pub mask: Tensor,
    /// Class ids (N,)
    pub label: Tensor,
    /// Latent noise (N, nz), present when nz > 0
    pub noise: Option<Tensor>,
    /// Sparse view of the source used for display
    pub sparse_real_a: Tensor,
}

impl StepInputs {
    /// Batch size
    pub fn batch_size(&self) -> i64 {
        self.real_a.size()[0]
    }
}

/// The four losses reported after each step
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentErrors {
    /// Generator adversarial term (weighted)
    #[serde(rename = "G_GAN")]
    pub g_gan: f64,
    /// Generator masked L1 term (weighted)
    #[serde(rename = "G_L1")]
    pub g_l1: f64,
    /// Critic loss on real inputs
    #[serde(rename = "D_real")]
    pub d_real: f64,
    /// Critic loss on fake inputs
    #[serde(rename = "D_fake")]
    pub d_fake: f64,
}

impl CurrentErrors {
    /// Named values in reporting order
    pub fn to_ordered(&self) -> [(&'static str, f64); 4] {
        [
            ("G_GAN", self.g_gan),
            ("G_L1", self.g_l1),
            ("D_real", self.d_real),
            ("D_fake", self.d_fake),
        ]
    }

    /// All four values are finite
    pub fn is_finite(&self) -> bool {
        self.to_ordered().iter().all(|(_, v)| v.is_finite())
    }
}

/// Position inside `optimize_parameters`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Forward,
    DiscriminatorUpdated,
    GeneratorUpdated,
}

/// Mutable state of the current training step
#[derive(Debug, Default)]
pub struct TrainingState {
    /// Staged batch
    pub inputs: Option<StepInputs>,
    /// Generator output of the last forward pass
    pub fake_b: Option<Tensor>,
    /// Losses of the last step
    pub errors: CurrentErrors,
    /// Weighted gradient penalty of the last critic update
    pub penalty: f64,
    /// Last phase entered; stays put if a step fails
    pub phase: Phase,
}

impl TrainingState {
    /// Staged inputs, or `MissingInput`
    pub fn inputs(&self) -> Result<&StepInputs> {
        self.inputs.as_ref().ok_or(Error::MissingInput)
    }

    /// Generator output, or `MissingOutput`
    pub fn fake_b(&self) -> Result<&Tensor> {
        self.fake_b.as_ref().ok_or(Error::MissingOutput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_serialize_with_report_names() {
        let errors = CurrentErrors {
            g_gan: 1.0,
            g_l1: 2.0,
            d_real: 3.0,
            d_fake: 4.0,
        };
        let json = serde_json::to_string(&errors).unwrap();
        assert_eq!(json, r#"{"G_GAN":1.0,"G_L1":2.0,"D_real":3.0,"D_fake":4.0}"#);
        assert!(errors.is_finite());
    }

    #[test]
    fn test_empty_state_reports_missing_tensors() {
        let state = TrainingState::default();
        assert!(matches!(state.inputs(), Err(Error::MissingInput)));
        assert!(matches!(state.fake_b(), Err(Error::MissingOutput)));
        assert_eq!(state.phase, Phase::Idle);
    }
}
