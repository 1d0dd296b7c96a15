//! Interfaces the training core uses to talk to the networks
//!
//! The step functions only see these traits, so any architecture (or a test
//! double) can stand in for the generator and critic.

use tch::Tensor;

/// Shape hyperparameters shared by the architectures
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Channels of the source image
    pub input_nc: i64,
    /// Channels of the target image
    pub output_nc: i64,
    /// Generator base filters
    pub ngf: i64,
    /// Critic base filters
    pub ndf: i64,
    /// Number of label classes
    pub n_classes: i64,
    /// Latent noise size (0 disables noise)
    pub nz: i64,
    /// Critic sees source and target stacked along channels
    pub img_conditional_d: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            input_nc: 3,
            output_nc: 3,
            ngf: 64,
            ndf: 64,
            n_classes: 10,
            nz: 0,
            img_conditional_d: true,
        }
    }
}

impl NetworkConfig {
    /// Channels of the critic input
    pub fn critic_input_nc(&self) -> i64 {
        if self.img_conditional_d {
            self.input_nc + self.output_nc
        } else {
            self.output_nc
        }
    }
}

/// Generator: source image + label (+ noise) -> target image
pub trait ImageGenerator {
    /// Full forward pass
    fn generate(&self, image: &Tensor, label: &Tensor, noise: Option<&Tensor>) -> Tensor;

    /// Gate capability, if the architecture conditions through a gate signal
    fn gated(&self) -> Option<&dyn Gated> {
        None
    }
}

/// Split forward pass of a label-gated generator
pub trait Gated {
    /// Label -> gate signal of shape (batch, gate_dim)
    fn forward_gate(&self, label: &Tensor) -> Tensor;

    /// Image + gate signal (+ noise) -> target image
    fn forward_main(&self, image: &Tensor, gate: &Tensor, noise: Option<&Tensor>) -> Tensor;
}

/// Wasserstein critic: input (pair or image) + label -> score of shape (batch, 1)
pub trait Critic {
    /// Critic score, unbounded
    fn critic(&self, input: &Tensor, label: &Tensor) -> Tensor;

    /// Gate signal for a label, if the critic is gated
    fn forward_gate(&self, _label: &Tensor) -> Option<Tensor> {
        None
    }
}
