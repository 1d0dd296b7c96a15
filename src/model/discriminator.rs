//! Convolutional Wasserstein critic
//!
//! Two stride-2 convolutions, global average pooling and a linear score.
//! No normalization layers and no sigmoid: the gradient penalty is computed
//! per sample and the score is an unbounded Wasserstein estimate.

use tch::{nn, nn::Module, Kind, Tensor};

use super::network::{Critic, NetworkConfig};

/// Critic network
///
/// Architecture:
/// 1. Conv 4x4 stride 2 (in -> ndf) with LeakyReLU
/// 2. Conv 4x4 stride 2 (ndf -> 2*ndf) with LeakyReLU, optionally gated by label
/// 3. Global average pool and Dense layer to a single score
#[derive(Debug)]
pub struct ConvCritic {
    config: NetworkConfig,
    gate: Option<nn::Embedding>,
    conv1: nn::Conv2D,
    conv2: nn::Conv2D,
    fc: nn::Linear,
}

impl ConvCritic {
    /// Create a new critic; `gated` adds a label gate on the second block
    pub fn new(vs: &nn::Path, config: NetworkConfig, gated: bool) -> Self {
        let ndf = config.ndf;
        let down = nn::ConvConfig {
            stride: 2,
            padding: 1,
            ..Default::default()
        };

        let gate = gated.then(|| {
            nn::embedding(vs / "gate", config.n_classes, ndf * 2, Default::default())
        });
        let conv1 = nn::conv2d(vs / "conv1", config.critic_input_nc(), ndf, 4, down);
        let conv2 = nn::conv2d(vs / "conv2", ndf, ndf * 2, 4, down);
        let fc = nn::linear(vs / "fc", ndf * 2, 1, Default::default());

        Self {
            config,
            gate,
            conv1,
            conv2,
            fc,
        }
    }

    /// Get configuration
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }
}

impl Critic for ConvCritic {
    fn critic(&self, input: &Tensor, label: &Tensor) -> Tensor {
        let batch_size = input.size()[0];

        let x = self.conv1.forward(input).leaky_relu();
        let x = self.conv2.forward(&x).leaky_relu();

        let x = match self.forward_gate(label) {
            Some(gate) => x * gate.view([batch_size, self.config.ndf * 2, 1, 1]),
            None => x,
        };

        let x = x.adaptive_avg_pool2d([1, 1]).flatten(1, -1);
        self.fc.forward(&x)
    }

    fn forward_gate(&self, label: &Tensor) -> Option<Tensor> {
        self.gate
            .as_ref()
            .map(|embedding| embedding.forward(&label.to_kind(Kind::Int64)).sigmoid())
    }
}
