//! Residual image-to-image generator
//!
//! Same-resolution translator: a 3x3 stem, a stack of residual blocks and a
//! tanh head. The gated variant scales every residual branch by a
//! label-dependent gate signal, which is what makes latent-space
//! interpolation between labels possible.

use tch::{nn, nn::Module, Kind, Tensor};

use super::network::{Gated, ImageGenerator, NetworkConfig};

/// Number of residual blocks in the trunk
const NUM_BLOCKS: usize = 2;

/// Residual generator network
///
/// Architecture:
/// 1. Conv 3x3 stem (input_nc -> ngf) with LeakyReLU
/// 2. Optional noise projection added channel-wise
/// 3. Residual blocks, each branch optionally scaled by the gate signal
/// 4. Conv 3x3 head (ngf -> output_nc) with Tanh
#[derive(Debug)]
pub struct ResnetGenerator {
    config: NetworkConfig,
    /// Label embedding producing the gate signal
    gate: Option<nn::Embedding>,
    /// Noise projection to one offset per channel
    noise_proj: Option<nn::Linear>,
    conv_in: nn::Conv2D,
    blocks: Vec<(nn::Conv2D, nn::Conv2D)>,
    conv_out: nn::Conv2D,
}

impl ResnetGenerator {
    /// Create a new generator; `gated` adds the label gate
    pub fn new(vs: &nn::Path, config: NetworkConfig, gated: bool) -> Self {
        let ngf = config.ngf;
        let same = nn::ConvConfig {
            padding: 1,
            ..Default::default()
        };

        let gate = gated.then(|| {
            nn::embedding(vs / "gate", config.n_classes, ngf, Default::default())
        });
        let noise_proj = (config.nz > 0)
            .then(|| nn::linear(vs / "noise_proj", config.nz, ngf, Default::default()));

        let conv_in = nn::conv2d(vs / "conv_in", config.input_nc, ngf, 3, same);
        let blocks = (0..NUM_BLOCKS)
            .map(|i| {
                let block = vs / format!("block{}", i);
                (
                    nn::conv2d(&block / "conv1", ngf, ngf, 3, same),
                    nn::conv2d(&block / "conv2", ngf, ngf, 3, same),
                )
            })
            .collect();
        let conv_out = nn::conv2d(vs / "conv_out", ngf, config.output_nc, 3, same);

        Self {
            config,
            gate,
            noise_proj,
            conv_in,
            blocks,
            conv_out,
        }
    }

    /// Get configuration
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    fn trunk(&self, image: &Tensor, gate: Option<&Tensor>, noise: Option<&Tensor>) -> Tensor {
        let batch_size = image.size()[0];
        let ngf = self.config.ngf;

        let mut h = self.conv_in.forward(image).leaky_relu();

        if let (Some(proj), Some(z)) = (&self.noise_proj, noise) {
            h = &h + proj.forward(z).view([batch_size, ngf, 1, 1]);
        }

        // Gate computed once per sample, broadcast over space
        let scale = gate.map(|g| g.view([batch_size, ngf, 1, 1]));

        for (conv1, conv2) in &self.blocks {
            let branch = conv2.forward(&conv1.forward(&h).leaky_relu());
            h = match &scale {
                Some(s) => &h + branch * s,
                None => &h + branch,
            };
        }

        self.conv_out.forward(&h.leaky_relu()).tanh()
    }
}

impl ImageGenerator for ResnetGenerator {
    fn generate(&self, image: &Tensor, label: &Tensor, noise: Option<&Tensor>) -> Tensor {
        match &self.gate {
            Some(_) => {
                let gate = self.forward_gate(label);
                self.trunk(image, Some(&gate), noise)
            }
            None => self.trunk(image, None, noise),
        }
    }

    fn gated(&self) -> Option<&dyn Gated> {
        self.gate.as_ref().map(|_| self as &dyn Gated)
    }
}

impl Gated for ResnetGenerator {
    fn forward_gate(&self, label: &Tensor) -> Tensor {
        match &self.gate {
            Some(embedding) => embedding.forward(&label.to_kind(Kind::Int64)).sigmoid(),
            // Ungated networks behave as a fully open gate
            None => Tensor::ones(
                [label.size()[0], self.config.ngf],
                (Kind::Float, label.device()),
            ),
        }
    }

    fn forward_main(&self, image: &Tensor, gate: &Tensor, noise: Option<&Tensor>) -> Tensor {
        self.trunk(image, Some(gate), noise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::VarStore, Device};

    fn config(nz: i64) -> NetworkConfig {
        NetworkConfig {
            input_nc: 1,
            output_nc: 1,
            ngf: 8,
            ndf: 8,
            n_classes: 3,
            nz,
            img_conditional_d: false,
        }
    }

    #[test]
    fn test_generator_output_shape() {
        let vs = VarStore::new(Device::Cpu);
        let gen = ResnetGenerator::new(&vs.root(), config(0), true);

        let image = Tensor::randn([2, 1, 4, 4], (Kind::Float, Device::Cpu));
        let label = Tensor::from_slice(&[0i64, 2]);
        let output = gen.generate(&image, &label, None);

        assert_eq!(output.size(), vec![2, 1, 4, 4]);
        let max_abs = output.abs().max().double_value(&[]);
        assert!(max_abs <= 1.0);
    }

    #[test]
    fn test_generator_with_noise() {
        let vs = VarStore::new(Device::Cpu);
        let gen = ResnetGenerator::new(&vs.root(), config(4), false);

        let image = Tensor::randn([3, 1, 8, 8], (Kind::Float, Device::Cpu));
        let label = Tensor::from_slice(&[0i64, 1, 2]);
        let noise = Tensor::randn([3, 4], (Kind::Float, Device::Cpu));

        assert_eq!(gen.generate(&image, &label, Some(&noise)).size(), vec![3, 1, 8, 8]);
        assert!(gen.gated().is_none());
    }

    #[test]
    fn test_gated_split_matches_full_forward() {
        let vs = VarStore::new(Device::Cpu);
        let gen = ResnetGenerator::new(&vs.root(), config(0), true);

        let image = Tensor::randn([2, 1, 4, 4], (Kind::Float, Device::Cpu));
        let label = Tensor::from_slice(&[1i64, 1]);

        let gated = gen.gated().unwrap();
        let gate = gated.forward_gate(&label);
        assert_eq!(gate.size(), vec![2, 8]);

        let split = gated.forward_main(&image, &gate, None);
        let full = gen.generate(&image, &label, None);
        let diff = (split - full).abs().max().double_value(&[]);
        assert!(diff < 1e-6);
    }
}
