//! Latent interpolation diagnostics
//!
//! Sweeps either the label gate or the latent noise between two endpoints
//! and collects one generator output per step.

use tch::Tensor;

use crate::model::{Gated, ImageGenerator};

/// `num` evenly spaced weights from 0 to 1 inclusive
pub fn interpolation_weights(num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..num).map(|i| i as f64 / (num - 1) as f64).collect(),
    }
}

/// Outputs for gates blended between two labels
///
/// Step `i` uses `gate(label_1) * a_i + gate(label_2) * (1 - a_i)`, so the
/// sweep starts at `label_2` and ends at `label_1`.
pub fn label_frames(
    gated: &dyn Gated,
    image: &Tensor,
    label_1: &Tensor,
    label_2: &Tensor,
    num: usize,
    noise: Option<&Tensor>,
) -> Vec<Tensor> {
    tch::no_grad(|| {
        let gate_1 = gated.forward_gate(label_1);
        let gate_2 = gated.forward_gate(label_2);

        interpolation_weights(num)
            .into_iter()
            .map(|a| {
                let gate = &gate_1 * a + &gate_2 * (1.0 - a);
                gated.forward_main(image, &gate, noise)
            })
            .collect()
    })
}

/// Outputs for noise blended between two endpoints of shape (nz,)
pub fn noise_frames(
    generator: &dyn ImageGenerator,
    image: &Tensor,
    label: &Tensor,
    noise_1: &Tensor,
    noise_2: &Tensor,
    num: usize,
) -> Vec<Tensor> {
    let batch_size = image.size()[0];
    tch::no_grad(|| {
        interpolation_weights(num)
            .into_iter()
            .map(|a| {
                let z = (noise_1 * a + noise_2 * (1.0 - a))
                    .unsqueeze(0)
                    .repeat([batch_size, 1]);
                generator.generate(image, label, Some(&z))
            })
            .collect()
    })
}

/// Sum of all frames, shown normalized as an overlay of the sweep
pub fn shadow(frames: &[Tensor]) -> Option<Tensor> {
    let (first, rest) = frames.split_first()?;
    Some(rest.iter().fold(first.shallow_clone(), |acc, f| acc + f))
}
