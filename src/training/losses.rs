//! Loss functions for WGAN-GP training
//!
//! Implements the Wasserstein critic criterion, the gradient penalty on
//! real/fake interpolates and the masked L1 reconstruction term.

use tch::{Kind, Reduction, Tensor};

use crate::autodiff::DifferentiableTensor;
use crate::error::{Error, Result};
use crate::model::Critic;

/// Wasserstein criterion with cached real/fake target tensors
///
/// `loss = mean((2 * target - 1) * mean(critic_output))` with target 1 for
/// real and 0 for fake, i.e. `+mean(D)` for real and `-mean(D)` for fake.
/// No sigmoid and no clamping.
#[derive(Debug)]
pub struct WganLoss {
    real_label: f64,
    fake_label: f64,
    real_target: Option<Tensor>,
    fake_target: Option<Tensor>,
}

impl Default for WganLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl WganLoss {
    /// Criterion with targets 1 (real) and 0 (fake)
    pub fn new() -> Self {
        Self {
            real_label: 1.0,
            fake_label: 0.0,
            real_target: None,
            fake_target: None,
        }
    }

    /// Target tensor shaped like `input`, rebuilt only when the shape,
    /// kind or device changes
    pub fn target_tensor(&mut self, input: &Tensor, is_real: bool) -> Tensor {
        let (slot, value) = if is_real {
            (&mut self.real_target, self.real_label)
        } else {
            (&mut self.fake_target, self.fake_label)
        };

        let stale = match slot {
            Some(t) => {
                t.size() != input.size() || t.kind() != input.kind() || t.device() != input.device()
            }
            None => true,
        };
        if stale {
            *slot = None;
        }

        slot.get_or_insert_with(|| {
            Tensor::full(input.size().as_slice(), value, (input.kind(), input.device()))
        })
        .shallow_clone()
    }

    /// Evaluate the criterion on critic scores
    pub fn evaluate(&mut self, critic_output: &Tensor, is_real: bool) -> Tensor {
        let target = self.target_tensor(critic_output, is_real);
        let sign = target * 2.0 - 1.0;
        (sign * critic_output.mean(critic_output.kind())).mean(critic_output.kind())
    }
}

/// Gradient penalty on random interpolates between `real` and `fake`
///
/// `mean_n((||grad_n||_2 - center)^2)` where `grad_n` is the gradient of the
/// summed critic score with respect to the n-th interpolate. The result stays
/// differentiable with respect to the critic parameters.
pub fn gradient_penalty(
    critic: &dyn Critic,
    real: &Tensor,
    fake: &Tensor,
    label: &Tensor,
    center: f64,
) -> Result<Tensor> {
    let batch_size = real.size()[0];

    // One eps per sample, broadcast over the remaining dims
    let mut eps_shape = vec![1i64; real.dim()];
    eps_shape[0] = batch_size;
    let eps = Tensor::rand(eps_shape.as_slice(), (real.kind(), real.device()));

    let interp: Tensor = (1.0 - &eps) * real + &eps * fake;
    let interp = interp.fresh_leaf();

    let d_out = critic.critic(&interp, label);
    let grad = d_out.gradient_of_sum(&interp)?;
    if grad.size() != interp.size() {
        return Err(Error::ShapeMismatch {
            grad: grad.size(),
            input: interp.size(),
        });
    }

    let norm = squared_grad_norm(&grad, batch_size).sqrt();
    Ok((norm - center).pow_tensor_scalar(2).mean(Kind::Float))
}

/// Per-sample squared L2 norm of a gradient tensor
fn squared_grad_norm(grad: &Tensor, batch_size: i64) -> Tensor {
    grad.pow_tensor_scalar(2)
        .view([batch_size, -1])
        .sum_dim_intlist([1i64].as_slice(), false, Kind::Float)
}

/// L1 distance between `fake` and `source`, both gated by `mask`
///
/// `mask` has one channel and is broadcast to all channels of `fake`.
/// Positions where the mask is 0 contribute nothing.
pub fn masked_l1(fake: &Tensor, source: &Tensor, mask: &Tensor) -> Tensor {
    let gate = mask.expand_as(fake);
    (fake * &gate).l1_loss(&(source * &gate), Reduction::Mean)
}
