//! Forward and backward passes of one training step
//!
//! These functions only compute losses and accumulate gradients. Zeroing
//! gradients and stepping optimizers is left to the caller.

use tch::Tensor;
use tracing::debug;

use super::image_pool::ImagePool;
use super::losses::{gradient_penalty, masked_l1, WganLoss};
use super::state::{Phase, TrainingState};
use crate::autodiff::DifferentiableTensor;
use crate::error::{Error, Result};
use crate::model::{Critic, ImageGenerator};

/// Loss weights and critic conditioning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossWeights {
    /// Weight of the masked L1 term
    pub lambda_a: f64,
    /// Weight of the generator adversarial term
    pub lambda_gan: f64,
    /// Weight of the gradient penalty
    pub wgan_gp_lambda: f64,
    /// Target gradient norm of the penalty
    pub wgan_gp_center: f64,
    /// Critic sees (source, image) pairs
    pub img_conditional_d: bool,
}

impl Default for LossWeights {
    fn default() -> Self {
        Self {
            lambda_a: 100.0,
            lambda_gan: 1.0,
            wgan_gp_lambda: 10.0,
            wgan_gp_center: 1.0,
            img_conditional_d: true,
        }
    }
}

impl LossWeights {
    /// Critic input for `image`, stacked with `source` when conditional
    fn critic_input(&self, source: &Tensor, image: &Tensor) -> Tensor {
        if self.img_conditional_d {
            Tensor::cat(&[source, image], 1)
        } else {
            image.shallow_clone()
        }
    }
}

/// Run the generator on the staged inputs and store `fake_b`
pub fn forward(state: &mut TrainingState, generator: &dyn ImageGenerator) -> Result<()> {
    let inputs = state.inputs()?;
    let fake_b = generator.generate(&inputs.real_a, &inputs.label, inputs.noise.as_ref());
    if fake_b.size()[0] != inputs.batch_size() {
        return Err(Error::InvalidBatch(format!(
            "generator returned {} samples for a batch of {}",
            fake_b.size()[0],
            inputs.batch_size()
        )));
    }

    state.fake_b = Some(fake_b);
    state.phase = Phase::Forward;
    Ok(())
}

/// Critic losses and gradient penalty
///
/// Accumulates critic gradients from `0.5 * (D_fake + D_real)` and then from
/// the weighted penalty, in two backward passes. The generator output is
/// detached, so no gradient reaches the generator.
pub fn backward_d<R: rand::Rng>(
    state: &mut TrainingState,
    critic: &dyn Critic,
    criterion: &mut WganLoss,
    pool: &mut ImagePool<R>,
    weights: &LossWeights,
) -> Result<()> {
    let inputs = state.inputs()?;
    let fake_b = state.fake_b()?.detached();

    let fake = if weights.img_conditional_d {
        pool.query(&weights.critic_input(&inputs.real_a, &fake_b))
    } else {
        fake_b
    };
    let pred_fake = critic.critic(&fake, &inputs.label);
    let loss_d_fake = criterion.evaluate(&pred_fake, false);

    let real = weights.critic_input(&inputs.real_a, &inputs.real_b);
    let pred_real = critic.critic(&real, &inputs.label);
    let loss_d_real = criterion.evaluate(&pred_real, true);

    let d_fake = Error::check_finite("D_fake", loss_d_fake.double_value(&[]))?;
    let d_real = Error::check_finite("D_real", loss_d_real.double_value(&[]))?;

    let loss_d = (loss_d_fake + loss_d_real) * 0.5;
    loss_d.backprop();

    let penalty = gradient_penalty(critic, &real, &fake, &inputs.label, weights.wgan_gp_center)?
        * weights.wgan_gp_lambda;
    let penalty_value = Error::check_finite("D_gp", penalty.double_value(&[]))?;
    penalty.backprop();

    debug!(d_real, d_fake, penalty = penalty_value, "critic backward");
    state.errors.d_fake = d_fake;
    state.errors.d_real = d_real;
    state.penalty = penalty_value;
    Ok(())
}

/// Generator adversarial and masked L1 losses
///
/// The critic is not detached, so it may accumulate gradient here as well;
/// the next critic `zero_grad` clears it.
pub fn backward_g(
    state: &mut TrainingState,
    critic: &dyn Critic,
    criterion: &mut WganLoss,
    weights: &LossWeights,
) -> Result<()> {
    let inputs = state.inputs()?;
    let fake_b = state.fake_b()?;

    let fake = weights.critic_input(&inputs.real_a, fake_b);
    let pred_fake = critic.critic(&fake, &inputs.label);
    let loss_g_gan = criterion.evaluate(&pred_fake, true) * weights.lambda_gan;

    // Reconstruction target is the masked source
    let loss_g_l1 = masked_l1(fake_b, &inputs.real_a, &inputs.mask) * weights.lambda_a;

    let g_gan = Error::check_finite("G_GAN", loss_g_gan.double_value(&[]))?;
    let g_l1 = Error::check_finite("G_L1", loss_g_l1.double_value(&[]))?;

    (loss_g_gan + loss_g_l1).backprop();

    debug!(g_gan, g_l1, "generator backward");
    state.errors.g_gan = g_gan;
    state.errors.g_l1 = g_l1;
    Ok(())
}
