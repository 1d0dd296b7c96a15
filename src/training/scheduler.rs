//! Learning-rate schedules
//!
//! Only the linear-decay "lambda" policy is implemented: the rate stays at
//! its base value for `niter` epochs, then decays linearly to zero over
//! `niter_decay` epochs. Any other policy name fails at construction.

use std::str::FromStr;

use super::optimizer::StepOptimizer;
use crate::error::{Error, Result};

/// Supported learning-rate policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LrPolicy {
    /// Constant, then linear decay to zero
    Lambda,
}

impl FromStr for LrPolicy {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "lambda" => Ok(LrPolicy::Lambda),
            other => Err(Error::UnsupportedLrPolicy(other.to_string())),
        }
    }
}

/// Epoch-based scheduler for one optimizer
#[derive(Debug, Clone)]
pub struct LrScheduler {
    policy: LrPolicy,
    base_lr: f64,
    epoch_count: usize,
    niter: usize,
    niter_decay: usize,
    last_epoch: usize,
}

impl LrScheduler {
    /// Create a scheduler; fails on an unknown policy name
    pub fn new(
        policy: &str,
        base_lr: f64,
        epoch_count: usize,
        niter: usize,
        niter_decay: usize,
    ) -> Result<Self> {
        Ok(Self {
            policy: policy.parse()?,
            base_lr,
            epoch_count,
            niter,
            niter_decay,
            last_epoch: 0,
        })
    }

    /// Multiplier of the base rate after `epoch` scheduler steps
    pub fn factor(&self, epoch: usize) -> f64 {
        match self.policy {
            LrPolicy::Lambda => {
                let past = (epoch + 1 + self.epoch_count) as f64 - self.niter as f64;
                1.0 - past.max(0.0) / (self.niter_decay + 1) as f64
            }
        }
    }

    /// Learning rate at the current position
    pub fn current_lr(&self) -> f64 {
        self.base_lr * self.factor(self.last_epoch)
    }

    /// Advance one epoch and apply the new rate to `optimizer`
    pub fn step(&mut self, optimizer: &mut dyn StepOptimizer) -> f64 {
        self.last_epoch += 1;
        let lr = self.current_lr();
        optimizer.set_lr(lr);
        lr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct LrProbe(f64);

    impl StepOptimizer for LrProbe {
        fn zero_grad(&mut self) {}
        fn step(&mut self) {}
        fn set_lr(&mut self, lr: f64) {
            self.0 = lr;
        }
    }

    #[test]
    fn test_unknown_policy_fails_fast() {
        let err = LrScheduler::new("step", 1e-3, 1, 10, 10).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLrPolicy(ref p) if p == "step"));
    }

    #[test]
    fn test_lambda_constant_then_linear_decay() {
        // epoch_count 1, niter 2, niter_decay 3
        let mut scheduler = LrScheduler::new("lambda", 1.0, 1, 2, 3).unwrap();
        let mut probe = LrProbe(1.0);

        assert_relative_eq!(scheduler.current_lr(), 1.0);
        assert_relative_eq!(scheduler.step(&mut probe), 0.75);
        assert_relative_eq!(scheduler.step(&mut probe), 0.5);
        assert_relative_eq!(scheduler.step(&mut probe), 0.25);
        assert_relative_eq!(scheduler.step(&mut probe), 0.0);
        assert_relative_eq!(probe.0, 0.0);
    }

    #[test]
    fn test_resumed_schedule_starts_decayed() {
        let scheduler = LrScheduler::new("lambda", 2e-4, 6, 5, 4).unwrap();
        // 0 + 1 + 6 - 5 = 2 epochs into the decay of 5 steps
        assert_relative_eq!(scheduler.current_lr(), 2e-4 * 0.6, epsilon = 1e-12);
    }
}
