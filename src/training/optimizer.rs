//! Optimizer interface used by the step protocol

use tch::nn;

/// Parameter update: zero gradients, apply a step, change the learning rate
pub trait StepOptimizer {
    fn zero_grad(&mut self);
    fn step(&mut self);
    fn set_lr(&mut self, lr: f64);
}

impl StepOptimizer for nn::Optimizer {
    fn zero_grad(&mut self) {
        nn::Optimizer::zero_grad(self);
    }

    fn step(&mut self) {
        nn::Optimizer::step(self);
    }

    fn set_lr(&mut self, lr: f64) {
        nn::Optimizer::set_lr(self, lr);
    }
}
