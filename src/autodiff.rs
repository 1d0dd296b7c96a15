//! Autodiff boundary operations used by the training core
//!
//! The losses and step functions only need four graph operations: cut a
//! tensor from the graph, start a fresh leaf, backpropagate a scalar and take
//! an input gradient that stays differentiable. They go through this trait so
//! detachment points are visible at the call site.

use tch::Tensor;

use crate::error::{Error, Result};

/// Graph-level operations on a tensor that participates in autodiff
pub trait DifferentiableTensor: Sized {
    /// Same values, no history
    fn detached(&self) -> Self;

    /// Detached copy that is a new leaf requiring gradients
    fn fresh_leaf(&self) -> Self;

    /// Accumulate gradients of this scalar into every leaf it depends on
    fn backprop(&self);

    /// Gradient of `sum(self)` with respect to `input`.
    ///
    /// The graph is created and retained, so the returned gradient can itself
    /// be backpropagated.
    fn gradient_of_sum(&self, input: &Self) -> Result<Self>;
}

impl DifferentiableTensor for Tensor {
    fn detached(&self) -> Self {
        self.detach()
    }

    fn fresh_leaf(&self) -> Self {
        self.detach().set_requires_grad(true)
    }

    fn backprop(&self) {
        self.backward();
    }

    fn gradient_of_sum(&self, input: &Self) -> Result<Self> {
        let total = self.sum(self.kind());
        let grads = Tensor::f_run_backward(&[&total], &[input], true, true)?;
        grads.into_iter().next().ok_or_else(|| Error::ShapeMismatch {
            grad: vec![],
            input: input.size(),
        })
    }
}
