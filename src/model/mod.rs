//! Model module containing the network side of the system
//!
//! This module provides:
//! - Generator / critic interfaces the training core is written against
//! - Residual generator and convolutional critic architectures
//! - The architecture registry and the network/parameter container

mod discriminator;
mod generator;
mod network;
mod networks;
mod registry;

pub use discriminator::ConvCritic;
pub use generator::ResnetGenerator;
pub use network::{Critic, Gated, ImageGenerator, NetworkConfig};
pub use networks::{Networks, CRITIC_TAG, GENERATOR_TAG};
pub use registry::{CriticArch, GeneratorArch};
