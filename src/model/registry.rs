//! Architecture registry
//!
//! Architecture names from the configuration resolve once, at model
//! construction, to one of these closed variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tch::nn;

use super::discriminator::ConvCritic;
use super::generator::ResnetGenerator;
use super::network::{Critic, ImageGenerator, NetworkConfig};
use crate::error::Error;

/// Generator architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorArch {
    /// Residual generator with a label gate
    Gated,
    /// Residual generator ignoring the label
    Plain,
}

/// Critic architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticArch {
    /// Convolutional critic with a label gate
    Gated,
    /// Convolutional critic ignoring the label
    Plain,
}

impl GeneratorArch {
    /// Construct the network under `vs`
    pub fn build(self, vs: &nn::Path, config: &NetworkConfig) -> Box<dyn ImageGenerator> {
        match self {
            GeneratorArch::Gated => Box::new(ResnetGenerator::new(vs, config.clone(), true)),
            GeneratorArch::Plain => Box::new(ResnetGenerator::new(vs, config.clone(), false)),
        }
    }
}

impl CriticArch {
    /// Construct the network under `vs`
    pub fn build(self, vs: &nn::Path, config: &NetworkConfig) -> Box<dyn Critic> {
        match self {
            CriticArch::Gated => Box::new(ConvCritic::new(vs, config.clone(), true)),
            CriticArch::Plain => Box::new(ConvCritic::new(vs, config.clone(), false)),
        }
    }
}

impl FromStr for GeneratorArch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gated" => Ok(GeneratorArch::Gated),
            "plain" => Ok(GeneratorArch::Plain),
            _ => Err(Error::UnknownArchitecture {
                kind: "generator",
                name: s.to_string(),
            }),
        }
    }
}

impl FromStr for CriticArch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gated" => Ok(CriticArch::Gated),
            "plain" => Ok(CriticArch::Plain),
            _ => Err(Error::UnknownArchitecture {
                kind: "critic",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for GeneratorArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorArch::Gated => write!(f, "gated"),
            GeneratorArch::Plain => write!(f, "plain"),
        }
    }
}

impl fmt::Display for CriticArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CriticArch::Gated => write!(f, "gated"),
            CriticArch::Plain => write!(f, "plain"),
        }
    }
}
