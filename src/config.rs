use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hyperparameters of a GCA model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
  /// Graph-convolution levels in the encoder.
  pub levels: usize,
  /// Largest graph the model accepts.
  pub max_vertices: usize,
  pub features: usize,
  pub hiddens: usize,
  /// Dense layers applied to every vertex after the encoder.
  pub depth: usize,
  /// Receptive-field radius of one level.
  pub radius: usize,
  pub momentum: f64,
  pub seed: Option<u64>
}

impl Config {
  pub const LEVELS: usize = 5;
  pub const MAX_VERTICES: usize = 50;
  pub const FEATURES: usize = 4;
  pub const HIDDENS: usize = 10;
  pub const DEPTH: usize = 3;
  pub const RADIUS: usize = 1;
  pub const MOMENTUM: f64 = 0.9;

  pub fn validate(&self) -> Result<()> {
    let positive = [
      ("levels", self.levels),
      ("max_vertices", self.max_vertices),
      ("features", self.features),
      ("hiddens", self.hiddens),
      ("depth", self.depth)
    ];
    for (name, value) in positive {
      if value == 0 {
        return Err(Error::Config(format!("{name} must be at least 1")));
      }
    }

    if !(0.0..1.0).contains(&self.momentum) {
      return Err(Error::Config(format!("momentum must lie in [0, 1), got {}", self.momentum)));
    }

    Ok(())
  }
}

impl Default for Config {
  fn default() -> Self {
    Config {
      levels: Self::LEVELS,
      max_vertices: Self::MAX_VERTICES,
      features: Self::FEATURES,
      hiddens: Self::HIDDENS,
      depth: Self::DEPTH,
      radius: Self::RADIUS,
      momentum: Self::MOMENTUM,
      seed: None
    }
  }
}

#[cfg(test)]
mod test_config {
  use super::*;

  #[test]
  fn test_config_default_is_valid() {
    let config = Config::default();

    assert_eq!(config.levels, 5);
    assert_eq!(config.max_vertices, 50);
    assert_eq!(config.hiddens, 10);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_config_rejects_zero_depth() {
    let config = Config { depth: 0, ..Config::default() };

    assert!(matches!(config.validate(), Err(Error::Config(_))));
  }

  #[test]
  fn test_config_rejects_bad_momentum() {
    let config = Config { momentum: 1.5, ..Config::default() };

    assert!(matches!(config.validate(), Err(Error::Config(_))));
  }
}
