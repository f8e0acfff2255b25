use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("vertex {vertex} out of range for graph with {n_vertices} vertices")]
  InvalidVertex { vertex: usize, n_vertices: usize },

  #[error("feature {feature} out of range for graph with {n_features} features")]
  InvalidFeature { feature: usize, n_features: usize },

  #[error("graph shape mismatch: {0}")]
  Shape(String),

  #[error("unknown atom label {0:?}")]
  UnknownAtom(String),

  #[error("unknown molecule {0:?}")]
  UnknownMolecule(String),

  #[error("batch is empty")]
  EmptyBatch,

  #[error("model format: {0}")]
  Format(#[from] serde_json::Error),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}
