pub mod config;
pub mod error;
pub mod gca;
pub mod graph;
pub mod molecule;
pub mod nn;

// visible in prelude::*;
pub mod prelude {
  pub use crate::config::Config;
  pub use crate::error::{Error, Result};
  pub use crate::gca::{GCA, GCABuilder, ModelState};
  pub use crate::graph::DenseGraph;
  pub use crate::molecule::{Atom, Molecule};
}
