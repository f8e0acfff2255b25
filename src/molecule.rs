use std::str::FromStr;

use crate::error::{Error, Result};
use crate::graph::DenseGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Atom {
  C,
  H,
  N,
  O
}

impl Atom {
  /// Column of the one-hot feature vector.
  #[inline]
  pub fn feature_index(self) -> usize {
    match self {
      Atom::C => 0,
      Atom::H => 1,
      Atom::N => 2,
      Atom::O => 3
    }
  }
}

impl FromStr for Atom {
  type Err = Error;

  fn from_str(label: &str) -> Result<Self> {
    match label {
      "C" => Ok(Atom::C),
      "H" => Ok(Atom::H),
      "N" => Ok(Atom::N),
      "O" => Ok(Atom::O),
      _ => Err(Error::UnknownAtom(label.to_owned()))
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
  pub name: String,
  pub edges: Vec<(usize, usize)>,
  pub atoms: Vec<Atom>
}

impl Molecule {
  pub const NAMES: [&'static str; 4] = ["CH4", "NH3", "H2O", "C2H4"];

  pub fn new<S: AsRef<str>>(name: &str, edges: &[(usize, usize)], labels: &[S]) -> Result<Self> {
    let atoms = labels
      .iter()
      .map(|l| l.as_ref().parse())
      .collect::<Result<Vec<Atom>>>()?;

    Ok(Molecule {
      name: name.to_owned(),
      edges: edges.to_vec(),
      atoms
    })
  }

  pub fn by_name(name: &str) -> Result<Self> {
    match name {
      "CH4" => Molecule::new(name, &[(0, 1), (0, 2), (0, 3), (0, 4)], &["C", "H", "H", "H", "H"]),
      "NH3" => Molecule::new(name, &[(0, 1), (0, 2), (0, 3)], &["N", "H", "H", "H"]),
      "H2O" => Molecule::new(name, &[(0, 1), (0, 2)], &["O", "H", "H"]),
      "C2H4" => Molecule::new(
        name,
        &[(0, 1), (0, 2), (0, 3), (3, 4), (3, 5)],
        &["C", "H", "H", "C", "H", "H"]
      ),
      _ => Err(Error::UnknownMolecule(name.to_owned()))
    }
  }

  pub fn dataset() -> Result<Vec<Molecule>> {
    Molecule::NAMES
      .iter()
      .map(|name| Molecule::by_name(name))
      .collect()
  }

  #[inline]
  pub fn n_atoms(&self) -> usize {
    self.atoms.len()
  }

  /// Dense graph with self loops, both directions of every bond and a
  /// one-hot atom feature per vertex.
  pub fn build(&self, n_features: usize) -> Result<DenseGraph> {
    let mut graph = DenseGraph::new(self.n_atoms(), n_features);
    graph.add_self_loops();

    for &(u, v) in &self.edges {
      graph.add_edge(u, v)?;
    }
    for (v, atom) in self.atoms.iter().enumerate() {
      graph.set_feature(v, atom.feature_index(), 1.0)?;
    }

    Ok(graph)
  }
}

#[cfg(test)]
mod test_molecule {
  use super::*;

  #[test]
  fn test_atom_parse() {
    assert_eq!("N".parse::<Atom>().unwrap(), Atom::N);
    assert!(matches!("Xe".parse::<Atom>(), Err(Error::UnknownAtom(l)) if l == "Xe"));
  }

  #[test]
  fn test_molecule_dataset() {
    let dataset = Molecule::dataset().unwrap();
    let sizes: Vec<_> = dataset.iter().map(Molecule::n_atoms).collect();

    assert_eq!(sizes, vec![5, 4, 3, 6]);
  }

  #[test]
  fn test_molecule_unknown_name() {
    assert!(matches!(Molecule::by_name("C6H6"), Err(Error::UnknownMolecule(_))));
  }

  #[test]
  fn test_molecule_build_water() {
    let graph = Molecule::by_name("H2O").unwrap().build(4).unwrap();

    let expected = [
      [1.0, 1.0, 1.0],
      [1.0, 1.0, 0.0],
      [1.0, 0.0, 1.0]
    ];
    for (i, row) in expected.iter().enumerate() {
      for (j, &x) in row.iter().enumerate() {
        assert_eq!(graph.adj(i, j), x);
      }
    }

    assert_eq!(graph.features().row(0).to_vec(), vec![0.0, 0.0, 0.0, 1.0]);
    assert_eq!(graph.features().row(1).to_vec(), vec![0.0, 1.0, 0.0, 0.0]);
  }

  #[test]
  fn test_molecule_build_ethylene_bonds() {
    let graph = Molecule::by_name("C2H4").unwrap().build(4).unwrap();

    assert_eq!(graph.adj(3, 0), 1.0);
    assert_eq!(graph.adj(5, 3), 1.0);
    assert_eq!(graph.adj(1, 4), 0.0);
    assert_eq!(graph.adjacency().sum(), 6.0 + 2.0 * 5.0);
  }

  #[test]
  fn test_molecule_build_bad_edge() {
    let molecule = Molecule::new("bad", &[(0, 3)], &["C", "H"]).unwrap();

    assert!(matches!(molecule.build(4), Err(Error::InvalidVertex { vertex: 3, .. })));
  }

  #[test]
  fn test_molecule_build_too_few_features() {
    let molecule = Molecule::by_name("H2O").unwrap();

    assert!(matches!(molecule.build(2), Err(Error::InvalidFeature { feature: 3, .. })));
  }
}
