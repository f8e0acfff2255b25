use ndarray::{Array2, ArrayView2};

use crate::error::{Error, Result};

/// Dense adjacency + feature representation of a small graph.
/// Both matrices are row-major: `adj` is n x n, `feature` is n x n_features.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseGraph {
  n_vertices: usize,
  n_features: usize,
  adj: Vec<f64>,
  feature: Vec<f64>
}

impl DenseGraph {
  pub fn new(n_vertices: usize, n_features: usize) -> Self {
    DenseGraph {
      n_vertices,
      n_features,
      adj: vec![0.0; n_vertices * n_vertices],
      feature: vec![0.0; n_vertices * n_features]
    }
  }

  pub fn add_edge(&mut self, u: usize, v: usize) -> Result<()> {
    self.check_vertex(u)?;
    self.check_vertex(v)?;

    let n = self.n_vertices;
    self.adj[u * n + v] = 1.0;
    self.adj[v * n + u] = 1.0;
    Ok(())
  }

  pub fn add_self_loops(&mut self) {
    let n = self.n_vertices;
    for i in 0..n {
      self.adj[i * n + i] = 1.0;
    }
  }

  pub fn set_feature(&mut self, v: usize, f: usize, value: f64) -> Result<()> {
    self.check_vertex(v)?;
    if f >= self.n_features {
      return Err(Error::InvalidFeature { feature: f, n_features: self.n_features });
    }

    self.feature[v * self.n_features + f] = value;
    Ok(())
  }

  #[inline]
  pub fn n_vertices(&self) -> usize {
    self.n_vertices
  }

  #[inline]
  pub fn n_features(&self) -> usize {
    self.n_features
  }

  #[inline]
  pub fn adj(&self, u: usize, v: usize) -> f64 {
    self.adj[u * self.n_vertices + v]
  }

  #[inline]
  pub fn feature(&self, v: usize, f: usize) -> f64 {
    self.feature[v * self.n_features + f]
  }

  pub fn adjacency(&self) -> ArrayView2<'_, f64> {
    // shape always matches the buffer length
    ArrayView2::from_shape((self.n_vertices, self.n_vertices), &self.adj)
      .expect("adjacency buffer is n x n")
  }

  pub fn features(&self) -> ArrayView2<'_, f64> {
    ArrayView2::from_shape((self.n_vertices, self.n_features), &self.feature)
      .expect("feature buffer is n x n_features")
  }

  /// Row-normalised reach matrix: entry (i, j) is 1/|N_r(i)| when j lies
  /// within `radius` hops of i, self included.
  pub fn receptive_field(&self, radius: usize) -> Array2<f64> {
    let n = self.n_vertices;
    let mut reach = Array2::<bool>::from_shape_fn((n, n), |(i, j)| i == j);

    for _ in 0..radius {
      let prev = reach.clone();
      for i in 0..n {
        for k in 0..n {
          if !prev[[i, k]] {
            continue;
          }
          for j in 0..n {
            if self.adj(k, j) != 0.0 {
              reach[[i, j]] = true;
            }
          }
        }
      }
    }

    let mut field = Array2::<f64>::zeros((n, n));
    for i in 0..n {
      let count = reach.row(i).iter().filter(|&&r| r).count() as f64;
      for j in 0..n {
        if reach[[i, j]] {
          field[[i, j]] = 1.0 / count;
        }
      }
    }
    field
  }

  #[inline]
  fn check_vertex(&self, v: usize) -> Result<()> {
    if v >= self.n_vertices {
      return Err(Error::InvalidVertex { vertex: v, n_vertices: self.n_vertices });
    }
    Ok(())
  }
}

impl AsRef<DenseGraph> for DenseGraph {
  fn as_ref(&self) -> &DenseGraph {
    self
  }
}

#[cfg(test)]
mod test_graph {
  use super::*;

  fn path3() -> DenseGraph {
    // 0 - 1 - 2
    let mut g = DenseGraph::new(3, 2);
    g.add_self_loops();
    g.add_edge(0, 1).unwrap();
    g.add_edge(1, 2).unwrap();
    g
  }

  #[test]
  fn test_graph_new() {
    let g = DenseGraph::new(4, 3);

    assert_eq!(g.n_vertices(), 4);
    assert_eq!(g.n_features(), 3);
    assert_eq!(g.adjacency().dim(), (4, 4));
    assert_eq!(g.features().dim(), (4, 3));
    assert!(g.adjacency().iter().all(|&x| x == 0.0));
  }

  #[test]
  fn test_graph_dimensions_follow_buffers() {
    let mut g = path3();
    g.set_feature(2, 1, 1.0).unwrap();
    let copy = g.clone();

    assert_eq!(copy.adjacency().dim(), (copy.n_vertices(), copy.n_vertices()));
    assert_eq!(copy.features().dim(), (copy.n_vertices(), copy.n_features()));
    assert_eq!(copy.receptive_field(1).dim(), (3, 3));
    assert_eq!(copy.adj(2, 2), 1.0);
  }

  #[test]
  fn test_graph_add_edge_symmetric() {
    let g = path3();

    assert_eq!(g.adj(0, 1), 1.0);
    assert_eq!(g.adj(1, 0), 1.0);
    assert_eq!(g.adj(0, 2), 0.0);
    assert_eq!(g.adj(2, 2), 1.0);
  }

  #[test]
  fn test_graph_add_edge_out_of_range() {
    let mut g = DenseGraph::new(2, 1);

    assert!(matches!(
      g.add_edge(0, 2),
      Err(Error::InvalidVertex { vertex: 2, n_vertices: 2 })
    ));
  }

  #[test]
  fn test_graph_set_feature() {
    let mut g = DenseGraph::new(2, 2);
    g.set_feature(1, 0, 1.0).unwrap();

    assert_eq!(g.feature(1, 0), 1.0);
    assert_eq!(g.features()[[1, 0]], 1.0);
    assert!(matches!(g.set_feature(0, 5, 1.0), Err(Error::InvalidFeature { .. })));
  }

  #[test]
  fn test_graph_receptive_field_radius_zero() {
    let field = path3().receptive_field(0);

    assert_eq!(field, Array2::<f64>::eye(3));
  }

  #[test]
  fn test_graph_receptive_field_radius_one() {
    let field = path3().receptive_field(1);

    assert_eq!(field.row(0).to_vec(), vec![0.5, 0.5, 0.0]);
    assert!((field[[1, 0]] - 1.0 / 3.0).abs() < 1e-12);
    assert!((field[[1, 2]] - 1.0 / 3.0).abs() < 1e-12);
  }

  #[test]
  fn test_graph_receptive_field_radius_two() {
    let field = path3().receptive_field(2);

    for i in 0..3 {
      assert!((field.row(i).sum() - 1.0).abs() < 1e-12);
      assert!(field.row(i).iter().all(|&x| (x - 1.0 / 3.0).abs() < 1e-12));
    }
  }
}
