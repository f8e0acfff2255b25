use approx::assert_abs_diff_eq;

use gca::prelude::*;

use std::fs;
use std::path::PathBuf;

fn model_path(name: &str) -> PathBuf {
  std::env::temp_dir().join(format!("gca-{}-{}.dat", name, std::process::id()))
}

fn graphs() -> Vec<DenseGraph> {
  Molecule::dataset()
    .unwrap()
    .iter()
    .map(|m| m.build(Config::FEATURES).unwrap())
    .collect()
}

fn trained() -> GCA {
  let mut gca = GCABuilder::new()
    .levels(3)
    .hiddens(8)
    .depth(2)
    .seed(2017)
    .build()
    .unwrap();
  let graphs = graphs();

  for _ in 0..20 {
    gca.batch_learn(&graphs, 0.1).unwrap();
  }
  gca
}

#[test]
fn test_save_then_load_reproduces_predictions() {
  let train_network = trained();
  let path = model_path("roundtrip");
  train_network.save_model(&path).unwrap();

  // different shape and seed; loading replaces both
  let mut test_network = GCABuilder::new().hiddens(3).seed(1).build().unwrap();
  test_network.load_model(&path).unwrap();
  fs::remove_file(&path).unwrap();

  assert_eq!(test_network.config(), train_network.config());
  for graph in graphs() {
    let expected = train_network.predict(&graph).unwrap();
    let actual = test_network.predict(&graph).unwrap();
    for (e, a) in expected.iter().zip(actual.iter()) {
      assert_abs_diff_eq!(*e, *a, epsilon = 1e-12);
    }
  }
}

#[test]
fn test_loaded_model_continues_training_identically() {
  let mut original = trained();
  let path = model_path("resume");
  original.save_model(&path).unwrap();
  let mut restored = GCA::from_file(&path).unwrap();
  fs::remove_file(&path).unwrap();

  let graphs = graphs();
  let (a_before, a_after) = original.batch_learn(&graphs, 0.1).unwrap();
  let (b_before, b_after) = restored.batch_learn(&graphs, 0.1).unwrap();

  assert_abs_diff_eq!(a_before, b_before, epsilon = 1e-12);
  assert_abs_diff_eq!(a_after, b_after, epsilon = 1e-12);
}

#[test]
fn test_load_missing_file() {
  let mut gca = GCABuilder::new().seed(0).build().unwrap();

  assert!(matches!(gca.load_model(model_path("missing")), Err(Error::Io(_))));
}

#[test]
fn test_load_corrupt_file() {
  let path = model_path("corrupt");
  fs::write(&path, b"not a model").unwrap();

  let mut gca = GCABuilder::new().seed(0).build().unwrap();
  let before = gca.snapshot();
  let result = gca.load_model(&path);
  fs::remove_file(&path).unwrap();

  assert!(matches!(result, Err(Error::Format(_))));
  assert_eq!(gca.snapshot(), before);
}

#[test]
fn test_training_improves_reconstruction() {
  let mut gca = GCABuilder::new()
    .levels(2)
    .hiddens(8)
    .depth(2)
    .seed(7)
    .build()
    .unwrap();
  let graphs = graphs();

  let (first, _) = gca.batch_learn(&graphs, 0.05).unwrap();
  let mut last = first;
  for _ in 0..300 {
    last = gca.batch_learn(&graphs, 0.05).unwrap().1;
  }

  assert!(last < first, "{last} >= {first}");
  for graph in &graphs {
    let prediction = gca.predict(graph).unwrap();
    assert_eq!(prediction.len(), graph.n_vertices() * graph.n_vertices());
  }
}
