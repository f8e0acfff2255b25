use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::graph::DenseGraph;
use crate::nn::{sigmoid, Activation, Params};

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

// keeps ln() finite in the loss
const PROB_EPSILON: f64 = 1e-12;

/// Graph-convolution autoencoder: a stack of message-passing levels over the
/// receptive field of every vertex, a per-vertex dense stack, and an
/// inner-product decoder that predicts the adjacency matrix.
#[derive(Debug, Clone)]
pub struct GCA {
  config: Config,
  encoder: Params,
  dense: Params,
  encoder_velocity: Params,
  dense_velocity: Params
}

/// Everything needed to rebuild a model, including optimizer state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
  pub config: Config,
  pub encoder: Params,
  pub dense: Params,
  pub encoder_velocity: Params,
  pub dense_velocity: Params
}

/// Intermediate values of one forward pass, kept for backpropagation.
struct Forward {
  field: Array2<f64>,
  // Â H_{l-1} for every level
  messages: Vec<Array2<f64>>,
  // H_0 (features) .. H_L
  levels: Vec<Array2<f64>>,
  // G_0 = H_L .. G_D = Z
  dense: Vec<Array2<f64>>,
  prediction: Array2<f64>
}

struct Gradient {
  encoder: Params,
  dense: Params
}

impl GCA {
  pub fn new(config: Config) -> Result<Self> {
    config.validate()?;

    let mut rng = match config.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy()
    };
    let encoder = Params::new(Self::encoder_dimensions(&config), &mut rng);
    let dense = Params::new(Self::dense_dimensions(&config), &mut rng);

    Ok(GCA {
      encoder_velocity: encoder.zeros_like(),
      dense_velocity: dense.zeros_like(),
      config,
      encoder,
      dense
    })
  }

  #[inline]
  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Mean binary cross-entropy between the predicted and the true adjacency.
  pub fn loss(&self, graph: &DenseGraph) -> Result<f64> {
    self.check_graph(graph)?;
    Ok(Self::cross_entropy(&self.forward(graph).prediction, graph))
  }

  /// One momentum step over the whole batch. Returns the mean loss before and
  /// after the update.
  pub fn batch_learn<G>(&mut self, graphs: &[G], learning_rate: f64) -> Result<(f64, f64)>
  where
    G: AsRef<DenseGraph> + Sync
  {
    if !learning_rate.is_finite() || learning_rate <= 0.0 {
      return Err(Error::Config(format!("learning rate must be finite and positive, got {learning_rate}")));
    }
    if graphs.is_empty() {
      return Err(Error::EmptyBatch);
    }
    for graph in graphs {
      self.check_graph(graph.as_ref())?;
    }

    let batch = graphs.len() as f64;
    let results: Vec<(f64, Gradient)> = graphs
      .par_iter()
      .map(|graph| {
        let graph = graph.as_ref();
        let forward = self.forward(graph);
        let loss = Self::cross_entropy(&forward.prediction, graph);
        (loss, self.backward(graph, &forward))
      })
      .collect();

    let mut encoder_grad = self.encoder.zeros_like();
    let mut dense_grad = self.dense.zeros_like();
    let mut before = 0.0;
    for (loss, grad) in &results {
      before += loss;
      encoder_grad.add_scaled(&grad.encoder, 1.0 / batch);
      dense_grad.add_scaled(&grad.dense, 1.0 / batch);
    }
    before /= batch;

    let momentum = self.config.momentum;
    self.encoder.momentum_step(&mut self.encoder_velocity, &encoder_grad, momentum, learning_rate);
    self.dense.momentum_step(&mut self.dense_velocity, &dense_grad, momentum, learning_rate);

    let after: Vec<f64> = graphs
      .par_iter()
      .map(|graph| {
        let graph = graph.as_ref();
        Self::cross_entropy(&self.forward(graph).prediction, graph)
      })
      .collect();
    let after = after.iter().sum::<f64>() / batch;

    debug!(batch = graphs.len(), learning_rate, before, after, "batch step");
    Ok((before, after))
  }

  /// Predicted edge probabilities, row-major n x n.
  pub fn predict(&self, graph: &DenseGraph) -> Result<Vec<f64>> {
    self.check_graph(graph)?;
    Ok(self.forward(graph).prediction.iter().copied().collect())
  }

  /// Predicted adjacency with every probability rounded against `threshold`.
  pub fn predict_adjacency(&self, graph: &DenseGraph, threshold: f64) -> Result<Vec<f64>> {
    Ok(self
      .predict(graph)?
      .into_iter()
      .map(|p| if p >= threshold { 1.0 } else { 0.0 })
      .collect())
  }

  /// Fraction of adjacency entries recovered by `predict_adjacency`.
  pub fn accuracy(&self, graph: &DenseGraph, threshold: f64) -> Result<f64> {
    let predicted = self.predict_adjacency(graph, threshold)?;
    let hits = predicted
      .iter()
      .zip(graph.adjacency().iter())
      .filter(|(p, a)| p == a)
      .count();

    Ok(hits as f64 / predicted.len() as f64)
  }

  pub fn snapshot(&self) -> ModelState {
    ModelState {
      config: self.config.clone(),
      encoder: self.encoder.clone(),
      dense: self.dense.clone(),
      encoder_velocity: self.encoder_velocity.clone(),
      dense_velocity: self.dense_velocity.clone()
    }
  }

  pub fn restore(&mut self, state: ModelState) -> Result<()> {
    *self = GCA::from_state(state)?;
    Ok(())
  }

  /// Rebuilds a model from a stored state after checking every parameter
  /// block against the shapes its config implies.
  pub fn from_state(state: ModelState) -> Result<Self> {
    state.config.validate()?;

    let encoder_dims = Self::encoder_dimensions(&state.config);
    let dense_dims = Self::dense_dimensions(&state.config);
    let layers = [
      ("encoder", &state.encoder, &encoder_dims),
      ("encoder velocity", &state.encoder_velocity, &encoder_dims),
      ("dense", &state.dense, &dense_dims),
      ("dense velocity", &state.dense_velocity, &dense_dims)
    ];
    for (name, params, dims) in layers {
      let zeros = Params::zeros(dims.clone());
      if params.dimensions != *dims
        || params.weights.len() != zeros.weights.len()
        || params.biases.len() != zeros.biases.len()
      {
        return Err(Error::Shape(format!("{name} parameters do not match the model configuration")));
      }
    }

    Ok(GCA {
      config: state.config,
      encoder: state.encoder,
      dense: state.dense,
      encoder_velocity: state.encoder_velocity,
      dense_velocity: state.dense_velocity
    })
  }

  pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &self.snapshot())?;
    writer.flush()?;

    info!(path = %path.display(), "model saved");
    Ok(())
  }

  /// Replaces this model's configuration, weights and optimizer state with
  /// the ones stored at `path`.
  pub fn load_model<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let state: ModelState = serde_json::from_reader(reader)?;
    self.restore(state)?;

    info!(path = %path.display(), "model loaded");
    Ok(())
  }

  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let state: ModelState = serde_json::from_reader(reader)?;
    GCA::from_state(state)
  }

  fn encoder_dimensions(config: &Config) -> Vec<(usize, usize)> {
    let mut prev = config.features;
    (0..config.levels)
      .map(|_| {
        let res = (prev, config.hiddens);
        prev = config.hiddens;
        res
      })
      .collect()
  }

  fn dense_dimensions(config: &Config) -> Vec<(usize, usize)> {
    vec![(config.hiddens, config.hiddens); config.depth]
  }

  #[inline]
  fn dense_activation(&self, layer: usize) -> Activation {
    if layer + 1 == self.config.depth {
      Activation::None
    } else {
      Activation::Tanh
    }
  }

  fn check_graph(&self, graph: &DenseGraph) -> Result<()> {
    if graph.n_vertices() == 0 {
      return Err(Error::Shape("graph has no vertices".into()));
    }
    if graph.n_vertices() > self.config.max_vertices {
      return Err(Error::Shape(format!(
        "graph has {} vertices, model accepts at most {}",
        graph.n_vertices(), self.config.max_vertices
      )));
    }
    if graph.n_features() != self.config.features {
      return Err(Error::Shape(format!(
        "graph has {} features, model expects {}",
        graph.n_features(), self.config.features
      )));
    }
    Ok(())
  }

  fn forward(&self, graph: &DenseGraph) -> Forward {
    let field = graph.receptive_field(self.config.radius);

    let mut messages = Vec::with_capacity(self.config.levels);
    let mut levels = Vec::with_capacity(self.config.levels + 1);
    levels.push(graph.features().to_owned());

    for l in 0..self.encoder.layer_count() {
      let message = field.dot(&levels[l]);
      let activated = (message.dot(&self.encoder.layer_weights(l)) + &self.encoder.layer_biases(l))
        .mapv(sigmoid);
      messages.push(message);
      levels.push(activated);
    }

    let mut dense = Vec::with_capacity(self.config.depth + 1);
    dense.push(levels[levels.len() - 1].clone());

    for k in 0..self.dense.layer_count() {
      let activation = self.dense_activation(k);
      let activated = (dense[k].dot(&self.dense.layer_weights(k)) + &self.dense.layer_biases(k))
        .mapv(|x| activation.apply(x));
      dense.push(activated);
    }

    let z = &dense[dense.len() - 1];
    let prediction = z.dot(&z.t()).mapv(sigmoid);

    Forward {
      field,
      messages,
      levels,
      dense,
      prediction
    }
  }

  fn backward(&self, graph: &DenseGraph, forward: &Forward) -> Gradient {
    let mut encoder = self.encoder.zeros_like();
    let mut dense = self.dense.zeros_like();

    // d(loss)/d(logit) of the mean cross-entropy is (p - a) / n^2;
    // the probability clamp in the loss is ignored here
    let pairs = (graph.n_vertices() * graph.n_vertices()) as f64;
    let d_logits = (&forward.prediction - &graph.adjacency()) / pairs;
    let z = &forward.dense[forward.dense.len() - 1];
    let mut upstream = (&d_logits + &d_logits.t()).dot(z);

    for k in (0..self.dense.layer_count()).rev() {
      let activation = self.dense_activation(k);
      let d_pre = &upstream * &forward.dense[k + 1].mapv(|y| activation.derivative(y));

      dense.layer_weights_mut(k).assign(&forward.dense[k].t().dot(&d_pre));
      dense.layer_biases_mut(k).assign(&d_pre.sum_axis(Axis(0)));
      upstream = d_pre.dot(&self.dense.layer_weights(k).t());
    }

    for l in (0..self.encoder.layer_count()).rev() {
      let d_pre = &upstream * &forward.levels[l + 1].mapv(|y| Activation::Sigmoid.derivative(y));

      encoder.layer_weights_mut(l).assign(&forward.messages[l].t().dot(&d_pre));
      encoder.layer_biases_mut(l).assign(&d_pre.sum_axis(Axis(0)));
      let d_message = d_pre.dot(&self.encoder.layer_weights(l).t());
      upstream = forward.field.t().dot(&d_message);
    }

    Gradient { encoder, dense }
  }

  fn cross_entropy(prediction: &Array2<f64>, graph: &DenseGraph) -> f64 {
    let total: f64 = prediction
      .iter()
      .zip(graph.adjacency().iter())
      .map(|(&p, &a)| {
        let p = p.clamp(PROB_EPSILON, 1.0 - PROB_EPSILON);
        -(a * p.ln() + (1.0 - a) * (1.0 - p).ln())
      })
      .sum();

    total / prediction.len() as f64
  }
}


pub struct GCABuilder {
  config: Config
}

impl GCABuilder {
  pub fn new() -> Self {
    GCABuilder {
      config: Config::default()
    }
  }

  pub fn levels(mut self, levels: usize) -> Self {
    self.config.levels = levels;
    self
  }

  pub fn max_vertices(mut self, max_vertices: usize) -> Self {
    self.config.max_vertices = max_vertices;
    self
  }

  pub fn features(mut self, features: usize) -> Self {
    self.config.features = features;
    self
  }

  pub fn hiddens(mut self, hiddens: usize) -> Self {
    self.config.hiddens = hiddens;
    self
  }

  pub fn depth(mut self, depth: usize) -> Self {
    self.config.depth = depth;
    self
  }

  pub fn radius(mut self, radius: usize) -> Self {
    self.config.radius = radius;
    self
  }

  pub fn momentum(mut self, momentum: f64) -> Self {
    self.config.momentum = momentum;
    self
  }

  pub fn seed(mut self, seed: u64) -> Self {
    self.config.seed = Some(seed);
    self
  }

  pub fn build(self) -> Result<GCA> {
    GCA::new(self.config)
  }
}

impl Default for GCABuilder {
  fn default() -> Self {
    GCABuilder::new()
  }
}

impl From<Config> for GCABuilder {
  fn from(config: Config) -> Self {
    GCABuilder { config }
  }
}
