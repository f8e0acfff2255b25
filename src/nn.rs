use ndarray::{ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
  Sigmoid,
  Tanh,
  None
}

impl Activation {
  #[inline]
  pub fn apply(self, x: f64) -> f64 {
    match self {
      Activation::Sigmoid => sigmoid(x),
      Activation::Tanh => x.tanh(),
      Activation::None => x
    }
  }

  /// Derivative written in terms of the activated value `y = apply(x)`.
  #[inline]
  pub fn derivative(self, y: f64) -> f64 {
    match self {
      Activation::Sigmoid => y * (1.0 - y),
      Activation::Tanh => 1.0 - y * y,
      Activation::None => 1.0
    }
  }
}

#[inline]
pub fn sigmoid(x: f64) -> f64 {
  1.0 / (1.0 + (-x).exp())
}

/// A stack of dense layers stored flat, the same way for weights,
/// gradients and optimizer velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
  // (inputs, outputs) per layer
  pub dimensions: Vec<(usize, usize)>, // [(4, 10), (10, 10), ...]
  pub weights: Vec<f64>,
  pub biases: Vec<f64>
}

impl Params {
  pub fn new<R: Rng + ?Sized>(dimensions: Vec<(usize, usize)>, rng: &mut R) -> Self {
    let mut params = Params::zeros(dimensions);

    for i in 0..params.dimensions.len() {
      let (fan_in, _) = params.dimensions[i];
      let scale = 2.0 / (fan_in as f64).sqrt();
      params
        .layer_weights_raw_mut(i)
        .iter_mut()
        .for_each(|w| *w = (rng.gen::<f64>() - 0.5) * scale);
    }
    params
      .biases
      .iter_mut()
      .for_each(|b| *b = (rng.gen::<f64>() - 0.5) * 0.1);

    params
  }

  pub fn zeros(dimensions: Vec<(usize, usize)>) -> Self {
    let weights_count = dimensions
      .iter()
      .fold(0, |acc, &(x, y)| acc + x*y);
    let biases_count = dimensions
      .iter()
      .fold(0, |acc, &(_, y)| acc + y);

    Params {
      dimensions,
      weights: vec![0.0; weights_count],
      biases: vec![0.0; biases_count]
    }
  }

  pub fn zeros_like(&self) -> Self {
    Params::zeros(self.dimensions.clone())
  }

  #[inline]
  pub fn layer_count(&self) -> usize {
    self.dimensions.len()
  }

  pub fn layer_weights(&self, index: usize) -> ArrayView2<'_, f64> {
    let (start, end) = self.weights_range(index);
    ArrayView2::from_shape(self.dimensions[index], &self.weights[start..end])
      .expect("layer slice matches its dimensions")
  }

  pub fn layer_weights_mut(&mut self, index: usize) -> ArrayViewMut2<'_, f64> {
    let shape = self.dimensions[index];
    ArrayViewMut2::from_shape(shape, self.layer_weights_raw_mut(index))
      .expect("layer slice matches its dimensions")
  }

  pub fn layer_biases(&self, index: usize) -> ArrayView1<'_, f64> {
    let (start, end) = self.biases_range(index);
    ArrayView1::from(&self.biases[start..end])
  }

  pub fn layer_biases_mut(&mut self, index: usize) -> ArrayViewMut1<'_, f64> {
    let (start, end) = self.biases_range(index);
    ArrayViewMut1::from(&mut self.biases[start..end])
  }

  /// `self += scale * other`, layer shapes must agree.
  pub fn add_scaled(&mut self, other: &Params, scale: f64) {
    debug_assert_eq!(self.dimensions, other.dimensions);

    self.weights
      .iter_mut()
      .zip(other.weights.iter())
      .for_each(|(w, g)| *w += scale * g);
    self.biases
      .iter_mut()
      .zip(other.biases.iter())
      .for_each(|(b, g)| *b += scale * g);
  }

  /// Classical momentum: `v = momentum * v - lr * grad; self += v`.
  pub fn momentum_step(&mut self, velocity: &mut Params, grad: &Params, momentum: f64, learning_rate: f64) {
    debug_assert_eq!(self.dimensions, velocity.dimensions);
    debug_assert_eq!(self.dimensions, grad.dimensions);

    let step = |params: &mut [f64], velocity: &mut [f64], grad: &[f64]| {
      params
        .iter_mut()
        .zip(velocity.iter_mut())
        .zip(grad.iter())
        .for_each(|((p, v), g)| {
          *v = momentum * *v - learning_rate * g;
          *p += *v;
        });
    };

    step(&mut self.weights, &mut velocity.weights, &grad.weights);
    step(&mut self.biases, &mut velocity.biases, &grad.biases);
  }

  #[inline]
  fn layer_weights_raw_mut(&mut self, index: usize) -> &mut [f64] {
    let (start, end) = self.weights_range(index);
    &mut self.weights[start..end]
  }

  #[inline]
  fn weights_range(&self, index: usize) -> (usize, usize) {
    let ptr = self.dimensions
      .iter()
      .take(index)
      .fold(0, |acc, &(x, y)| acc + x*y);
    let (rows, cols) = self.dimensions[index];

    (ptr, ptr + rows*cols)
  }

  #[inline]
  fn biases_range(&self, index: usize) -> (usize, usize) {
    let ptr = self.dimensions
      .iter()
      .take(index)
      .fold(0, |acc, &(_, y)| acc + y);

    (ptr, ptr + self.dimensions[index].1)
  }
}
