use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gca::prelude::*;

use std::path::PathBuf;
use std::process::ExitCode;

/// Train a graph-convolution autoencoder on a few small molecules and
/// print the adjacency it reconstructs.
#[derive(Debug, Parser)]
#[command(name = "gca", version)]
struct Args {
  #[arg(long, default_value_t = Config::LEVELS)]
  levels: usize,

  #[arg(long, default_value_t = Config::MAX_VERTICES)]
  max_vertices: usize,

  #[arg(long, default_value_t = Config::HIDDENS)]
  hiddens: usize,

  #[arg(long, default_value_t = Config::DEPTH)]
  depth: usize,

  #[arg(long, default_value_t = Config::RADIUS)]
  radius: usize,

  #[arg(long, default_value_t = Config::MOMENTUM)]
  momentum: f64,

  #[arg(long, default_value_t = 0.1)]
  learning_rate: f64,

  #[arg(long, default_value_t = 100)]
  epochs: usize,

  /// Seed for weight initialisation; random when omitted.
  #[arg(long)]
  seed: Option<u64>,

  #[arg(long, default_value = "GCA_1D-model.dat")]
  model: PathBuf
}

impl Args {
  fn config(&self) -> Config {
    Config {
      levels: self.levels,
      max_vertices: self.max_vertices,
      features: Config::FEATURES,
      hiddens: self.hiddens,
      depth: self.depth,
      radius: self.radius,
      momentum: self.momentum,
      seed: self.seed
    }
  }
}

fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_target(false)
    .init();

  let args = Args::parse();
  match run(&args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      tracing::error!("{err}");
      ExitCode::FAILURE
    }
  }
}

fn run(args: &Args) -> Result<()> {
  let config = args.config();
  let molecules = Molecule::dataset()?;
  let graphs = molecules
    .iter()
    .map(|m| m.build(config.features))
    .collect::<Result<Vec<_>>>()?;

  let mut train_network = GCABuilder::from(config.clone()).build()?;
  info!(molecules = graphs.len(), epochs = args.epochs, "training");

  println!("--- Learning ------------------------------");
  for epoch in 0..args.epochs {
    let (before, after) = train_network.batch_learn(&graphs, args.learning_rate)?;
    println!("Epoch {}:", epoch + 1);
    println!("    Before training: {before}");
    println!("    After training: {after}");
  }

  train_network.save_model(&args.model)?;

  println!();
  println!("--- Predicting ----------------------------");

  let mut test_network = GCA::new(config)?;
  test_network.load_model(&args.model)?;

  for (i, (molecule, graph)) in molecules.iter().zip(graphs.iter()).enumerate() {
    let predict = test_network.predict(graph)?;
    let n = graph.n_vertices();

    println!();
    println!("Molecule {} ({}): Expected adjacency:", i + 1, molecule.name);
    for x in 0..n {
      let row: Vec<String> = (0..n).map(|y| graph.adj(x, y).to_string()).collect();
      println!("{}", row.join(" "));
    }

    println!();
    println!("Predicted adjacency:");
    for x in 0..n {
      let row: Vec<String> = (0..n).map(|y| predict[x * n + y].to_string()).collect();
      println!("{}", row.join(" "));
    }

    info!(molecule = %molecule.name, accuracy = test_network.accuracy(graph, 0.5)?, "evaluated");
  }

  Ok(())
}
