/// Offline labeling harness: load a serialised scene (elevation map, edge
/// set, per-class regression models, ground-truth regions), run inference,
/// and score the hard labeling against the ground truth.

use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

use curb_core::{BeliefPropagation, BpOptions, Dem, DemGraph, Evaluator, MixtureModel};

#[derive(Parser, Debug)]
#[command(name = "labeler", about = "Label terrain cells and score against ground truth")]
struct Args {
    /// Path to a scene JSON file.
    #[arg(short, long)]
    input: String,

    /// Schedule seed for the randomised message updates.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Completeness-vs-homogeneity weight for the V-measure.
    #[arg(long, default_value_t = 1.0)]
    beta: f64,

    /// Print the per-cell label distributions.
    #[arg(long)]
    verbose: bool,
}

/// Everything the core consumes, in one file.
#[derive(Debug, Deserialize)]
struct Scene {
    dem: Dem,
    graph: DemGraph,
    mixture: MixtureModel,
    ground_truth: Evaluator,
    #[serde(default)]
    options: Option<BpOptions>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let file = File::open(&args.input)
        .with_context(|| format!("failed to open scene file {}", args.input))?;
    let scene: Scene = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse scene file {}", args.input))?;

    let mut options = scene.options.unwrap_or_default();
    options.seed = args.seed;

    let bp = BeliefPropagation::infer(&scene.dem, scene.graph.edges(), &scene.mixture, &options)
        .context("model construction failed")?;
    eprintln!(
        "inference: {} variables, {} sweeps, converged: {}",
        bp.num_variables(),
        bp.iterations(),
        bp.converged()
    );

    if args.verbose {
        for vertex in scene.graph.vertices() {
            match bp.node_distribution(*vertex) {
                Ok(belief) => println!("{vertex}: {belief:?}"),
                Err(e) => eprintln!("{vertex}: {e}"),
            }
        }
    }

    let labels = bp.max_likelihood_labels();
    let score = scene
        .ground_truth
        .evaluate_weighted(&scene.dem, &scene.graph, &labels, args.beta);
    println!("v-measure: {score:.6}");

    Ok(())
}
