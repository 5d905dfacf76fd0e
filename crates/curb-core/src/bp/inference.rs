//! Model construction and loopy sum-product message passing.
//!
//! One discrete variable per valid cell, a unary factor per variable from
//! the per-class regression models, and a pairwise smoothness factor per
//! surviving candidate edge. Inference is approximate on cyclic graphs; the
//! last available beliefs are returned whether or not the tolerance was met.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bp::factor_graph::{Factor, FactorGraph, Var};
use crate::bp::schedule::{RandomSequential, UpdateSchedule};
use crate::coords::CellIndex;
use crate::error::{Error, Result};
use crate::graph::Edge;
use crate::grid::Dem;
use crate::regression::MixtureModel;
use crate::stats::Gaussian;

/// Convergence contract for the message-passing loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BpOptions {
    /// Cap on full update sweeps.
    pub max_iterations: usize,
    /// Sweep terminates once the largest message change falls below this.
    pub tolerance: f64,
    /// Seed for the randomised sequential schedule.
    pub seed: u64,
}

impl Default for BpOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
            seed: 0,
        }
    }
}

/// Per-cell label distributions inferred from the elevation map, the
/// candidate edge set and the per-class appearance model. The model itself
/// is transient; only the beliefs and the coordinate-to-variable map
/// survive the call.
#[derive(Debug, Clone)]
pub struct BeliefPropagation {
    id_map: HashMap<CellIndex, usize>,
    beliefs: Vec<Vec<f64>>,
    iterations: usize,
    converged: bool,
}

impl BeliefPropagation {
    /// Build the graphical model and run inference with the default
    /// randomised sequential schedule seeded from `opts`.
    pub fn infer(
        dem: &Dem,
        edge_set: &[Edge],
        mixture: &MixtureModel,
        opts: &BpOptions,
    ) -> Result<Self> {
        let mut schedule = RandomSequential::new(opts.seed);
        Self::infer_with_schedule(dem, edge_set, mixture, opts, &mut schedule)
    }

    /// As `infer`, with a caller-supplied update schedule.
    pub fn infer_with_schedule(
        dem: &Dem,
        edge_set: &[Edge],
        mixture: &MixtureModel,
        opts: &BpOptions,
        schedule: &mut dyn UpdateSchedule,
    ) -> Result<Self> {
        let num_labels = mixture.num_classes();
        let mut vars = Vec::with_capacity(dem.num_valid_cells());
        let mut factors = Vec::with_capacity(dem.num_valid_cells() + edge_set.len());
        let mut id_map = HashMap::with_capacity(dem.num_valid_cells());

        // One variable and one unary factor per valid cell, in row-major
        // scan order. The unary value for class k is the mixture-weighted
        // likelihood of the observed height under class k's regression
        // plane plus noise.
        for idx in dem.cell_indices() {
            let Some(cell) = dem.get(idx) else { continue };
            if !cell.valid {
                continue;
            }
            let node = vars.len();
            vars.push(Var::new(num_labels));
            let mut values = Vec::with_capacity(num_labels);
            for model in mixture.models() {
                let predicted = model.predict(cell.center);
                let height = Gaussian::new(predicted, model.variance + cell.height_variance)?;
                values.push(model.weight * height.pdf(cell.height_mean));
            }
            factors.push(Factor::unary(node, values));
            id_map.insert(idx, node);
        }

        // One pairwise factor per edge whose endpoints both map to
        // variables; others are silently skipped. Only the same-class
        // diagonal is set: cells with similar height and low combined noise
        // strongly favour identical labels. Off-diagonal entries stay at
        // zero, matching the source model (no explicit disagreement
        // potential).
        for edge in edge_set {
            let (Some(&n1), Some(&n2)) = (id_map.get(&edge.first), id_map.get(&edge.second))
            else {
                continue;
            };
            let (Some(c1), Some(c2)) = (dem.get(edge.first), dem.get(edge.second)) else {
                continue;
            };
            let mut factor = Factor::pairwise_zeroed(n1, n2, num_labels, num_labels);
            let agreement = 1.0
                - 1.0
                    / (1.0
                        + (c1.height_variance + c2.height_variance
                            - (c1.height_mean - c2.height_mean).abs())
                        .exp());
            for k in 0..num_labels {
                factor.set(k * (num_labels + 1), agreement);
            }
            factors.push(factor);
        }

        let graph = FactorGraph::new(vars, factors);
        let mut engine = SumProduct::new(&graph);
        let (iterations, converged) =
            engine.run(&graph, opts.max_iterations, opts.tolerance, schedule);
        let beliefs = (0..graph.num_vars()).map(|v| engine.belief(&graph, v)).collect();

        Ok(Self { id_map, beliefs, iterations, converged })
    }

    /// The belief vector (probabilities over the K labels, summing to 1)
    /// for the given cell. Coordinates with no model variable yield
    /// `Error::OutOfBounds` carrying the coordinate.
    pub fn node_distribution(&self, idx: CellIndex) -> Result<&[f64]> {
        self.id_map
            .get(&idx)
            .map(|&node| self.beliefs[node].as_slice())
            .ok_or(Error::OutOfBounds(idx))
    }

    /// Hard labels: the argmax of each cell's belief vector.
    pub fn max_likelihood_labels(&self) -> HashMap<CellIndex, usize> {
        self.id_map
            .iter()
            .map(|(&idx, &node)| {
                let belief = &self.beliefs[node];
                let label = belief
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(k, _)| k)
                    .unwrap_or(0);
                (idx, label)
            })
            .collect()
    }

    pub fn num_variables(&self) -> usize {
        self.beliefs.len()
    }

    /// Sweeps actually performed.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Whether the tolerance was met before the iteration cap.
    pub fn converged(&self) -> bool {
        self.converged
    }
}

/// Sum-product message passing state: one outgoing message per factor slot,
/// kept normalised. Variable-to-factor messages are recomputed on the fly.
struct SumProduct {
    /// `msgs[f][s][x]`: message from factor f to the variable in its s-th
    /// slot, for state x.
    msgs: Vec<Vec<Vec<f64>>>,
    /// `var_slots[v]`: the (factor, slot) incidences of variable v.
    var_slots: Vec<Vec<(usize, usize)>>,
}

impl SumProduct {
    fn new(graph: &FactorGraph) -> Self {
        let mut msgs = Vec::with_capacity(graph.num_factors());
        let mut var_slots = vec![Vec::new(); graph.num_vars()];
        for f in 0..graph.num_factors() {
            let factor = graph.factor(f);
            let mut slots = Vec::with_capacity(factor.vars().len());
            for (s, &v) in factor.vars().iter().enumerate() {
                let states = graph.var(v).states;
                slots.push(vec![1.0 / states as f64; states]);
                var_slots[v].push((f, s));
            }
            msgs.push(slots);
        }
        Self { msgs, var_slots }
    }

    /// Product of all incoming messages at `v` except the one from
    /// `exclude`, normalised.
    fn var_to_factor(&self, graph: &FactorGraph, v: usize, exclude: usize) -> Vec<f64> {
        let mut msg = vec![1.0; graph.var(v).states];
        for &(f, s) in &self.var_slots[v] {
            if f == exclude {
                continue;
            }
            for (m, incoming) in msg.iter_mut().zip(&self.msgs[f][s]) {
                *m *= incoming;
            }
        }
        normalize(&mut msg);
        msg
    }

    /// Recompute all outgoing messages of one factor; returns the largest
    /// absolute change.
    fn update_factor(&mut self, graph: &FactorGraph, f: usize) -> f64 {
        let factor = graph.factor(f);
        match *factor.vars() {
            [_] => {
                let mut msg = factor.values().to_vec();
                normalize(&mut msg);
                let diff = max_diff(&self.msgs[f][0], &msg);
                self.msgs[f][0] = msg;
                diff
            }
            [v0, v1] => {
                let k0 = graph.var(v0).states;
                let k1 = graph.var(v1).states;
                let n0 = self.var_to_factor(graph, v0, f);
                let n1 = self.var_to_factor(graph, v1, f);
                let values = factor.values();

                let mut m0 = vec![0.0; k0];
                let mut m1 = vec![0.0; k1];
                for a in 0..k0 {
                    for b in 0..k1 {
                        let val = values[a * k1 + b];
                        m0[a] += val * n1[b];
                        m1[b] += val * n0[a];
                    }
                }
                normalize(&mut m0);
                normalize(&mut m1);
                let diff =
                    max_diff(&self.msgs[f][0], &m0).max(max_diff(&self.msgs[f][1], &m1));
                self.msgs[f][0] = m0;
                self.msgs[f][1] = m1;
                diff
            }
            _ => 0.0,
        }
    }

    /// Run sweeps until the tolerance is met or the cap is reached.
    /// Returns (sweeps performed, converged).
    fn run(
        &mut self,
        graph: &FactorGraph,
        max_iterations: usize,
        tolerance: f64,
        schedule: &mut dyn UpdateSchedule,
    ) -> (usize, bool) {
        let num_factors = graph.num_factors();
        if num_factors == 0 {
            return (0, true);
        }
        for iteration in 1..=max_iterations {
            let mut sweep_diff = 0.0f64;
            for _ in 0..num_factors {
                let f = schedule.next(num_factors);
                sweep_diff = sweep_diff.max(self.update_factor(graph, f));
            }
            if sweep_diff < tolerance {
                return (iteration, true);
            }
        }
        (max_iterations, false)
    }

    /// Belief of a variable: the normalised product of all its incoming
    /// messages.
    fn belief(&self, graph: &FactorGraph, v: usize) -> Vec<f64> {
        let mut belief = vec![1.0; graph.var(v).states];
        for &(f, s) in &self.var_slots[v] {
            for (b, incoming) in belief.iter_mut().zip(&self.msgs[f][s]) {
                *b *= incoming;
            }
        }
        normalize(&mut belief);
        belief
    }
}

/// Scale to unit sum; a degenerate (zero or non-finite) vector becomes
/// uniform so inference can keep going.
fn normalize(msg: &mut [f64]) {
    let sum: f64 = msg.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        for m in msg.iter_mut() {
            *m /= sum;
        }
    } else {
        let uniform = 1.0 / msg.len() as f64;
        for m in msg.iter_mut() {
            *m = uniform;
        }
    }
}

fn max_diff(old: &[f64], new: &[f64]) -> f64 {
    old.iter()
        .zip(new)
        .map(|(o, n)| (o - n).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bp::schedule::InOrder;
    use crate::coords::Point2;
    use crate::graph::DemGraph;
    use crate::grid::Dem;
    use crate::regression::MixtureModel;
    use approx::assert_relative_eq;

    /// A dem where every cell is valid with the given heights, row-major
    /// (x outer, y inner).
    fn dem_with_heights(nx: usize, ny: usize, heights: &[(f64, f64)]) -> Dem {
        let mut dem = Dem::new(Point2::new(0.0, 0.0), (1.0, 1.0), nx, ny);
        let indices: Vec<CellIndex> = dem.cell_indices().collect();
        for (idx, &(mean, variance)) in indices.iter().zip(heights) {
            let cell = dem.get_mut(*idx).unwrap();
            cell.valid = true;
            cell.height_mean = mean;
            cell.height_variance = variance;
        }
        dem
    }

    /// Two flat classes predicting heights 0 and 1 everywhere.
    fn two_flat_classes() -> MixtureModel {
        MixtureModel::from_parts(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            vec![0.1, 0.1],
            vec![0.5, 0.5],
        )
        .unwrap()
    }

    #[test]
    fn beliefs_are_distributions() {
        let dem = dem_with_heights(2, 2, &[(0.0, 0.01), (0.1, 0.01), (0.9, 0.01), (1.0, 0.01)]);
        let graph = DemGraph::from_dem(&dem);
        let bp = BeliefPropagation::infer(
            &dem,
            graph.edges(),
            &two_flat_classes(),
            &BpOptions::default(),
        )
        .unwrap();
        assert!(bp.converged());
        for idx in dem.cell_indices() {
            let belief = bp.node_distribution(idx).unwrap();
            assert_eq!(belief.len(), 2);
            assert!(belief.iter().all(|&p| p >= 0.0));
            let sum: f64 = belief.iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn low_cells_take_the_low_class() {
        let dem = dem_with_heights(2, 1, &[(0.0, 0.01), (1.0, 0.01)]);
        let bp =
            BeliefPropagation::infer(&dem, &[], &two_flat_classes(), &BpOptions::default())
                .unwrap();
        let labels = bp.max_likelihood_labels();
        assert_eq!(labels[&CellIndex::new(0, 0)], 0);
        assert_eq!(labels[&CellIndex::new(1, 0)], 1);
    }

    #[test]
    fn unmapped_coordinate_is_out_of_bounds() {
        let mut dem = dem_with_heights(2, 1, &[(0.0, 0.01), (1.0, 0.01)]);
        dem.get_mut(CellIndex::new(1, 0)).unwrap().valid = false;
        let bp =
            BeliefPropagation::infer(&dem, &[], &two_flat_classes(), &BpOptions::default())
                .unwrap();
        assert_eq!(bp.num_variables(), 1);
        let invalid = CellIndex::new(1, 0);
        assert_eq!(bp.node_distribution(invalid), Err(Error::OutOfBounds(invalid)));
        let outside = CellIndex::new(5, 5);
        assert_eq!(bp.node_distribution(outside), Err(Error::OutOfBounds(outside)));
    }

    #[test]
    fn edges_touching_invalid_cells_change_nothing() {
        let mut dem = dem_with_heights(3, 1, &[(0.0, 0.01), (0.2, 0.01), (0.0, 0.01)]);
        dem.get_mut(CellIndex::new(2, 0)).unwrap().valid = false;
        let kept = Edge::new(CellIndex::new(0, 0), CellIndex::new(1, 0));
        let pruned = Edge::new(CellIndex::new(1, 0), CellIndex::new(2, 0));
        let outside = Edge::new(CellIndex::new(0, 0), CellIndex::new(7, 7));

        let opts = BpOptions::default();
        let mixture = two_flat_classes();
        let with = BeliefPropagation::infer(&dem, &[kept, pruned, outside], &mixture, &opts)
            .unwrap();
        let without = BeliefPropagation::infer(&dem, &[kept], &mixture, &opts).unwrap();

        for idx in [CellIndex::new(0, 0), CellIndex::new(1, 0)] {
            assert_eq!(with.node_distribution(idx).unwrap(), without.node_distribution(idx).unwrap());
        }
    }

    #[test]
    fn equal_height_neighbours_share_marginals() {
        // 2x1 grid, both cells at height 1.0 with zero variance, one edge,
        // two classes both predicting 1.0 with different noise variances.
        let dem = dem_with_heights(2, 1, &[(1.0, 0.0), (1.0, 0.0)]);
        let mixture = MixtureModel::from_parts(
            vec![[1.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            vec![0.1, 1.0],
            vec![0.5, 0.5],
        )
        .unwrap();
        let edge = Edge::new(CellIndex::new(0, 0), CellIndex::new(1, 0));
        let bp = BeliefPropagation::infer(&dem, &[edge], &mixture, &BpOptions::default())
            .unwrap();
        assert!(bp.converged());
        let a = bp.node_distribution(CellIndex::new(0, 0)).unwrap();
        let b = bp.node_distribution(CellIndex::new(1, 0)).unwrap();
        for (pa, pb) in a.iter().zip(b) {
            assert_relative_eq!(*pa, *pb, epsilon = 1e-6);
        }
    }

    #[test]
    fn tree_marginals_are_exact() {
        // On a two-cell chain BP is exact. With a diagonal-only pairwise
        // factor the joint only supports equal labels, so both marginals
        // are the normalised product of the two unary factors.
        let dem = dem_with_heights(2, 1, &[(0.2, 0.01), (0.3, 0.01)]);
        let mixture = two_flat_classes();
        let edge = Edge::new(CellIndex::new(0, 0), CellIndex::new(1, 0));
        let bp = BeliefPropagation::infer(&dem, &[edge], &mixture, &BpOptions::default())
            .unwrap();

        let mut expected = vec![0.0; 2];
        for (k, e) in expected.iter_mut().enumerate() {
            let mut unary = 1.0;
            for &(mean, var) in &[(0.2, 0.01), (0.3, 0.01)] {
                let model = &mixture.models()[k];
                let g = Gaussian::new(model.coeffs[0], model.variance + var).unwrap();
                unary *= model.weight * g.pdf(mean);
            }
            *e = unary;
        }
        let total: f64 = expected.iter().sum();
        for e in expected.iter_mut() {
            *e /= total;
        }

        for idx in [CellIndex::new(0, 0), CellIndex::new(1, 0)] {
            let belief = bp.node_distribution(idx).unwrap();
            for (p, e) in belief.iter().zip(&expected) {
                assert_relative_eq!(*p, *e, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn in_order_schedule_is_reproducible() {
        let dem = dem_with_heights(2, 2, &[(0.0, 0.01), (0.5, 0.01), (0.5, 0.01), (1.0, 0.01)]);
        let graph = DemGraph::from_dem(&dem);
        let mixture = two_flat_classes();
        let opts = BpOptions::default();
        let mut first = InOrder::new();
        let mut second = InOrder::new();
        let a = BeliefPropagation::infer_with_schedule(
            &dem,
            graph.edges(),
            &mixture,
            &opts,
            &mut first,
        )
        .unwrap();
        let b = BeliefPropagation::infer_with_schedule(
            &dem,
            graph.edges(),
            &mixture,
            &opts,
            &mut second,
        )
        .unwrap();
        for idx in dem.cell_indices() {
            assert_eq!(a.node_distribution(idx).unwrap(), b.node_distribution(idx).unwrap());
        }
        assert_eq!(a.iterations(), b.iterations());
    }

    #[test]
    fn bad_model_variance_is_reported_eagerly() {
        // Zero regression variance plus zero cell variance makes the unary
        // Gaussian invalid; the error surfaces from the build phase.
        let dem = dem_with_heights(1, 1, &[(0.0, 0.0)]);
        let mixture = MixtureModel::new(vec![crate::regression::RegressionModel {
            coeffs: [0.0; 3],
            variance: 0.0,
            weight: 1.0,
        }]);
        let result = BeliefPropagation::infer(&dem, &[], &mixture, &BpOptions::default());
        assert!(matches!(result, Err(Error::BadArgument { .. })));
    }
}
