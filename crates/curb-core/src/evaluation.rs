//! Scoring of an inferred labeling against a hand-annotated ground truth:
//! ordered planar regions, a contingency table over graph vertices, and the
//! entropy-based V-measure.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::coords::{CellIndex, Point2};
use crate::graph::DemGraph;
use crate::grid::Dem;

/// Axis-aligned rectangle with inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point2,
    pub max: Point2,
}

impl Rect {
    pub fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, p: Point2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// A planar region as a union of rectangles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    pub fn new(rects: Vec<Rect>) -> Self {
        Self { rects }
    }

    pub fn contains(&self, p: Point2) -> bool {
        self.rects.iter().any(|r| r.contains(p))
    }
}

/// Cross-tabulation of ground-truth vs inferred class counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContingencyTable {
    counts: Vec<usize>,
    rows: usize,
    cols: usize,
}

impl ContingencyTable {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { counts: vec![0; rows * cols], rows, cols }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> usize {
        self.counts[row * self.cols + col]
    }

    pub fn increment(&mut self, row: usize, col: usize) {
        self.counts[row * self.cols + col] += 1;
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn row_sums(&self) -> Vec<usize> {
        (0..self.rows).map(|r| (0..self.cols).map(|c| self.get(r, c)).sum()).collect()
    }

    pub fn col_sums(&self) -> Vec<usize> {
        (0..self.cols).map(|c| (0..self.rows).map(|r| self.get(r, c)).sum()).collect()
    }
}

/// Ground-truth store and scorer. Regions are kept in insertion order and a
/// region's position in the list is its class label; point lookups scan the
/// list linearly so that for overlapping regions the first match wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evaluator {
    classes: Vec<Region>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_regions(classes: Vec<Region>) -> Self {
        Self { classes }
    }

    pub fn add_class(&mut self, region: Region) {
        self.classes.push(region);
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Drop all loaded regions; subsequent lookups return the sentinel.
    pub fn clear(&mut self) {
        self.classes.clear();
    }

    /// Ground-truth label of a planar point: the index of the first region
    /// containing it, or `num_classes()` (the "unclassified" sentinel) if
    /// none does.
    pub fn label_of(&self, p: Point2) -> usize {
        self.classes
            .iter()
            .position(|region| region.contains(p))
            .unwrap_or(self.classes.len())
    }

    /// Score the labeling against the ground truth with beta = 1 (the
    /// unweighted harmonic mean of homogeneity and completeness).
    pub fn evaluate(
        &self,
        dem: &Dem,
        graph: &DemGraph,
        labels: &HashMap<CellIndex, usize>,
    ) -> f64 {
        self.evaluate_weighted(dem, graph, labels, 1.0)
    }

    /// Score with an explicit beta weighting completeness against
    /// homogeneity.
    pub fn evaluate_weighted(
        &self,
        dem: &Dem,
        graph: &DemGraph,
        labels: &HashMap<CellIndex, usize>,
        beta: f64,
    ) -> f64 {
        let table = self.contingency_table(dem, graph, labels);
        v_measure(&table, beta)
    }

    /// Tabulate ground-truth vs inferred labels over the graph's vertices.
    /// The table has one extra truth row for the unclassified sentinel.
    /// Vertices without a grid cell or an inferred label are skipped, the
    /// same silent-filter policy applied to edges during model building.
    pub fn contingency_table(
        &self,
        dem: &Dem,
        graph: &DemGraph,
        labels: &HashMap<CellIndex, usize>,
    ) -> ContingencyTable {
        let cols = labels.values().map(|&l| l + 1).max().unwrap_or(0);
        let mut table = ContingencyTable::zeros(self.num_classes() + 1, cols);
        for &vertex in graph.vertices() {
            let Some(cell) = dem.get(vertex) else { continue };
            let Some(&inferred) = labels.get(&vertex) else { continue };
            table.increment(self.label_of(cell.center), inferred);
        }
        table
    }
}

/// V-measure of a contingency table: the beta-weighted harmonic mean of
/// homogeneity `h = 1 - H(T|I) / H(T)` and completeness
/// `c = 1 - H(I|T) / H(I)`, each defined as 1 when the respective entropy
/// is 0. Returns 0 when both h and c are 0, and 0 for an empty table.
pub fn v_measure(table: &ContingencyTable, beta: f64) -> f64 {
    let total = table.total();
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    let row_sums = table.row_sums();
    let col_sums = table.col_sums();

    let entropy = |sums: &[usize]| -> f64 {
        sums.iter()
            .filter(|&&s| s > 0)
            .map(|&s| {
                let p = s as f64 / n;
                -p * p.ln()
            })
            .sum()
    };
    let h_truth = entropy(&row_sums);
    let h_inferred = entropy(&col_sums);

    // H(T|I) = -sum_ij p(i,j) ln(p(i,j) / p(j)), and symmetrically for
    // H(I|T); zero-count entries contribute nothing.
    let mut h_truth_given_inferred = 0.0;
    let mut h_inferred_given_truth = 0.0;
    for row in 0..table.rows() {
        for col in 0..table.cols() {
            let count = table.get(row, col);
            if count == 0 {
                continue;
            }
            let joint = count as f64 / n;
            h_truth_given_inferred -= joint * (count as f64 / col_sums[col] as f64).ln();
            h_inferred_given_truth -= joint * (count as f64 / row_sums[row] as f64).ln();
        }
    }

    let homogeneity = if h_truth == 0.0 {
        1.0
    } else {
        1.0 - h_truth_given_inferred / h_truth
    };
    let completeness = if h_inferred == 0.0 {
        1.0
    } else {
        1.0 - h_inferred_given_truth / h_inferred
    };

    let denominator = beta * beta * homogeneity + completeness;
    if denominator == 0.0 {
        return 0.0;
    }
    (1.0 + beta * beta) * homogeneity * completeness / denominator
}
