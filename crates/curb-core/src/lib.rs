//! Terrain-cell labeling core for curb detection on a gridded elevation map.
//!
//! Two components share the grid/label abstraction:
//! - [`bp`]: a pairwise Markov random field over valid cells with loopy
//!   sum-product inference, yielding per-cell label distributions.
//! - [`evaluation`]: an entropy-based external clustering score (V-measure)
//!   of a labeling against a hand-annotated ground-truth partition.
//!
//! The upstream point-cloud, segmentation and regression-estimation stages
//! are external collaborators: they populate the [`grid::Dem`], the
//! [`graph::DemGraph`] and the [`regression::MixtureModel`] consumed here.

pub mod bp;
pub mod coords;
pub mod error;
pub mod evaluation;
pub mod graph;
pub mod grid;
pub mod regression;
pub mod stats;

pub use bp::{BeliefPropagation, BpOptions};
pub use coords::{CellIndex, Point2};
pub use error::{Error, Result};
pub use evaluation::{Evaluator, Region};
pub use graph::{DemGraph, Edge};
pub use grid::{Cell, Dem};
pub use regression::{MixtureModel, RegressionModel};
