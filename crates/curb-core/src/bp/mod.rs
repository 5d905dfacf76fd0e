//! Pairwise graphical model construction and loopy sum-product inference
//! over the elevation map.

pub mod factor_graph;
pub mod inference;
pub mod schedule;

pub use factor_graph::{Factor, FactorGraph, Var};
pub use inference::{BeliefPropagation, BpOptions};
pub use schedule::{InOrder, RandomSequential, UpdateSchedule};
