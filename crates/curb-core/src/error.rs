//! Typed failures reported by the labeling core.
//!
//! Nothing here is fatal: an out-of-bounds marginal query can be skipped by
//! the caller, and bad distribution parameters are rejected eagerly at
//! construction time rather than clamped.

use thiserror::Error;

use crate::coords::CellIndex;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A marginal was requested for a coordinate with no model variable
    /// (invalid cell, or outside the grid at model-construction time).
    #[error("no model variable at cell {0}")]
    OutOfBounds(CellIndex),

    /// A statistical-distribution or model parameter failed validation.
    #[error("bad argument `{name}` = {value}: {reason}")]
    BadArgument {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
