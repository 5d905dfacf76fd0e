//! Vertex and edge view of the elevation map, as produced by the graph
//! segmentation stage. Edges are candidate spatial adjacencies; the list may
//! contain duplicates, which simply yield redundant pairwise factors
//! downstream.

use serde::{Deserialize, Serialize};

use crate::coords::CellIndex;
use crate::grid::Dem;

/// An undirected pair of cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub first: CellIndex,
    pub second: CellIndex,
}

impl Edge {
    pub fn new(first: CellIndex, second: CellIndex) -> Self {
        Self { first, second }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemGraph {
    vertices: Vec<CellIndex>,
    edges: Vec<Edge>,
}

impl DemGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(vertices: Vec<CellIndex>, edges: Vec<Edge>) -> Self {
        Self { vertices, edges }
    }

    /// Build the 4-connected adjacency over the valid cells of a map.
    /// Each undirected neighbour pair appears once, right and down from the
    /// scan position.
    pub fn from_dem(dem: &Dem) -> Self {
        let mut graph = Self::new();
        for idx in dem.cell_indices() {
            if !dem.is_valid(idx) {
                continue;
            }
            graph.vertices.push(idx);
            let right = CellIndex::new(idx.x + 1, idx.y);
            if dem.is_valid(right) {
                graph.edges.push(Edge::new(idx, right));
            }
            let down = CellIndex::new(idx.x, idx.y + 1);
            if dem.is_valid(down) {
                graph.edges.push(Edge::new(idx, down));
            }
        }
        graph
    }

    pub fn push_vertex(&mut self, v: CellIndex) {
        self.vertices.push(v);
    }

    pub fn push_edge(&mut self, e: Edge) {
        self.edges.push(e);
    }

    pub fn vertices(&self) -> &[CellIndex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
}
