use serde::{Deserialize, Serialize};

use crate::coords::{CellIndex, Point2};

/// One elevation-map cell: a Gaussian height estimate at a known planar
/// centre. Cells without enough observed data carry `valid = false` and are
/// excluded from modeling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// Mean of the height estimate in metres.
    pub height_mean: f64,
    /// Variance of the height estimate.
    pub height_variance: f64,
    /// Physical centre of the cell in the plane.
    pub center: Point2,
    pub valid: bool,
}

/// A digital elevation map: a 2D array of height-estimating cells, row-major
/// with x as the slower index. The map is built by the upstream point-cloud
/// stage; this core only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dem {
    cells: Vec<Cell>,
    num_cells_x: usize,
    num_cells_y: usize,
    /// Lower corner of the mapped extent.
    min_coord: Point2,
    /// Cell size along (x, y) in metres.
    resolution: (f64, f64),
}

impl Dem {
    /// Create a map of invalid cells with centres computed from the extent
    /// origin and resolution.
    pub fn new(
        min_coord: Point2,
        resolution: (f64, f64),
        num_cells_x: usize,
        num_cells_y: usize,
    ) -> Self {
        let mut cells = Vec::with_capacity(num_cells_x * num_cells_y);
        for i in 0..num_cells_x {
            for j in 0..num_cells_y {
                let center = Point2::new(
                    min_coord.x + (i as f64 + 0.5) * resolution.0,
                    min_coord.y + (j as f64 + 0.5) * resolution.1,
                );
                cells.push(Cell {
                    height_mean: 0.0,
                    height_variance: 0.0,
                    center,
                    valid: false,
                });
            }
        }
        Self { cells, num_cells_x, num_cells_y, min_coord, resolution }
    }

    pub fn num_cells_x(&self) -> usize {
        self.num_cells_x
    }

    pub fn num_cells_y(&self) -> usize {
        self.num_cells_y
    }

    pub fn min_coord(&self) -> Point2 {
        self.min_coord
    }

    pub fn resolution(&self) -> (f64, f64) {
        self.resolution
    }

    pub fn get(&self, idx: CellIndex) -> Option<&Cell> {
        if idx.x < self.num_cells_x && idx.y < self.num_cells_y {
            Some(&self.cells[idx.x * self.num_cells_y + idx.y])
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, idx: CellIndex) -> Option<&mut Cell> {
        if idx.x < self.num_cells_x && idx.y < self.num_cells_y {
            Some(&mut self.cells[idx.x * self.num_cells_y + idx.y])
        } else {
            None
        }
    }

    pub fn is_valid(&self, idx: CellIndex) -> bool {
        self.get(idx).is_some_and(|c| c.valid)
    }

    pub fn num_valid_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.valid).count()
    }

    /// All cell indices in row-major scan order (x outer, y inner). Model
    /// variables are created in exactly this order.
    pub fn cell_indices(&self) -> impl Iterator<Item = CellIndex> + '_ {
        let ny = self.num_cells_y;
        (0..self.num_cells_x).flat_map(move |x| (0..ny).map(move |y| CellIndex::new(x, y)))
    }
}
