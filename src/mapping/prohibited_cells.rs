// Safety margin around the obstacles
// cells closer than the safe distance to a reliable obstacle are prohibited

use std::collections::HashSet;

use crate::common::GridCell;
use crate::mapping::Obstacle;
use crate::utils::GridTopology;

/// Slack on the squared radius [cells²] so cells exactly at the safe distance are kept
const RADIUS_EPSILON: f64 = 1e-9;

/// Dilates the reliable obstacle cells by a safe distance
#[derive(Debug, Clone, Copy)]
pub struct ProhibitedCellFinder {
    grid: GridTopology,
    safe_distance: f64,
    likelihood_threshold: f64,
}

impl ProhibitedCellFinder {
    pub fn new(grid: GridTopology, safe_distance: f64, likelihood_threshold: f64) -> Self {
        ProhibitedCellFinder {
            grid,
            safe_distance,
            likelihood_threshold,
        }
    }

    /// Kernel cells (obstacles above the likelihood threshold) and their fringe
    pub fn find<'a, I>(&self, obstacles: I) -> HashSet<GridCell>
    where
        I: IntoIterator<Item = &'a Obstacle>,
    {
        let kernel: HashSet<GridCell> = obstacles
            .into_iter()
            .filter(|o| o.likelihood >= self.likelihood_threshold)
            .map(|o| self.grid.cell(&o.location))
            .collect();
        self.dilate(&kernel)
    }

    /// Kernel cells plus every cell within the safe distance of a kernel cell
    pub fn dilate(&self, kernel: &HashSet<GridCell>) -> HashSet<GridCell> {
        let safe_cells = self.safe_distance / self.grid.grid_size();
        let safe_cells_sq = safe_cells * safe_cells + RADIUS_EPSILON;
        let radius = self.grid.cells_for(self.safe_distance);

        // A neighbour within the radius of its generating cell is within the
        // radius of the nearest kernel cell too, so one offset mask suffices.
        let mask: Vec<(i32, i32)> = itertools::iproduct!(-radius..=radius, -radius..=radius)
            .filter(|&(i, j)| (i * i + j * j) as f64 <= safe_cells_sq)
            .collect();

        kernel
            .iter()
            .flat_map(|cell| mask.iter().map(move |&(i, j)| cell.offset(i, j)))
            .chain(kernel.iter().copied())
            .collect()
    }

    /// Cells adjacent to a prohibited cell but not prohibited themselves
    pub fn find_contour(prohibited: &HashSet<GridCell>) -> HashSet<GridCell> {
        prohibited
            .iter()
            .flat_map(|cell| cell.neighbours())
            .filter(|cell| !prohibited.contains(cell))
            .collect()
    }
}
