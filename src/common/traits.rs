//! Common traits defining interfaces of the planning algorithms

use crate::common::types::*;

/// Trait for grid-based path search algorithms
pub trait GridPathPlanner {
    /// Find a sequence of 8-connected cells from start to goal avoiding the
    /// prohibited ones.
    ///
    /// Returns an empty sequence when the goal cannot be reached.
    fn find_path<F>(&self, start: GridCell, goal: GridCell, is_prohibited: F) -> Vec<GridCell>
    where
        F: Fn(&GridCell) -> bool;
}

/// Trait for path post-processing (simplification, smoothing)
pub trait PathOptimizer {
    /// Optimize a path keeping its first and last point
    fn optimize(&self, path: &Path2D) -> Path2D;
}
