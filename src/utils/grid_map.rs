// grid topology definition
// bijection between continuous space and integer grid cells

use crate::common::{BrainError, BrainResult, GridCell, Point2D};

/// Square grid with fixed cell size
///
/// Cell `c` covers `[c * size, (c + 1) * size)` on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTopology {
    grid_size: f64,
}

impl GridTopology {
    pub fn new(grid_size: f64) -> BrainResult<Self> {
        if !(grid_size.is_finite() && grid_size > 0.0) {
            return Err(BrainError::InvalidParameter(format!(
                "grid size must be positive, got {}",
                grid_size
            )));
        }
        Ok(Self { grid_size })
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    /// Cell containing the point
    pub fn cell(&self, point: &Point2D) -> GridCell {
        GridCell::new(
            (point.x / self.grid_size).floor() as i32,
            (point.y / self.grid_size).floor() as i32,
        )
    }

    /// Center of the cell
    pub fn to_point(&self, cell: &GridCell) -> Point2D {
        Point2D::new(
            (cell.x as f64 + 0.5) * self.grid_size,
            (cell.y as f64 + 0.5) * self.grid_size,
        )
    }

    /// Center of the cell containing the point
    pub fn snap(&self, point: &Point2D) -> Point2D {
        self.to_point(&self.cell(point))
    }

    /// Number of cells covering the distance
    pub fn cells_for(&self, distance: f64) -> i32 {
        (distance / self.grid_size).ceil() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_grid_size() {
        assert!(GridTopology::new(0.0).is_err());
        assert!(GridTopology::new(-0.2).is_err());
        assert!(GridTopology::new(f64::NAN).is_err());
    }

    #[test]
    fn test_cell_and_point() {
        let grid = GridTopology::new(0.2).unwrap();
        assert_eq!(grid.cell(&Point2D::new(0.0, 0.0)), GridCell::new(0, 0));
        assert_eq!(grid.cell(&Point2D::new(0.19, -0.01)), GridCell::new(0, -1));
        assert_eq!(grid.cell(&Point2D::new(1.0, 0.0)), GridCell::new(5, 0));

        let p = grid.to_point(&GridCell::new(-1, 2));
        assert!((p.x + 0.1).abs() < 1e-12);
        assert!((p.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_snap() {
        let grid = GridTopology::new(0.5).unwrap();
        let p = grid.snap(&Point2D::new(0.7, -0.2));
        assert_eq!(p, Point2D::new(0.75, -0.25));
    }

    #[test]
    fn test_cells_for() {
        let grid = GridTopology::new(0.2).unwrap();
        assert_eq!(grid.cells_for(0.3), 2);
        assert_eq!(grid.cells_for(0.0), 0);
    }
}
