// Path simplification by line of sight
// divide and conquer: keep the end points when they see each other,
// otherwise split at the middle point and simplify the halves.

use crate::common::{GridCell, Path2D, PathOptimizer, Point2D};

/// Boundary crossings closer than this are a corner crossing [cells]
const CORNER_EPSILON: f64 = 1e-9;

/// True if the segment crosses no prohibited cell
///
/// The cells are walked in order from `from` to `to`. At each cell the next
/// boundary crossing is computed; a crossing exactly through a corner moves
/// diagonally without visiting the two side cells.
pub fn line_of_sight<F>(from: &Point2D, to: &Point2D, grid_size: f64, is_prohibited: F) -> bool
where
    F: Fn(&GridCell) -> bool,
{
    let fx = from.x / grid_size;
    let fy = from.y / grid_size;
    let dx = to.x / grid_size - fx;
    let dy = to.y / grid_size - fy;

    let mut cell = GridCell::new(fx.floor() as i32, fy.floor() as i32);
    let end = GridCell::new((to.x / grid_size).floor() as i32, (to.y / grid_size).floor() as i32);
    let step_x = dx.signum() as i32;
    let step_y = dy.signum() as i32;

    // parametric position of the next vertical / horizontal boundary
    let mut t_max_x = boundary_param(fx, dx, cell.x);
    let mut t_max_y = boundary_param(fy, dy, cell.y);
    let t_delta_x = if dx != 0.0 { 1.0 / dx.abs() } else { f64::INFINITY };
    let t_delta_y = if dy != 0.0 { 1.0 / dy.abs() } else { f64::INFINITY };

    let max_steps = (end.x - cell.x).abs() + (end.y - cell.y).abs();
    for _ in 0..max_steps {
        if is_prohibited(&cell) {
            return false;
        }
        if cell == end {
            return true;
        }
        if (t_max_x - t_max_y).abs() <= CORNER_EPSILON {
            cell.x += step_x;
            cell.y += step_y;
            t_max_x += t_delta_x;
            t_max_y += t_delta_y;
        } else if t_max_x < t_max_y {
            cell.x += step_x;
            t_max_x += t_delta_x;
        } else {
            cell.y += step_y;
            t_max_y += t_delta_y;
        }
    }
    !is_prohibited(&cell) && !is_prohibited(&end)
}

fn boundary_param(origin: f64, delta: f64, cell: i32) -> f64 {
    if delta > 0.0 {
        (cell as f64 + 1.0 - origin) / delta
    } else if delta < 0.0 {
        (cell as f64 - origin) / delta
    } else {
        f64::INFINITY
    }
}

/// Minimal waypoints of `path` with line of sight between consecutive ones
pub fn optimize_path<F>(path: &[Point2D], grid_size: f64, is_prohibited: &F) -> Vec<Point2D>
where
    F: Fn(&GridCell) -> bool,
{
    let n = path.len();
    if n <= 2 {
        return path.to_vec();
    }
    let first = &path[0];
    let last = &path[n - 1];
    if line_of_sight(first, last, grid_size, is_prohibited) {
        return vec![*first, *last];
    }
    let mid = n / 2;
    let mut result = optimize_path(&path[..=mid], grid_size, is_prohibited);
    result.pop();
    result.extend(optimize_path(&path[mid..], grid_size, is_prohibited));
    result
}

/// [`PathOptimizer`] dropping the waypoints hidden by no prohibited cell
pub struct LineOfSightOptimizer<F>
where
    F: Fn(&GridCell) -> bool,
{
    grid_size: f64,
    is_prohibited: F,
}

impl<F> LineOfSightOptimizer<F>
where
    F: Fn(&GridCell) -> bool,
{
    pub fn new(grid_size: f64, is_prohibited: F) -> Self {
        LineOfSightOptimizer {
            grid_size,
            is_prohibited,
        }
    }
}

impl<F> PathOptimizer for LineOfSightOptimizer<F>
where
    F: Fn(&GridCell) -> bool,
{
    fn optimize(&self, path: &Path2D) -> Path2D {
        Path2D::from_points(optimize_path(&path.points, self.grid_size, &self.is_prohibited))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: f64 = 0.2;

    fn center(x: i32, y: i32) -> Point2D {
        Point2D::new((x as f64 + 0.5) * GRID, (y as f64 + 0.5) * GRID)
    }

    #[test]
    fn test_line_of_sight_free() {
        assert!(line_of_sight(&center(0, 0), &center(10, 3), GRID, |_| false));
        assert!(line_of_sight(&center(0, 0), &center(0, 0), GRID, |_| false));
        assert!(line_of_sight(&center(0, 0), &center(-5, 0), GRID, |_| false));
    }

    #[test]
    fn test_line_of_sight_blocked() {
        let blocked = |c: &GridCell| *c == GridCell::new(3, 0);
        assert!(!line_of_sight(&center(0, 0), &center(6, 0), GRID, blocked));
        assert!(line_of_sight(&center(0, 1), &center(6, 1), GRID, blocked));
        // end points are checked too
        assert!(!line_of_sight(&center(3, 0), &center(6, 3), GRID, blocked));
        assert!(!line_of_sight(&center(6, 3), &center(3, 0), GRID, blocked));
    }

    #[test]
    fn test_line_of_sight_diagonal_corner() {
        // the exact diagonal passes through the corners only
        let side = |c: &GridCell| *c == GridCell::new(1, 0) || *c == GridCell::new(0, 1);
        assert!(line_of_sight(&center(0, 0), &center(2, 2), GRID, side));
        let on_path = |c: &GridCell| *c == GridCell::new(1, 1);
        assert!(!line_of_sight(&center(0, 0), &center(2, 2), GRID, on_path));
    }

    #[test]
    fn test_line_of_sight_visits_crossed_cells() {
        // shallow segment from (0,0) to (4,1) crosses y = 1 between x = 2 and x = 3
        let crossed = |c: &GridCell| *c == GridCell::new(2, 0);
        assert!(!line_of_sight(&center(0, 0), &center(4, 1), GRID, crossed));
        let untouched = |c: &GridCell| *c == GridCell::new(1, 1);
        assert!(line_of_sight(&center(0, 0), &center(4, 1), GRID, untouched));
    }

    #[test]
    fn test_optimize_straight() {
        let path: Vec<Point2D> = (0..6).map(|i| center(i, 0)).collect();
        let optimized = optimize_path(&path, GRID, &|_: &GridCell| false);
        assert_eq!(optimized, vec![center(0, 0), center(5, 0)]);
    }

    #[test]
    fn test_optimize_short_paths() {
        let empty: Vec<Point2D> = Vec::new();
        assert!(optimize_path(&empty, GRID, &|_: &GridCell| false).is_empty());
        let two = vec![center(0, 0), center(5, 5)];
        assert_eq!(optimize_path(&two, GRID, &|_: &GridCell| true), two);
    }

    #[test]
    fn test_optimize_around_corner() {
        // L shaped path around a blocked block
        let blocked = |c: &GridCell| (1..=3).contains(&c.x) && (0..=2).contains(&c.y);
        let mut path: Vec<Point2D> = (0..=3).map(|y| center(0, y)).collect();
        path.extend((1..=4).map(|x| center(x, 3)));
        path.extend((0..=2).rev().map(|y| center(4, y)));

        let optimizer = LineOfSightOptimizer::new(GRID, blocked);
        let optimized = optimizer.optimize(&Path2D::from_points(path.clone()));

        assert_eq!(optimized.first(), path.first());
        assert_eq!(optimized.last(), path.last());
        assert!(optimized.len() < path.len());
        assert!(optimized
            .points
            .windows(2)
            .all(|w| line_of_sight(&w[0], &w[1], GRID, blocked)));
    }
}
