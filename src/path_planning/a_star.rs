// A* grid path search
// 8-connected cells, squared euclidean step cost and heuristic.
// The squared metric favours short steps and straight runs; the result is
// a good path but not provably the shortest one.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use itertools::iproduct;
use log::debug;
use ordered_float::OrderedFloat;

use crate::common::{GridCell, GridPathPlanner};
use crate::utils::GridTopology;

/// A* planner bounded by an extension radius around the start-goal segment
#[derive(Debug, Clone, Copy)]
pub struct AStarPlanner {
    /// Allowed search extension [cells]
    extension_cells: i32,
}

impl AStarPlanner {
    pub fn new(extension_cells: i32) -> Self {
        AStarPlanner {
            extension_cells: extension_cells.max(0),
        }
    }

    /// Planner with the extension given in meters
    pub fn with_extension_distance(grid: &GridTopology, extension_distance: f64) -> Self {
        Self::new(grid.cells_for(extension_distance.max(0.0)))
    }

    pub fn extension_cells(&self) -> i32 {
        self.extension_cells
    }

    /// Upper bound of the squared distance of a searched cell from start and goal
    pub fn max_distance_sq(&self, start: &GridCell, goal: &GridCell) -> f64 {
        let ext = self.extension_cells as f64;
        start.distance_sq(goal) + ext * ext
    }

    fn motion_model() -> impl Iterator<Item = (i32, i32)> {
        iproduct!(-1..=1, -1..=1).filter(|&(dx, dy)| (dx, dy) != (0, 0))
    }
}

impl Default for AStarPlanner {
    fn default() -> Self {
        AStarPlanner::new(5)
    }
}

impl GridPathPlanner for AStarPlanner {
    fn find_path<F>(&self, start: GridCell, goal: GridCell, is_prohibited: F) -> Vec<GridCell>
    where
        F: Fn(&GridCell) -> bool,
    {
        let max_distance_sq = self.max_distance_sq(&start, &goal);
        let blocked = |cell: &GridCell| {
            is_prohibited(cell)
                || cell.distance_sq(&start) > max_distance_sq
                || cell.distance_sq(&goal) > max_distance_sq
        };
        if blocked(&start) || blocked(&goal) {
            debug!("A* from {:?} to {:?}: end point prohibited", start, goal);
            return Vec::new();
        }

        let mut open_set = BinaryHeap::new();
        let mut closed_set = HashSet::new();
        let mut g_score: HashMap<GridCell, f64> = HashMap::new();
        let mut came_from: HashMap<GridCell, GridCell> = HashMap::new();

        g_score.insert(start, 0.0);
        open_set.push((Reverse(OrderedFloat(start.distance_sq(&goal))), start));

        while let Some((_, current)) = open_set.pop() {
            if current == goal {
                debug!(
                    "A* from {:?} to {:?}: {} cells explored",
                    start,
                    goal,
                    closed_set.len()
                );
                return reconstruct_path(&came_from, current);
            }
            if !closed_set.insert(current) {
                continue;
            }
            let current_g = g_score.get(&current).copied().unwrap_or(f64::INFINITY);

            for (dx, dy) in Self::motion_model() {
                let neighbour = current.offset(dx, dy);
                if closed_set.contains(&neighbour) || blocked(&neighbour) {
                    continue;
                }
                let tentative_g = current_g + current.distance_sq(&neighbour);
                let known_g = g_score.get(&neighbour).copied().unwrap_or(f64::INFINITY);
                if tentative_g < known_g {
                    came_from.insert(neighbour, current);
                    g_score.insert(neighbour, tentative_g);
                    let f = tentative_g + neighbour.distance_sq(&goal);
                    open_set.push((Reverse(OrderedFloat(f)), neighbour));
                }
            }
        }
        debug!(
            "A* from {:?} to {:?}: no path, {} cells explored",
            start,
            goal,
            closed_set.len()
        );
        Vec::new()
    }
}

fn reconstruct_path(came_from: &HashMap<GridCell, GridCell>, goal: GridCell) -> Vec<GridCell> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(previous) = came_from.get(&current) {
        path.push(*previous);
        current = *previous;
    }
    path.reverse();
    path
}
