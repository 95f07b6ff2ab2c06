use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::common::{GridCell, GridPathPlanner, Path2D, PathOptimizer, Point2D};
use crate::mapping::OccupancyMap;
use crate::mission_planning::context::StateMachineContext;
use crate::mission_planning::safety::STOP_DISTANCE;
use crate::mission_planning::state_machine::{
    EngineStatus, StateTransition, Tick, COMPLETED_EXIT, NO_PATH_EXIT, TARGET_REACHED_EXIT,
};
use crate::path_planning::{AStarPlanner, LineOfSightOptimizer};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindPathConfig {
    pub safe_distance: f64,
    pub likelihood_threshold: f64,
    /// Allowed search extension beyond the direct route [m]
    pub extension_distance: f64,
    pub timeout_ms: Option<u64>,
}

impl Default for FindPathConfig {
    fn default() -> Self {
        FindPathConfig {
            safe_distance: 1.5 * STOP_DISTANCE,
            likelihood_threshold: 0.5,
            extension_distance: 3.0,
            timeout_ms: None,
        }
    }
}

impl FindPathConfig {
    pub fn resolve(name: &str, ctx: &StateMachineContext) -> Self {
        let d = Self::default();
        FindPathConfig {
            safe_distance: ctx.state_number(name, "safeDistance", d.safe_distance),
            likelihood_threshold: ctx.state_number(name, "likelihoodThreshold", d.likelihood_threshold),
            extension_distance: ctx.state_number(name, "extensionDistance", d.extension_distance),
            timeout_ms: ctx.state_timeout(name, d.timeout_ms),
        }
    }
}

/// Outcome of a path search on the map
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedPath {
    /// Start or goal prohibited, or goal not reachable
    NoPath,
    /// Start and goal in the same cell
    TargetReached,
    /// Simplified waypoints, starting after the robot location and ending at the target
    Waypoints(Vec<Point2D>),
}

/// Searches the grid path from `from` to `target` and simplifies it
///
/// The map safety parameters define the prohibited cells.
pub fn plan_path<P>(planner: &P, map: &OccupancyMap, from: &Point2D, target: &Point2D) -> PlannedPath
where
    P: GridPathPlanner,
{
    let prohibited = map.prohibited();
    let start = map.cell(from);
    let goal = map.cell(target);
    let cells = planner.find_path(start, goal, |c| prohibited.contains(c));
    match cells.len() {
        0 => PlannedPath::NoPath,
        1 => PlannedPath::TargetReached,
        n => {
            let mut route = Path2D::new();
            route.push(*from);
            for cell in &cells[1..n - 1] {
                route.push(map.to_point(cell));
            }
            route.push(*target);
            let optimizer = LineOfSightOptimizer::new(map.grid_size(), |c: &GridCell| prohibited.contains(c));
            let simplified = optimizer.optimize(&route);
            debug!(
                "simplified {} cells to {} points, length {:.2} m",
                route.len(),
                simplified.len(),
                simplified.total_length()
            );
            let mut path = simplified.points;
            path.remove(0);
            PlannedPath::Waypoints(path)
        }
    }
}

/// Plans a safe path to the context target and publishes it in the context
#[derive(Debug, Clone)]
pub struct FindPathStatus {
    name: String,
    config: FindPathConfig,
}

impl FindPathStatus {
    pub fn new(name: &str) -> Self {
        FindPathStatus {
            name: name.to_string(),
            config: FindPathConfig::default(),
        }
    }
}

impl EngineStatus for FindPathStatus {
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self, ctx: &mut StateMachineContext, now_ms: u64) {
        self.config = FindPathConfig::resolve(&self.name, ctx);
        ctx.enter(&self.name, now_ms, self.config.timeout_ms);
    }

    fn process(&mut self, tick: &Tick<'_>, ctx: &mut StateMachineContext) -> StateTransition {
        let Some(target) = ctx.target() else {
            warn!("{}: missing target", self.name);
            ctx.clear_path();
            return StateTransition::halt(NO_PATH_EXIT);
        };
        let map = tick
            .map
            .with_safety(self.config.safe_distance, self.config.likelihood_threshold);
        let planner = AStarPlanner::with_extension_distance(map.grid(), self.config.extension_distance);
        debug!(
            "{}: searching path to {:?} with extension {} cells",
            self.name,
            target,
            planner.extension_cells()
        );
        match plan_path(&planner, &map, &tick.sample.robot_location, &target) {
            PlannedPath::NoPath => {
                warn!("{}: path not found", self.name);
                ctx.clear_path();
                StateTransition::halt(NO_PATH_EXIT)
            }
            PlannedPath::TargetReached => {
                debug!("{}: target reached", self.name);
                ctx.clear_path();
                StateTransition::halt(TARGET_REACHED_EXIT)
            }
            PlannedPath::Waypoints(path) => {
                debug!("{}: path {:?}", self.name, path);
                ctx.set_path(path);
                StateTransition::halt(COMPLETED_EXIT)
            }
        }
    }
}
