use log::debug;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::common::Point2D;
use crate::mapping::OccupancyMap;
use crate::mission_planning::context::StateMachineContext;
use crate::mission_planning::state_machine::{
    EngineStatus, StateTransition, Tick, NOT_FOUND_EXIT, TARGET_SELECTED_EXIT,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NearestObstacleConfig {
    /// Maximum search distance from the robot [m]
    pub max_distance: f64,
    pub likelihood_threshold: f64,
    pub timeout_ms: Option<u64>,
}

impl Default for NearestObstacleConfig {
    fn default() -> Self {
        NearestObstacleConfig {
            max_distance: 3.0,
            likelihood_threshold: 0.5,
            timeout_ms: None,
        }
    }
}

impl NearestObstacleConfig {
    pub fn resolve(name: &str, ctx: &StateMachineContext) -> Self {
        let d = Self::default();
        NearestObstacleConfig {
            max_distance: ctx.state_number(name, "maxDistance", d.max_distance),
            likelihood_threshold: ctx.state_number(name, "likelihoodThreshold", d.likelihood_threshold),
            timeout_ms: ctx.state_timeout(name, d.timeout_ms),
        }
    }
}

/// Nearest reliable obstacle within `max_distance` of `from`
pub fn nearest_obstacle(
    map: &OccupancyMap,
    from: &Point2D,
    max_distance: f64,
    likelihood_threshold: f64,
) -> Option<Point2D> {
    let max_distance_sq = max_distance * max_distance;
    map.obstacles()
        .filter(|o| o.likelihood >= likelihood_threshold)
        .map(|o| (OrderedFloat(o.location.distance_sq(from)), o.location))
        .filter(|(d, _)| d.0 <= max_distance_sq)
        .min_by_key(|(d, _)| *d)
        .map(|(_, location)| location)
}

/// Selects the nearest reliable obstacle as target
#[derive(Debug, Clone)]
pub struct NearestObstacleStatus {
    name: String,
    config: NearestObstacleConfig,
}

impl NearestObstacleStatus {
    pub fn new(name: &str) -> Self {
        NearestObstacleStatus {
            name: name.to_string(),
            config: NearestObstacleConfig::default(),
        }
    }
}

impl EngineStatus for NearestObstacleStatus {
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self, ctx: &mut StateMachineContext, now_ms: u64) {
        self.config = NearestObstacleConfig::resolve(&self.name, ctx);
        ctx.enter(&self.name, now_ms, self.config.timeout_ms);
    }

    fn process(&mut self, tick: &Tick<'_>, ctx: &mut StateMachineContext) -> StateTransition {
        let nearest = nearest_obstacle(
            tick.map,
            &tick.sample.robot_location,
            self.config.max_distance,
            self.config.likelihood_threshold,
        );
        match nearest {
            Some(target) => {
                debug!("{}: nearest obstacle {:?}", self.name, target);
                ctx.set_target(target);
                StateTransition::halt(TARGET_SELECTED_EXIT)
            }
            None => {
                debug!("{}: no obstacle", self.name);
                ctx.clear_target();
                StateTransition::halt(NOT_FOUND_EXIT)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::RobotSample;
    use crate::mapping::OccupancyMapConfig;

    fn map() -> OccupancyMap {
        let mut map = OccupancyMap::new(OccupancyMapConfig::default()).unwrap();
        map.insert(&Point2D::new(1.1, 0.1), 0, 1.0);
        map.insert(&Point2D::new(0.5, 0.1), 0, 0.3);
        map.insert(&Point2D::new(-2.1, 0.1), 0, 1.0);
        map
    }

    #[test]
    fn test_nearest_reliable() {
        let map = map();
        let target = nearest_obstacle(&map, &Point2D::origin(), 3.0, 0.5);
        assert_eq!(target, Some(map.snap(&Point2D::new(1.1, 0.1))));
        let target = nearest_obstacle(&map, &Point2D::origin(), 3.0, 0.2);
        assert_eq!(target, Some(map.snap(&Point2D::new(0.5, 0.1))));
        assert_eq!(nearest_obstacle(&map, &Point2D::origin(), 1.0, 0.5), None);
    }

    #[test]
    fn test_status_exits() {
        let map = map();
        let mut ctx = StateMachineContext::new();
        let mut status = NearestObstacleStatus::new("nearest");
        status.activate(&mut ctx, 0);
        let sample = RobotSample::new(0, Point2D::new(-1.5, 0.0), 0);
        let tx = status.process(&Tick::new(&sample, &map), &mut ctx);
        assert_eq!(tx.exit, TARGET_SELECTED_EXIT);
        assert_eq!(ctx.target(), Some(map.snap(&Point2D::new(-2.1, 0.1))));

        let sample = RobotSample::new(0, Point2D::new(10.0, 10.0), 0);
        let tx = status.process(&Tick::new(&sample, &map), &mut ctx);
        assert_eq!(tx.exit, NOT_FOUND_EXIT);
        assert_eq!(ctx.target(), None);
    }
}
