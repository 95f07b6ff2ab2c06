use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::common::Point2D;
use crate::mapping::OccupancyMap;
use crate::mission_planning::context::StateMachineContext;
use crate::mission_planning::safety::STOP_DISTANCE;
use crate::mission_planning::state_machine::{
    EngineStatus, StateTransition, Tick, NOT_FOUND_EXIT, TARGET_SELECTED_EXIT,
};

/// Random draws before giving up
pub const NUM_TRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomTargetConfig {
    /// Center of the sampling square
    pub center: Point2D,
    /// Half side of the sampling square [m]
    pub max_distance: f64,
    pub safe_distance: f64,
    pub likelihood_threshold: f64,
    pub timeout_ms: Option<u64>,
}

impl Default for RandomTargetConfig {
    fn default() -> Self {
        RandomTargetConfig {
            center: Point2D::origin(),
            max_distance: 3.0,
            safe_distance: 1.5 * STOP_DISTANCE,
            likelihood_threshold: 0.5,
            timeout_ms: None,
        }
    }
}

impl RandomTargetConfig {
    pub fn resolve(name: &str, ctx: &StateMachineContext) -> Self {
        let d = Self::default();
        RandomTargetConfig {
            center: ctx.state_point(name, "center").unwrap_or(d.center),
            max_distance: ctx.state_number(name, "maxDistance", d.max_distance),
            safe_distance: ctx.state_number(name, "safeDistance", d.safe_distance),
            likelihood_threshold: ctx.state_number(name, "likelihoodThreshold", d.likelihood_threshold),
            timeout_ms: ctx.state_timeout(name, d.timeout_ms),
        }
    }
}

/// Draws a random free target around the configured center
///
/// A candidate is accepted when it lies farther than the safe distance from
/// `robot` and outside the prohibited cells of `map`.
pub fn random_target<R: Rng + ?Sized>(
    rng: &mut R,
    map: &OccupancyMap,
    robot: &Point2D,
    config: &RandomTargetConfig,
) -> Option<Point2D> {
    let range = config.max_distance.abs();
    if range == 0.0 {
        return None;
    }
    (0..NUM_TRIES)
        .map(|_| {
            Point2D::new(
                config.center.x + rng.gen_range(-range..range),
                config.center.y + rng.gen_range(-range..range),
            )
        })
        .find(|p| p.distance(robot) > config.safe_distance && !map.is_prohibited(p))
}

/// Selects a random reachable target
#[derive(Debug, Clone)]
pub struct RandomTargetStatus<R = StdRng> {
    name: String,
    config: RandomTargetConfig,
    rng: R,
}

impl RandomTargetStatus<StdRng> {
    pub fn new(name: &str) -> Self {
        Self::with_rng(name, StdRng::from_entropy())
    }
}

impl<R> RandomTargetStatus<R>
where
    R: Rng + Send,
{
    pub fn with_rng(name: &str, rng: R) -> Self {
        RandomTargetStatus {
            name: name.to_string(),
            config: RandomTargetConfig::default(),
            rng,
        }
    }
}

impl<R> EngineStatus for RandomTargetStatus<R>
where
    R: Rng + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self, ctx: &mut StateMachineContext, now_ms: u64) {
        self.config = RandomTargetConfig::resolve(&self.name, ctx);
        ctx.enter(&self.name, now_ms, self.config.timeout_ms);
    }

    fn process(&mut self, tick: &Tick<'_>, ctx: &mut StateMachineContext) -> StateTransition {
        let map = tick
            .map
            .with_safety(self.config.safe_distance, self.config.likelihood_threshold);
        match random_target(&mut self.rng, &map, &tick.sample.robot_location, &self.config) {
            Some(target) => {
                debug!("{}: target {:?}", self.name, target);
                ctx.set_target(target);
                StateTransition::halt(TARGET_SELECTED_EXIT)
            }
            None => {
                warn!("{}: target not found", self.name);
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

    #[test]
    fn test_target_in_range_and_free() {
        let mut map = OccupancyMap::new(OccupancyMapConfig::default()).unwrap();
        for x in -5..=5 {
            map.insert(&Point2D::new(x as f64 * 0.2 + 0.1, 0.5), 0, 1.0);
        }
        let mut ctx = StateMachineContext::new();
        ctx.set_param("random.center", Point2D::new(1.0, 1.0));
        ctx.set_param("random.maxDistance", 1.0);
        let mut status = RandomTargetStatus::with_rng("random", StdRng::seed_from_u64(1));
        status.activate(&mut ctx, 0);

        let sample = RobotSample::new(0, Point2D::new(1.0, 1.0), 0);
        for _ in 0..20 {
            let tx = status.process(&Tick::new(&sample, &map), &mut ctx);
            assert_eq!(tx.exit, TARGET_SELECTED_EXIT);
            let target = ctx.target().unwrap();
            assert!((target.x - 1.0).abs() <= 1.0 && (target.y - 1.0).abs() <= 1.0);
            assert!(target.distance(&sample.robot_location) > 0.3);
            assert!(!map.is_prohibited(&target));
        }
    }

    #[test]
    fn test_not_found() {
        let map = OccupancyMap::new(OccupancyMapConfig::default()).unwrap();
        let mut ctx = StateMachineContext::new();
        ctx.set_target(Point2D::new(5.0, 5.0));
        // every candidate falls within the safe distance of the robot
        ctx.set_param("random.maxDistance", 0.1);
        let mut status = RandomTargetStatus::with_rng("random", StdRng::seed_from_u64(3));
        status.activate(&mut ctx, 0);

        let sample = RobotSample::new(0, Point2D::origin(), 0);
        let tx = status.process(&Tick::new(&sample, &map), &mut ctx);
        assert_eq!(tx.exit, NOT_FOUND_EXIT);
        assert_eq!(ctx.target(), None);
    }
}
