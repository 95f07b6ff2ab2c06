use log::debug;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::common::Point2D;
use crate::mapping::OccupancyMap;
use crate::mission_planning::context::StateMachineContext;
use crate::mission_planning::safety::STOP_DISTANCE;
use crate::mission_planning::state_machine::{
    EngineStatus, StateTransition, Tick, NOT_FOUND_EXIT, TARGET_SELECTED_EXIT,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NearestSafeConfig {
    pub safe_distance: f64,
    pub likelihood_threshold: f64,
    pub timeout_ms: Option<u64>,
}

impl Default for NearestSafeConfig {
    fn default() -> Self {
        NearestSafeConfig {
            safe_distance: 1.5 * STOP_DISTANCE,
            likelihood_threshold: 0.5,
            timeout_ms: None,
        }
    }
}

impl NearestSafeConfig {
    pub fn resolve(name: &str, ctx: &StateMachineContext) -> Self {
        let d = Self::default();
        NearestSafeConfig {
            safe_distance: ctx.state_number(name, "safeDistance", d.safe_distance),
            likelihood_threshold: ctx.state_number(name, "likelihoodThreshold", d.likelihood_threshold),
            timeout_ms: ctx.state_timeout(name, d.timeout_ms),
        }
    }
}

/// Center of the contour cell nearest to `from`
pub fn nearest_safe(map: &OccupancyMap, from: &Point2D) -> Option<Point2D> {
    map.contours()
        .iter()
        .map(|cell| map.to_point(cell))
        .min_by_key(|p| (OrderedFloat(p.distance_sq(from)), OrderedFloat(p.x), OrderedFloat(p.y)))
}

/// Selects the nearest cell just outside the prohibited area as target
#[derive(Debug, Clone)]
pub struct NearestSafeStatus {
    name: String,
    config: NearestSafeConfig,
}

impl NearestSafeStatus {
    pub fn new(name: &str) -> Self {
        NearestSafeStatus {
            name: name.to_string(),
            config: NearestSafeConfig::default(),
        }
    }
}

impl EngineStatus for NearestSafeStatus {
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self, ctx: &mut StateMachineContext, now_ms: u64) {
        self.config = NearestSafeConfig::resolve(&self.name, ctx);
        ctx.enter(&self.name, now_ms, self.config.timeout_ms);
    }

    fn process(&mut self, tick: &Tick<'_>, ctx: &mut StateMachineContext) -> StateTransition {
        let map = tick
            .map
            .with_safety(self.config.safe_distance, self.config.likelihood_threshold);
        match nearest_safe(&map, &tick.sample.robot_location) {
            Some(target) => {
                debug!("{}: safe location {:?}", self.name, target);
                ctx.set_target(target);
                StateTransition::halt(TARGET_SELECTED_EXIT)
            }
            None => {
                debug!("{}: no safe location", self.name);
                ctx.clear_target();
                StateTransition::halt(NOT_FOUND_EXIT)
            }
        }
    }
}
