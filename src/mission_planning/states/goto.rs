use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::common::{MotionCommand, RobotCommands};
use crate::mission_planning::context::StateMachineContext;
use crate::mission_planning::state_machine::{
    EngineStatus, StateTransition, Tick, COMPLETED_EXIT, STAY_EXIT, UNREACHABLE_EXIT,
};
use crate::utils::fuzzy::{and, defuzzy, not, or, positive};

/// Sensor sweep angle while moving [deg]
pub const SCAN_ANGLE: i32 = 45;
/// Duration of a sensor sweep [ms]
pub const SCANNING_TIME: u64 = 100;
/// Maximum angle between sensor and target to trust an echo on the way [deg]
pub const SENSOR_TOLERANCE_DEG: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GotoConfig {
    /// Arrival distance [m]
    pub distance: f64,
    /// Distance below which the robot slows down [m]
    pub approach_distance: f64,
    pub approach_speed: f64,
    pub final_speed: f64,
    /// Period of the sensor sweeps [ms]
    pub scan_interval_ms: u64,
    /// Minimum target distance to declare it unreachable [m]
    pub min_unreachable_distance: f64,
    /// Echo distance triggering a lateral detour [m]
    pub detour_distance: f64,
    /// Steering correction of a detour [deg]
    pub detour_deg: i32,
    pub timeout_ms: Option<u64>,
}

impl Default for GotoConfig {
    fn default() -> Self {
        GotoConfig {
            distance: 0.2,
            approach_distance: 0.5,
            approach_speed: 1.0,
            final_speed: 0.5,
            scan_interval_ms: 1000,
            min_unreachable_distance: 0.5,
            detour_distance: 0.4,
            detour_deg: 30,
            timeout_ms: None,
        }
    }
}

impl GotoConfig {
    pub fn resolve(name: &str, ctx: &StateMachineContext) -> Self {
        let d = Self::default();
        GotoConfig {
            distance: ctx.state_number(name, "distance", d.distance),
            approach_distance: ctx.state_number(name, "approachDistance", d.approach_distance),
            approach_speed: ctx.state_number(name, "approachSpeed", d.approach_speed),
            final_speed: ctx.state_number(name, "finalSpeed", d.final_speed),
            scan_interval_ms: ctx.state_millis(name, "scanInterval", d.scan_interval_ms),
            min_unreachable_distance: ctx.state_number(
                name,
                "minUnreachableDistance",
                d.min_unreachable_distance,
            ),
            detour_distance: ctx.state_number(name, "detourDistance", d.detour_distance),
            detour_deg: ctx.state_number(name, "detourDeg", d.detour_deg as f64).round() as i32,
            timeout_ms: ctx.state_timeout(name, d.timeout_ms),
        }
    }
}

/// Drives the robot to the context target
#[derive(Debug, Clone)]
pub struct GotoStatus {
    name: String,
    config: GotoConfig,
}

impl GotoStatus {
    pub fn new(name: &str) -> Self {
        GotoStatus {
            name: name.to_string(),
            config: GotoConfig::default(),
        }
    }

    /// Fuzzy speed: full speed far away, final speed on approach, 0 at arrival
    fn speed(&self, distance: f64) -> f64 {
        let cfg = &self.config;
        let is_approach = positive(distance, cfg.approach_distance);
        let is_final = and(positive(distance, cfg.distance), not(is_approach));
        defuzzy(&[
            (cfg.final_speed, is_final),
            (cfg.approach_speed, is_approach),
            (0.0, not(or(is_final, is_approach))),
        ])
    }

    /// Sensor direction: a short sweep alternately left and right each interval
    fn scan_direction(&self, elapsed: u64) -> i32 {
        let interval = self.config.scan_interval_ms.max(SCANNING_TIME * 2);
        if elapsed % interval > SCANNING_TIME {
            0
        } else if (elapsed / interval) % 2 == 0 {
            SCAN_ANGLE
        } else {
            -SCAN_ANGLE
        }
    }
}

impl EngineStatus for GotoStatus {
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self, ctx: &mut StateMachineContext, now_ms: u64) {
        self.config = GotoConfig::resolve(&self.name, ctx);
        ctx.enter(&self.name, now_ms, self.config.timeout_ms);
        match ctx.target() {
            Some(target) => info!("{}: goto {:?}", self.name, target),
            None => warn!("{}: missing target", self.name),
        }
    }

    fn process(&mut self, tick: &Tick<'_>, ctx: &mut StateMachineContext) -> StateTransition {
        let Some(target) = ctx.target() else {
            return StateTransition::halt(COMPLETED_EXIT);
        };
        let sample = tick.sample;
        let distance = sample.robot_distance(&target);
        if distance <= self.config.distance {
            debug!("{}: target reached", self.name);
            return StateTransition::halt(COMPLETED_EXIT);
        }

        let is_unreachable = distance >= self.config.min_unreachable_distance
            && sample.has_echo()
            && sample.sensor_relative_deg_to(&target).abs() <= SENSOR_TOLERANCE_DEG
            && sample.echo_distance <= distance;
        if is_unreachable {
            if let Some(echo) = sample.echo_location() {
                ctx.set_obstacle(echo);
            }
            debug!("{}: obstacle on the way at {} m", self.name, sample.echo_distance);
            return StateTransition::new(
                UNREACHABLE_EXIT,
                RobotCommands::new(MotionCommand::Halt, sample.sensor_relative_deg),
            );
        }

        let mut direction = sample.robot_deg(&target);
        if let Some(echo) = sample.echo_location() {
            let side = sample.robot_relative_deg(&echo);
            if sample.echo_distance <= self.config.detour_distance
                && side.abs() > SENSOR_TOLERANCE_DEG
                && side.abs() <= 90
            {
                direction -= side.signum() * self.config.detour_deg;
                debug!("{}: detour from obstacle at {} deg", self.name, side);
            }
        }

        let speed = self.speed(distance);
        let sensor = self.scan_direction(ctx.elapsed(tick.now()).unwrap_or(0));
        debug!("{}: direction {}, speed {}, sensor {}", self.name, direction, speed, sensor);
        StateTransition::new(
            STAY_EXIT,
            RobotCommands::new(MotionCommand::moving(direction, speed), sensor),
        )
    }
}
