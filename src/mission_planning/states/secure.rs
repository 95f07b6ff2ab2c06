use std::mem;

use log::{debug, warn};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::common::{normalize_deg_i32, MotionCommand, Point2D, RobotCommands, RobotSample};
use crate::mapping::OccupancyMap;
use crate::mission_planning::context::StateMachineContext;
use crate::mission_planning::safety::{SafetyCheck, STOP_DISTANCE};
use crate::mission_planning::state_machine::{
    EngineStatus, StateTransition, Tick, BLOCKED_EXIT, COMPLETED_EXIT,
};
use crate::path_planning::line_of_sight;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecureConfig {
    /// Clearance from the obstacle and from the prohibited cells [m]
    pub safe_distance: f64,
    /// Arrival distance at the safe location [m]
    pub distance: f64,
    /// Minimum distance of a candidate safe location [m]
    pub min_safe_distance: f64,
    pub likelihood_threshold: f64,
    pub speed: f64,
    /// Maximum sensor misalignment to trust an echo [deg]
    pub sensor_tolerance_deg: i32,
    /// Maximum heading error of the rotation [deg]
    pub rotation_tolerance_deg: i32,
    pub timeout_ms: Option<u64>,
}

impl Default for SecureConfig {
    fn default() -> Self {
        SecureConfig {
            safe_distance: 1.5 * STOP_DISTANCE,
            distance: STOP_DISTANCE,
            min_safe_distance: STOP_DISTANCE,
            likelihood_threshold: 0.5,
            speed: 1.0,
            sensor_tolerance_deg: 5,
            rotation_tolerance_deg: 5,
            timeout_ms: Some(30000),
        }
    }
}

impl SecureConfig {
    pub fn resolve(name: &str, ctx: &StateMachineContext) -> Self {
        let d = Self::default();
        SecureConfig {
            safe_distance: ctx.state_number(name, "safeDistance", d.safe_distance),
            distance: ctx.state_number(name, "distance", d.distance),
            min_safe_distance: ctx.state_number(name, "minSafeDistance", d.min_safe_distance),
            likelihood_threshold: ctx.state_number(name, "likelihoodThreshold", d.likelihood_threshold),
            speed: ctx.state_number(name, "speed", d.speed),
            sensor_tolerance_deg: ctx
                .state_number(name, "sensorTolerance", d.sensor_tolerance_deg as f64)
                .round() as i32,
            rotation_tolerance_deg: ctx
                .state_number(name, "rotationTolerance", d.rotation_tolerance_deg as f64)
                .round() as i32,
            timeout_ms: ctx.state_timeout(name, d.timeout_ms),
        }
    }
}

/// Sub-phases of [`SecureStatus`]
#[derive(Debug, Clone, PartialEq)]
pub enum SecurePhase {
    /// Back away from the obstacle until out of the prohibited area
    MoveAway,
    /// Turn around to look for a safe location
    Rotate { target_deg: i32 },
    /// Collect the contour cells nearest first
    StartScan,
    /// Point the sensor to each candidate until one is confirmed free
    Scan { candidates: Vec<Point2D>, index: usize },
    /// Drive to the confirmed safe location
    MoveSafe { location: Point2D },
}

/// Brings the robot out of the prohibited area
///
/// Contacts are disengaged first on every tick. Then the robot moves away
/// from the obstacle; if it is still in a prohibited cell it turns around
/// once, scans the contour cells for a free line of sight and drives there.
#[derive(Debug, Clone)]
pub struct SecureStatus {
    name: String,
    config: SecureConfig,
    phase: SecurePhase,
    obstacle: Option<Point2D>,
    rotated: bool,
}

impl SecureStatus {
    pub fn new(name: &str) -> Self {
        SecureStatus {
            name: name.to_string(),
            config: SecureConfig::default(),
            phase: SecurePhase::MoveAway,
            obstacle: None,
            rotated: false,
        }
    }

    pub fn phase(&self) -> &SecurePhase {
        &self.phase
    }

    fn moving(&self, direction_deg: i32, speed: f64, sensor_deg: i32) -> StateTransition {
        StateTransition::stay(RobotCommands::new(
            MotionCommand::moving(direction_deg, speed),
            sensor_deg,
        ))
    }

    fn disengage(&mut self, sample: &RobotSample) -> Option<StateTransition> {
        let speed = if sample.contact_forward {
            self.obstacle = Some(sample.front_contact());
            -self.config.speed
        } else if sample.contact_backward {
            self.obstacle = Some(sample.rear_contact());
            self.config.speed
        } else {
            return None;
        };
        debug!("{}: disengaging contact", self.name);
        self.phase = SecurePhase::MoveAway;
        Some(self.moving(sample.robot_heading_deg, speed, 0))
    }

    fn step(&mut self, sample: &RobotSample, map: &OccupancyMap) -> Option<StateTransition> {
        match mem::replace(&mut self.phase, SecurePhase::MoveAway) {
            SecurePhase::MoveAway => self.move_away(sample, map),
            SecurePhase::Rotate { target_deg } => self.rotate(sample, target_deg),
            SecurePhase::StartScan => {
                let robot = sample.robot_location;
                let mut candidates: Vec<Point2D> =
                    map.contours().iter().map(|c| map.to_point(c)).collect();
                candidates.sort_by_key(|p| OrderedFloat(p.distance_sq(&robot)));
                debug!("{}: scanning {} candidates", self.name, candidates.len());
                self.phase = SecurePhase::Scan {
                    candidates,
                    index: 0,
                };
                None
            }
            SecurePhase::Scan { candidates, index } => self.scan(sample, map, candidates, index),
            SecurePhase::MoveSafe { location } => {
                if sample.robot_distance(&location) <= self.config.distance {
                    debug!("{}: safe location reached {:?}", self.name, location);
                    return Some(StateTransition::halt(COMPLETED_EXIT));
                }
                self.phase = SecurePhase::MoveSafe { location };
                Some(self.moving(
                    sample.robot_deg(&location),
                    self.config.speed,
                    sample.robot_relative_deg(&location),
                ))
            }
        }
    }

    fn move_away(&mut self, sample: &RobotSample, map: &OccupancyMap) -> Option<StateTransition> {
        self.phase = SecurePhase::MoveAway;
        if let Some(obstacle) = self.obstacle {
            let obstacle_deg = sample.robot_deg(&obstacle);
            let relative_deg = sample.robot_relative_deg(&obstacle);
            if sample.robot_distance(&obstacle) <= self.config.safe_distance {
                return Some(self.moving(obstacle_deg, -self.config.speed, relative_deg));
            }
            if relative_deg.abs() <= 90 {
                // verify the obstacle is gone with the sensor
                let misaligned =
                    sample.sensor_relative_deg_to(&obstacle).abs() > self.config.sensor_tolerance_deg;
                let near_echo = sample.has_echo() && sample.echo_distance <= self.config.safe_distance;
                if misaligned || near_echo {
                    if let Some(echo) = sample.echo_location() {
                        self.obstacle = Some(echo);
                    }
                    return Some(self.moving(obstacle_deg, -self.config.speed, relative_deg));
                }
            }
        }
        if !map.is_prohibited(&sample.robot_location) {
            debug!("{}: safe location reached {:?}", self.name, sample.robot_location);
            return Some(StateTransition::halt(COMPLETED_EXIT));
        }
        self.phase = SecurePhase::Rotate {
            target_deg: normalize_deg_i32(sample.robot_heading_deg + 180),
        };
        None
    }

    fn rotate(&mut self, sample: &RobotSample, target_deg: i32) -> Option<StateTransition> {
        if self.rotated {
            warn!("{}: no safe location found", self.name);
            return Some(StateTransition::halt(BLOCKED_EXIT));
        }
        let error = normalize_deg_i32(sample.robot_heading_deg - target_deg);
        if error.abs() > self.config.rotation_tolerance_deg {
            self.phase = SecurePhase::Rotate { target_deg };
            return Some(self.moving(target_deg, 0.0, 0));
        }
        debug!("{}: rotated to {} deg", self.name, sample.robot_heading_deg);
        self.rotated = true;
        self.phase = SecurePhase::StartScan;
        None
    }

    fn scan(
        &mut self,
        sample: &RobotSample,
        map: &OccupancyMap,
        candidates: Vec<Point2D>,
        index: usize,
    ) -> Option<StateTransition> {
        let Some(target) = candidates.get(index).copied() else {
            warn!("{}: no safe location found", self.name);
            return Some(StateTransition::halt(BLOCKED_EXIT));
        };
        let relative_deg = sample.robot_relative_deg(&target);
        let distance = sample.robot_distance(&target);
        if relative_deg.abs() <= 90 && distance > self.config.min_safe_distance {
            if sample.sensor_relative_deg_to(&target).abs() > self.config.sensor_tolerance_deg {
                self.phase = SecurePhase::Scan { candidates, index };
                return Some(StateTransition::stay(RobotCommands::new(
                    MotionCommand::Halt,
                    relative_deg,
                )));
            }
            let echo_free = !sample.has_echo() || sample.echo_distance > distance;
            let threshold = map.likelihood_threshold();
            let visible = line_of_sight(&sample.robot_location, &target, map.grid_size(), |c| {
                map.obstacle_at(&map.to_point(c))
                    .map_or(false, |o| o.likelihood >= threshold)
            });
            if echo_free && visible {
                debug!("{}: safe location found {:?}", self.name, target);
                self.phase = SecurePhase::MoveSafe { location: target };
                return None;
            }
        }
        self.phase = SecurePhase::Scan {
            candidates,
            index: index + 1,
        };
        None
    }
}

impl EngineStatus for SecureStatus {
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self, ctx: &mut StateMachineContext, now_ms: u64) {
        self.config = SecureConfig::resolve(&self.name, ctx);
        ctx.enter(&self.name, now_ms, self.config.timeout_ms);
        self.obstacle = ctx.obstacle();
        self.phase = SecurePhase::MoveAway;
        self.rotated = false;
    }

    fn process(&mut self, tick: &Tick<'_>, ctx: &mut StateMachineContext) -> StateTransition {
        let map = tick
            .map
            .with_safety(self.config.safe_distance, self.config.likelihood_threshold);
        let tx = loop {
            if let Some(tx) = self.disengage(tick.sample) {
                break tx;
            }
            if let Some(tx) = self.step(tick.sample, &map) {
                break tx;
            }
        };
        if let Some(obstacle) = self.obstacle {
            ctx.set_obstacle(obstacle);
        }
        tx
    }

    fn safety_check(&self) -> SafetyCheck {
        SafetyCheck::disengaging()
    }
}
