use log::debug;
use serde::{Deserialize, Serialize};

use crate::common::{MotionCommand, RobotCommands};
use crate::mission_planning::context::StateMachineContext;
use crate::mission_planning::safety::{SafetyCheck, STOP_DISTANCE};
use crate::mission_planning::state_machine::{
    EngineStatus, StateTransition, Tick, COMPLETED_EXIT, OBSTACLE_EXIT,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidObstacleConfig {
    /// Minimum free echo distance to complete [m]
    pub distance: f64,
    /// Minimum distance from the obstacle to complete [m]
    pub safe_distance: f64,
    /// Minimum time spent moving away [ms]
    pub min_avoid_time_ms: u64,
    pub speed: f64,
    pub timeout_ms: Option<u64>,
}

impl Default for AvoidObstacleConfig {
    fn default() -> Self {
        AvoidObstacleConfig {
            distance: STOP_DISTANCE,
            safe_distance: 1.5 * STOP_DISTANCE,
            min_avoid_time_ms: 500,
            speed: 1.0,
            timeout_ms: Some(5000),
        }
    }
}

impl AvoidObstacleConfig {
    pub fn resolve(name: &str, ctx: &StateMachineContext) -> Self {
        let d = Self::default();
        AvoidObstacleConfig {
            distance: ctx.state_number(name, "distance", d.distance),
            safe_distance: ctx.state_number(name, "safeDistance", d.safe_distance),
            min_avoid_time_ms: ctx.state_millis(name, "minAvoidTime", d.min_avoid_time_ms),
            speed: ctx.state_number(name, "speed", d.speed),
            timeout_ms: ctx.state_timeout(name, d.timeout_ms),
        }
    }
}

/// Moves away from the context obstacle
///
/// The robot backs off an obstacle ahead and drives forward away from an
/// obstacle behind, keeping the sensor on the obstacle.
#[derive(Debug, Clone)]
pub struct AvoidObstacleStatus {
    name: String,
    config: AvoidObstacleConfig,
}

impl AvoidObstacleStatus {
    pub fn new(name: &str) -> Self {
        AvoidObstacleStatus {
            name: name.to_string(),
            config: AvoidObstacleConfig::default(),
        }
    }
}

impl EngineStatus for AvoidObstacleStatus {
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self, ctx: &mut StateMachineContext, now_ms: u64) {
        self.config = AvoidObstacleConfig::resolve(&self.name, ctx);
        ctx.enter(&self.name, now_ms, self.config.timeout_ms);
        debug!("{}: avoid {:?}", self.name, ctx.obstacle());
    }

    fn process(&mut self, tick: &Tick<'_>, ctx: &mut StateMachineContext) -> StateTransition {
        let sample = tick.sample;
        let obstacle = ctx.obstacle();
        let obstacle_deg = obstacle.map(|o| sample.robot_relative_deg(&o));
        let backward = obstacle_deg.map_or(true, |deg| deg.abs() <= 90);

        // contact on the escape side
        if backward && sample.contact_backward {
            ctx.set_obstacle(sample.rear_contact());
            return StateTransition::halt(OBSTACLE_EXIT);
        }
        if !backward && sample.contact_forward {
            ctx.set_obstacle(sample.front_contact());
            return StateTransition::halt(OBSTACLE_EXIT);
        }

        let elapsed = ctx.elapsed(tick.now()).unwrap_or(0);
        if elapsed >= self.config.min_avoid_time_ms {
            let contact_released = if backward {
                !sample.contact_forward
            } else {
                !sample.contact_backward
            };
            let echo_clear = !sample.has_echo() || sample.echo_distance > self.config.distance;
            let far = obstacle.map_or(true, |o| sample.robot_distance(&o) > self.config.safe_distance);
            if contact_released && echo_clear && far {
                debug!("{}: obstacle avoided", self.name);
                return StateTransition::halt(COMPLETED_EXIT);
            }
        }

        let sensor = obstacle_deg
            .filter(|deg| deg.abs() <= 90)
            .unwrap_or(sample.sensor_relative_deg);
        let speed = if backward { -self.config.speed } else { self.config.speed };
        StateTransition::stay(RobotCommands::new(
            MotionCommand::moving(sample.robot_heading_deg, speed),
            sensor,
        ))
    }

    fn safety_check(&self) -> SafetyCheck {
        SafetyCheck::disengaging()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Point2D, RobotSample};
    use crate::mapping::{OccupancyMap, OccupancyMapConfig};

    fn setup(obstacle: Point2D) -> (AvoidObstacleStatus, StateMachineContext, OccupancyMap) {
        let mut ctx = StateMachineContext::new();
        ctx.set_obstacle(obstacle);
        let mut avoid = AvoidObstacleStatus::new("avoid");
        avoid.activate(&mut ctx, 0);
        (avoid, ctx, OccupancyMap::new(OccupancyMapConfig::default()).unwrap())
    }

    fn motion(tx: &StateTransition) -> (i32, f64) {
        match tx.commands.motion {
            MotionCommand::Move { direction_deg, speed } => (direction_deg, speed),
            MotionCommand::Halt => panic!("robot should move"),
        }
    }

    #[test]
    fn test_backs_off_front_obstacle() {
        let (mut avoid, mut ctx, map) = setup(Point2D::new(0.15, 0.0));
        let sample = RobotSample::new(100, Point2D::origin(), 0).with_contacts(true, false);
        let tx = avoid.process(&Tick::new(&sample, &map), &mut ctx);
        assert!(tx.is_stay());
        assert_eq!(motion(&tx), (0, -1.0));
        assert_eq!(tx.commands.sensor_deg, 0);
    }

    #[test]
    fn test_moves_forward_from_rear_obstacle() {
        let (mut avoid, mut ctx, map) = setup(Point2D::new(-0.15, 0.0));
        let sample = RobotSample::new(100, Point2D::origin(), 0).with_contacts(false, true);
        let tx = avoid.process(&Tick::new(&sample, &map), &mut ctx);
        assert!(tx.is_stay());
        assert_eq!(motion(&tx), (0, 1.0));
    }

    #[test]
    fn test_dwell_time() {
        let (mut avoid, mut ctx, map) = setup(Point2D::new(0.15, 0.0));
        // already far but the minimum avoid time has not elapsed
        let sample = RobotSample::new(400, Point2D::new(-0.5, 0.0), 0);
        let tx = avoid.process(&Tick::new(&sample, &map), &mut ctx);
        assert!(tx.is_stay());

        let sample = RobotSample::new(600, Point2D::new(-0.5, 0.0), 0);
        let tx = avoid.process(&Tick::new(&sample, &map), &mut ctx);
        assert_eq!(tx.exit, COMPLETED_EXIT);
    }

    #[test]
    fn test_still_near() {
        let (mut avoid, mut ctx, map) = setup(Point2D::new(0.15, 0.0));
        let sample = RobotSample::new(600, Point2D::new(-0.1, 0.0), 0);
        let tx = avoid.process(&Tick::new(&sample, &map), &mut ctx);
        assert!(tx.is_stay());
    }

    #[test]
    fn test_contact_on_escape_side() {
        let (mut avoid, mut ctx, map) = setup(Point2D::new(0.15, 0.0));
        let sample = RobotSample::new(100, Point2D::origin(), 0).with_contacts(false, true);
        let tx = avoid.process(&Tick::new(&sample, &map), &mut ctx);
        assert_eq!(tx.exit, OBSTACLE_EXIT);
        assert_eq!(ctx.obstacle(), Some(sample.rear_contact()));
    }
}
