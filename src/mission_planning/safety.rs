//! Safety checks run before the logic of every state

use crate::common::{MotionCommand, RobotCommands, RobotSample};
use crate::mission_planning::context::StateMachineContext;
use crate::mission_planning::state_machine::{
    StateTransition, BLOCKED_EXIT, OBSTACLE_EXIT, TIMEOUT_EXIT,
};

/// Echo distance below which the robot must stop [m]
pub const STOP_DISTANCE: f64 = 0.2;

/// Which checks a state runs, in priority order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyCheck {
    /// Both contacts tripped → `Blocked`
    pub blocked: bool,
    /// Front contact tripped → `Obstacle`
    pub front_contact: bool,
    /// Rear contact tripped → `Obstacle`
    pub rear_contact: bool,
    /// Echo nearer than the distance → `Obstacle`
    pub stop_distance: Option<f64>,
    /// State timeout expired → `Timeout`
    pub timeout: bool,
}

impl SafetyCheck {
    /// All the checks
    pub fn standard() -> Self {
        SafetyCheck {
            blocked: true,
            front_contact: true,
            rear_contact: true,
            stop_distance: Some(STOP_DISTANCE),
            timeout: true,
        }
    }

    /// Checks for states that handle contacts and near echoes themselves
    pub fn disengaging() -> Self {
        SafetyCheck {
            blocked: true,
            front_contact: false,
            rear_contact: false,
            stop_distance: None,
            timeout: true,
        }
    }

    pub fn timeout_only() -> Self {
        SafetyCheck {
            timeout: true,
            ..Self::none()
        }
    }

    pub fn none() -> Self {
        SafetyCheck {
            blocked: false,
            front_contact: false,
            rear_contact: false,
            stop_distance: None,
            timeout: false,
        }
    }
}

/// Runs the enabled checks
///
/// Returns the transition of the first failed check, recording the obstacle
/// location in the context for contacts and near echoes.
pub fn safety_check(
    check: &SafetyCheck,
    sample: &RobotSample,
    ctx: &mut StateMachineContext,
) -> Option<StateTransition> {
    if check.blocked && sample.is_blocked() {
        return Some(StateTransition::halt(BLOCKED_EXIT));
    }
    let hold_sensor = RobotCommands::new(MotionCommand::Halt, sample.sensor_relative_deg);
    if check.front_contact && sample.contact_forward {
        ctx.set_obstacle(sample.front_contact());
        return Some(StateTransition::new(OBSTACLE_EXIT, hold_sensor));
    }
    if check.rear_contact && sample.contact_backward {
        ctx.set_obstacle(sample.rear_contact());
        return Some(StateTransition::new(OBSTACLE_EXIT, hold_sensor));
    }
    if let (Some(stop_distance), Some(echo)) = (check.stop_distance, sample.echo_location()) {
        if sample.echo_distance < stop_distance {
            ctx.set_obstacle(echo);
            return Some(StateTransition::new(OBSTACLE_EXIT, hold_sensor));
        }
    }
    if check.timeout && ctx.is_timer_expired(sample.timestamp) {
        return Some(StateTransition::halt(TIMEOUT_EXIT));
    }
    None
}
