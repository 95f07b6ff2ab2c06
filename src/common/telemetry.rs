//! Robot telemetry sample and the motion commands sent back to the robot

use crate::common::types::{normalize_deg, Point2D};

/// Distance of the contact switches from the robot center [m]
pub const ROBOT_RADIUS: f64 = 0.15;

/// Maximum absolute sensor servo angle [deg]
pub const MAX_SENSOR_DEG: i32 = 90;

/// One telemetry sample produced by the transport layer every control tick
#[derive(Debug, Clone, PartialEq)]
pub struct RobotSample {
    /// Sample instant [ms]
    pub timestamp: u64,
    /// Robot location [m]
    pub robot_location: Point2D,
    /// Robot heading [deg], 0 along +x, counter-clockwise positive
    pub robot_heading_deg: i32,
    /// Sensor direction relative to the robot heading [deg]
    pub sensor_relative_deg: i32,
    /// Echo distance [m], 0 means no echo
    pub echo_distance: f64,
    /// Front contact switch tripped
    pub contact_forward: bool,
    /// Rear contact switch tripped
    pub contact_backward: bool,
}

impl RobotSample {
    pub fn new(timestamp: u64, robot_location: Point2D, robot_heading_deg: i32) -> Self {
        Self {
            timestamp,
            robot_location,
            robot_heading_deg,
            sensor_relative_deg: 0,
            echo_distance: 0.0,
            contact_forward: false,
            contact_backward: false,
        }
    }

    pub fn with_sensor(mut self, sensor_relative_deg: i32, echo_distance: f64) -> Self {
        self.sensor_relative_deg = sensor_relative_deg;
        self.echo_distance = echo_distance;
        self
    }

    pub fn with_contacts(mut self, forward: bool, backward: bool) -> Self {
        self.contact_forward = forward;
        self.contact_backward = backward;
        self
    }

    /// Robot is stuck between front and rear contacts
    pub fn is_blocked(&self) -> bool {
        self.contact_forward && self.contact_backward
    }

    pub fn has_echo(&self) -> bool {
        self.echo_distance > 0.0
    }

    /// Absolute sensor direction [deg]
    pub fn sensor_deg(&self) -> f64 {
        normalize_deg((self.robot_heading_deg + self.sensor_relative_deg) as f64)
    }

    /// Location of the echo, if any
    pub fn echo_location(&self) -> Option<Point2D> {
        if self.has_echo() {
            Some(self.robot_location.project(self.sensor_deg(), self.echo_distance))
        } else {
            None
        }
    }

    pub fn front_contact(&self) -> Point2D {
        self.robot_location.project(self.robot_heading_deg as f64, ROBOT_RADIUS)
    }

    pub fn rear_contact(&self) -> Point2D {
        self.robot_location.project(self.robot_heading_deg as f64 + 180.0, ROBOT_RADIUS)
    }

    pub fn robot_distance(&self, location: &Point2D) -> f64 {
        self.robot_location.distance(location)
    }

    /// Absolute direction from the robot to the location [deg]
    pub fn robot_deg(&self, location: &Point2D) -> i32 {
        self.robot_location.bearing_deg(location).round() as i32
    }

    /// Direction of the location relative to the robot heading [deg]
    pub fn robot_relative_deg(&self, location: &Point2D) -> i32 {
        normalize_deg(self.robot_location.bearing_deg(location) - self.robot_heading_deg as f64)
            .round() as i32
    }

    /// Direction of the location relative to the sensor direction [deg]
    pub fn sensor_relative_deg_to(&self, location: &Point2D) -> i32 {
        normalize_deg(self.robot_location.bearing_deg(location) - self.sensor_deg()).round() as i32
    }
}

/// Motion command for the wheels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionCommand {
    Halt,
    /// Move toward `direction_deg` (absolute) at `speed` in [-1, 1]
    Move { direction_deg: i32, speed: f64 },
}

impl MotionCommand {
    pub fn moving(direction_deg: i32, speed: f64) -> Self {
        MotionCommand::Move {
            direction_deg: crate::common::types::normalize_deg_i32(direction_deg),
            speed: speed.clamp(-1.0, 1.0),
        }
    }

    pub fn is_halt(&self) -> bool {
        matches!(self, MotionCommand::Halt)
    }
}

/// Commands emitted each tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotCommands {
    pub motion: MotionCommand,
    /// Sensor servo angle [deg] in [-90, 90]
    pub sensor_deg: i32,
}

impl RobotCommands {
    pub fn new(motion: MotionCommand, sensor_deg: i32) -> Self {
        Self {
            motion,
            sensor_deg: sensor_deg.clamp(-MAX_SENSOR_DEG, MAX_SENSOR_DEG),
        }
    }

    pub fn halt() -> Self {
        Self::new(MotionCommand::Halt, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_location() {
        let sample = RobotSample::new(0, Point2D::new(1.0, 1.0), 90).with_sensor(-90, 2.0);
        let echo = sample.echo_location().unwrap();
        assert!((echo.x - 3.0).abs() < 1e-9);
        assert!((echo.y - 1.0).abs() < 1e-9);

        let sample = sample.with_sensor(0, 0.0);
        assert!(sample.echo_location().is_none());
    }

    #[test]
    fn test_relative_directions() {
        let sample = RobotSample::new(0, Point2D::origin(), 90).with_sensor(30, 0.0);
        let target = Point2D::new(1.0, 0.0);
        assert_eq!(sample.robot_deg(&target), 0);
        assert_eq!(sample.robot_relative_deg(&target), -90);
        assert_eq!(sample.sensor_relative_deg_to(&target), -120);
    }

    #[test]
    fn test_contacts() {
        let sample = RobotSample::new(0, Point2D::origin(), 0).with_contacts(true, false);
        assert!(!sample.is_blocked());
        assert!((sample.front_contact().x - ROBOT_RADIUS).abs() < 1e-9);
        assert!((sample.rear_contact().x + ROBOT_RADIUS).abs() < 1e-9);
        assert!(sample.with_contacts(true, true).is_blocked());
    }

    #[test]
    fn test_commands_are_clamped() {
        let cmd = RobotCommands::new(MotionCommand::moving(270, 2.0), 120);
        assert_eq!(cmd.sensor_deg, 90);
        assert_eq!(cmd.motion, MotionCommand::Move { direction_deg: -90, speed: 1.0 });
    }
}
