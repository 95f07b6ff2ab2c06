//! wheelly_brain - navigation core of a small wheeled robot
//!
//! This crate fuses proximity echoes into an occupancy grid, finds safe
//! paths on it, and drives the robot with a behavior state machine.

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod mapping;
pub mod path_planning;
pub mod mission_planning;

// Re-export common types for convenience
pub use common::{GridCell, MotionCommand, Path2D, Point2D, RobotCommands, RobotSample};
pub use common::{GridPathPlanner, PathOptimizer};
pub use common::{BrainError, BrainResult};
pub use mapping::{OccupancyMap, OccupancyMapConfig};
pub use mission_planning::{StateMachineBuilder, StateMachineEngine};
