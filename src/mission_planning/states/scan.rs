use log::debug;
use serde::{Deserialize, Serialize};

use crate::common::{MotionCommand, RobotCommands};
use crate::mission_planning::context::StateMachineContext;
use crate::mission_planning::state_machine::{EngineStatus, StateTransition, Tick, COMPLETED_EXIT};

/// Sensor directions of a full sweep [deg]
pub const SCAN_DIRECTIONS: [i32; 9] = [-30, -60, -90, -45, 30, 60, 90, 45, 0];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Time spent on each direction [ms]
    pub interval_ms: u64,
    pub timeout_ms: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            interval_ms: 100,
            timeout_ms: None,
        }
    }
}

impl ScanConfig {
    pub fn resolve(name: &str, ctx: &StateMachineContext) -> Self {
        let d = Self::default();
        ScanConfig {
            interval_ms: ctx.state_millis(name, "interval", d.interval_ms).max(1),
            timeout_ms: ctx.state_timeout(name, d.timeout_ms),
        }
    }
}

/// Holds the robot and sweeps the sensor through [`SCAN_DIRECTIONS`]
///
/// Clears the context obstacle when the sweep completes.
#[derive(Debug, Clone)]
pub struct ScanStatus {
    name: String,
    config: ScanConfig,
}

impl ScanStatus {
    pub fn new(name: &str) -> Self {
        ScanStatus {
            name: name.to_string(),
            config: ScanConfig::default(),
        }
    }
}

impl EngineStatus for ScanStatus {
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self, ctx: &mut StateMachineContext, now_ms: u64) {
        self.config = ScanConfig::resolve(&self.name, ctx);
        ctx.enter(&self.name, now_ms, self.config.timeout_ms);
    }

    fn process(&mut self, tick: &Tick<'_>, ctx: &mut StateMachineContext) -> StateTransition {
        let elapsed = ctx.elapsed(tick.now()).unwrap_or(0);
        let index = (elapsed / self.config.interval_ms) as usize;
        match SCAN_DIRECTIONS.get(index) {
            Some(&direction) => StateTransition::stay(RobotCommands::new(
                MotionCommand::Halt,
                direction,
            )),
            None => {
                debug!("{}: scan completed", self.name);
                ctx.clear_obstacle();
                StateTransition::halt(COMPLETED_EXIT)
            }
        }
    }
}
