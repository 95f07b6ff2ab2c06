use serde::{Deserialize, Serialize};

use crate::common::RobotCommands;
use crate::mission_planning::context::StateMachineContext;
use crate::mission_planning::safety::SafetyCheck;
use crate::mission_planning::state_machine::{EngineStatus, StateTransition, Tick, END_STATUS};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HaltConfig {
    pub timeout_ms: Option<u64>,
}

impl HaltConfig {
    pub fn resolve(name: &str, ctx: &StateMachineContext) -> Self {
        HaltConfig {
            timeout_ms: ctx.state_timeout(name, Self::default().timeout_ms),
        }
    }
}

/// Keeps the robot still until the timeout expires
///
/// The terminal `End` state is a halt state that never times out and runs
/// no safety check.
#[derive(Debug, Clone)]
pub struct HaltStatus {
    name: String,
    terminal: bool,
    config: HaltConfig,
}

impl HaltStatus {
    pub fn new(name: &str) -> Self {
        HaltStatus {
            name: name.to_string(),
            terminal: false,
            config: HaltConfig::default(),
        }
    }

    pub fn end() -> Self {
        HaltStatus {
            name: END_STATUS.to_string(),
            terminal: true,
            config: HaltConfig::default(),
        }
    }
}

impl EngineStatus for HaltStatus {
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self, ctx: &mut StateMachineContext, now_ms: u64) {
        self.config = if self.terminal {
            HaltConfig::default()
        } else {
            HaltConfig::resolve(&self.name, ctx)
        };
        ctx.enter(&self.name, now_ms, self.config.timeout_ms);
    }

    fn process(&mut self, _tick: &Tick<'_>, _ctx: &mut StateMachineContext) -> StateTransition {
        StateTransition::stay(RobotCommands::halt())
    }

    fn safety_check(&self) -> SafetyCheck {
        if self.terminal {
            SafetyCheck::none()
        } else {
            SafetyCheck::timeout_only()
        }
    }
}
