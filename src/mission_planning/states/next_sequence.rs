use log::debug;

use crate::mission_planning::context::StateMachineContext;
use crate::mission_planning::state_machine::{
    EngineStatus, StateTransition, Tick, COMPLETED_EXIT, TARGET_SELECTED_EXIT,
};

/// Moves the target to the next waypoint of the context path
///
/// Exits `TargetSelected` with the waypoint as target, or `Completed`
/// when the path is exhausted.
#[derive(Debug, Clone)]
pub struct NextSequenceStatus {
    name: String,
}

impl NextSequenceStatus {
    pub fn new(name: &str) -> Self {
        NextSequenceStatus {
            name: name.to_string(),
        }
    }
}

impl EngineStatus for NextSequenceStatus {
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self, ctx: &mut StateMachineContext, now_ms: u64) {
        let timeout = ctx.state_timeout(&self.name, None);
        ctx.enter(&self.name, now_ms, timeout);
    }

    fn process(&mut self, _tick: &Tick<'_>, ctx: &mut StateMachineContext) -> StateTransition {
        match ctx.next_waypoint() {
            Some(waypoint) => {
                debug!("{}: waypoint {} {:?}", self.name, ctx.path_index(), waypoint);
                ctx.set_target(waypoint);
                StateTransition::halt(TARGET_SELECTED_EXIT)
            }
            None => {
                debug!("{}: sequence completed", self.name);
                StateTransition::halt(COMPLETED_EXIT)
            }
        }
    }
}
