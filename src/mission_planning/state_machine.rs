/*!
 * Table driven state machine for robot behaviors
 *
 * Every control tick the engine runs the safety check of the active state
 * and, if it passes, the state logic. The state answers with an exit code
 * and the robot commands for the tick. `"Stay"` keeps the active state;
 * any other exit code is looked up in the transition table to select the
 * next state. A missing entry moves the machine to the terminal `"End"`
 * state, which halts the robot forever.
 */

use std::collections::HashMap;

use log::{info, warn};

use crate::common::{BrainError, BrainResult, Point2D, RobotCommands, RobotSample};
use crate::mapping::OccupancyMap;
use crate::mission_planning::context::{ContextValue, StateMachineContext};
use crate::mission_planning::safety::{safety_check, SafetyCheck};
use crate::mission_planning::states::HaltStatus;
use crate::mission_planning::transforms::ContextTransform;

pub const STAY_EXIT: &str = "Stay";
pub const COMPLETED_EXIT: &str = "Completed";
pub const TIMEOUT_EXIT: &str = "Timeout";
pub const BLOCKED_EXIT: &str = "Blocked";
pub const OBSTACLE_EXIT: &str = "Obstacle";
pub const UNREACHABLE_EXIT: &str = "Unreachable";
pub const NO_PATH_EXIT: &str = "NoPath";
pub const TARGET_REACHED_EXIT: &str = "TargetReached";
pub const NOT_FOUND_EXIT: &str = "NotFound";
pub const TARGET_SELECTED_EXIT: &str = "TargetSelected";

/// Name of the terminal state
pub const END_STATUS: &str = "End";

/// Result of one state tick
#[derive(Debug, Clone, PartialEq)]
pub struct StateTransition {
    pub exit: String,
    pub commands: RobotCommands,
}

impl StateTransition {
    pub fn new(exit: &str, commands: RobotCommands) -> Self {
        StateTransition {
            exit: exit.to_string(),
            commands,
        }
    }

    pub fn stay(commands: RobotCommands) -> Self {
        Self::new(STAY_EXIT, commands)
    }

    /// Exit halting the robot with the sensor ahead
    pub fn halt(exit: &str) -> Self {
        Self::new(exit, RobotCommands::halt())
    }

    pub fn is_stay(&self) -> bool {
        self.exit == STAY_EXIT
    }
}

/// Inputs of a control tick
#[derive(Debug, Clone, Copy)]
pub struct Tick<'a> {
    pub sample: &'a RobotSample,
    pub map: &'a OccupancyMap,
}

impl<'a> Tick<'a> {
    pub fn new(sample: &'a RobotSample, map: &'a OccupancyMap) -> Self {
        Tick { sample, map }
    }

    /// Tick instant [ms]
    pub fn now(&self) -> u64 {
        self.sample.timestamp
    }
}

/// A behavior of the state machine
///
/// Working fields of a state are reset by `activate`; a state is owned by
/// one engine only.
pub trait EngineStatus: Send {
    fn name(&self) -> &str;

    /// Called each time the state becomes active
    fn activate(&mut self, ctx: &mut StateMachineContext, now_ms: u64);

    /// State specific logic, run after the safety check has passed
    fn process(&mut self, tick: &Tick<'_>, ctx: &mut StateMachineContext) -> StateTransition;

    /// Checks run before `process` on every tick
    fn safety_check(&self) -> SafetyCheck {
        SafetyCheck::standard()
    }
}

struct TransitionEntry {
    to: String,
    transform: ContextTransform,
}

/// Builds a validated [`StateMachineEngine`]
///
/// The terminal `"End"` state is always registered.
pub struct StateMachineBuilder {
    states: Vec<Box<dyn EngineStatus>>,
    transitions: HashMap<(String, String), TransitionEntry>,
    context: StateMachineContext,
}

impl StateMachineBuilder {
    pub fn new() -> Self {
        StateMachineBuilder {
            states: vec![Box::new(HaltStatus::end())],
            transitions: HashMap::new(),
            context: StateMachineContext::new(),
        }
    }

    fn contains_state(&self, name: &str) -> bool {
        self.states.iter().any(|s| s.name() == name)
    }

    pub fn add_state<S>(mut self, state: S) -> BrainResult<Self>
    where
        S: EngineStatus + 'static,
    {
        if self.contains_state(state.name()) {
            return Err(BrainError::DuplicateState(state.name().to_string()));
        }
        self.states.push(Box::new(state));
        Ok(self)
    }

    pub fn add_transition<F>(mut self, from: &str, exit: &str, to: &str, transform: F) -> BrainResult<Self>
    where
        F: Fn(&mut StateMachineContext) + Send + 'static,
    {
        if exit == STAY_EXIT {
            return Err(BrainError::ReservedExitCode(exit.to_string()));
        }
        for name in [from, to] {
            if !self.contains_state(name) {
                return Err(BrainError::UndefinedState(name.to_string()));
            }
        }
        let key = (from.to_string(), exit.to_string());
        if self.transitions.contains_key(&key) {
            return Err(BrainError::DuplicateTransition(from.to_string(), exit.to_string()));
        }
        self.transitions.insert(
            key,
            TransitionEntry {
                to: to.to_string(),
                transform: Box::new(transform),
            },
        );
        Ok(self)
    }

    /// Seeds a parameter of the initial context
    pub fn set_param(mut self, key: &str, value: impl Into<ContextValue>) -> Self {
        self.context.set_param(key, value);
        self
    }

    /// Seeds the target of the initial context
    pub fn set_target(mut self, target: Point2D) -> Self {
        self.context.set_target(target);
        self
    }

    /// Seeds the waypoints of the initial context
    pub fn set_path(mut self, path: Vec<Point2D>) -> Self {
        self.context.set_path(path);
        self
    }

    pub fn build(self, initial_status: &str) -> BrainResult<StateMachineEngine> {
        if !self.contains_state(initial_status) {
            return Err(BrainError::UndefinedState(initial_status.to_string()));
        }
        let states = self
            .states
            .into_iter()
            .map(|s| (s.name().to_string(), s))
            .collect();
        Ok(StateMachineEngine {
            states,
            transitions: self.transitions,
            current: initial_status.to_string(),
            activated: false,
            context: self.context,
            transition_history: Vec::new(),
        })
    }
}

impl Default for StateMachineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the behaviors one control tick at a time
///
/// The initial state is activated by the first tick. Ticks must be
/// delivered sequentially; wrap the engine in a mutex to share it.
pub struct StateMachineEngine {
    states: HashMap<String, Box<dyn EngineStatus>>,
    transitions: HashMap<(String, String), TransitionEntry>,
    current: String,
    activated: bool,
    context: StateMachineContext,
    transition_history: Vec<(String, String, String)>, // (from, exit, to)
}

impl StateMachineEngine {
    /// Name of the active state
    pub fn status_name(&self) -> &str {
        &self.current
    }

    pub fn context(&self) -> &StateMachineContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut StateMachineContext {
        &mut self.context
    }

    pub fn transition_history(&self) -> &[(String, String, String)] {
        &self.transition_history
    }

    pub fn is_ended(&self) -> bool {
        self.current == END_STATUS
    }

    /// Processes a telemetry sample and the current map
    pub fn process(&mut self, sample: &RobotSample, map: &OccupancyMap) -> RobotCommands {
        let now = sample.timestamp;
        if !self.activated {
            self.activate(now);
        }
        let tick = Tick::new(sample, map);
        let Some(state) = self.states.get_mut(&self.current) else {
            warn!("State {} not registered", self.current);
            return RobotCommands::halt();
        };
        let result = safety_check(&state.safety_check(), sample, &mut self.context)
            .unwrap_or_else(|| state.process(&tick, &mut self.context));

        if !result.is_stay() {
            self.transit(&result.exit, now);
        }
        result.commands
    }

    fn transit(&mut self, exit: &str, now: u64) {
        let key = (self.current.clone(), exit.to_string());
        let next = match self.transitions.get(&key) {
            Some(entry) => {
                (entry.transform)(&mut self.context);
                info!("Transition ({}, {}) -> {}", self.current, exit, entry.to);
                entry.to.clone()
            }
            None => {
                warn!("Missing transition ({}, {})", self.current, exit);
                info!("Transition ({}, {}) -> {}", self.current, exit, END_STATUS);
                END_STATUS.to_string()
            }
        };
        self.transition_history
            .push((self.current.clone(), exit.to_string(), next.clone()));
        self.current = next;
        self.activate(now);
    }

    fn activate(&mut self, now: u64) {
        self.activated = true;
        if let Some(state) = self.states.get_mut(&self.current) {
            info!("Activate {}", self.current);
            state.activate(&mut self.context, now);
        }
    }

    /// Text dump of the states and of the transition table
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Current State: {}", self.current));
        lines.push("".to_string());

        let mut names: Vec<&String> = self.states.keys().collect();
        names.sort();
        lines.push("States:".to_string());
        for name in names {
            let marker = if *name == self.current { " [CURRENT]" } else { "" };
            lines.push(format!("  - {}{}", name, marker));
        }
        lines.push("".to_string());

        let mut keys: Vec<&(String, String)> = self.transitions.keys().collect();
        keys.sort();
        lines.push("Transitions:".to_string());
        for key in keys {
            if let Some(entry) = self.transitions.get(key) {
                lines.push(format!("  {} --[{}]--> {}", key.0, key.1, entry.to));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::MotionCommand;
    use crate::mapping::OccupancyMapConfig;
    use crate::mission_planning::transforms::identity;

    /// Emits a scripted exit code sequence and counts activations
    struct Scripted {
        name: String,
        exits: Vec<&'static str>,
        tick: usize,
        activations: usize,
    }

    impl Scripted {
        fn new(name: &str, exits: Vec<&'static str>) -> Self {
            Scripted {
                name: name.to_string(),
                exits,
                tick: 0,
                activations: 0,
            }
        }
    }

    impl EngineStatus for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        fn activate(&mut self, ctx: &mut StateMachineContext, now_ms: u64) {
            self.activations += 1;
            self.tick = 0;
            ctx.enter(&self.name, now_ms, ctx.state_timeout(&self.name, None));
            ctx.set_param(&format!("{}.activations", self.name), self.activations as f64);
        }

        fn process(&mut self, _tick: &Tick<'_>, _ctx: &mut StateMachineContext) -> StateTransition {
            let exit = self.exits.get(self.tick).copied().unwrap_or(STAY_EXIT);
            self.tick += 1;
            StateTransition::new(exit, RobotCommands::new(MotionCommand::moving(0, 1.0), 0))
        }

        fn safety_check(&self) -> SafetyCheck {
            SafetyCheck::timeout_only()
        }
    }

    fn map() -> OccupancyMap {
        OccupancyMap::new(OccupancyMapConfig::default()).unwrap()
    }

    fn sample(t: u64) -> RobotSample {
        RobotSample::new(t, Point2D::origin(), 0)
    }

    #[test]
    fn test_builder_errors() {
        let result = StateMachineBuilder::new()
            .add_state(Scripted::new("a", vec![]))
            .and_then(|b| b.add_state(Scripted::new("a", vec![])));
        assert_eq!(result.err(), Some(BrainError::DuplicateState("a".to_string())));

        let result = StateMachineBuilder::new().add_state(Scripted::new(END_STATUS, vec![]));
        assert!(matches!(result, Err(BrainError::DuplicateState(_))));

        let result = StateMachineBuilder::new()
            .add_state(Scripted::new("a", vec![]))
            .and_then(|b| b.add_transition("a", COMPLETED_EXIT, "b", identity()));
        assert_eq!(result.err(), Some(BrainError::UndefinedState("b".to_string())));

        let result = StateMachineBuilder::new()
            .add_state(Scripted::new("a", vec![]))
            .and_then(|b| b.add_transition("a", COMPLETED_EXIT, END_STATUS, identity()))
            .and_then(|b| b.add_transition("a", COMPLETED_EXIT, "a", identity()));
        assert_eq!(
            result.err(),
            Some(BrainError::DuplicateTransition("a".to_string(), COMPLETED_EXIT.to_string()))
        );

        let result = StateMachineBuilder::new()
            .add_state(Scripted::new("a", vec![]))
            .and_then(|b| b.add_transition("a", STAY_EXIT, "a", identity()));
        assert!(matches!(result, Err(BrainError::ReservedExitCode(_))));

        let result = StateMachineBuilder::new().build("missing");
        assert!(matches!(result, Err(BrainError::UndefinedState(_))));
    }

    #[test]
    fn test_stay_keeps_state() {
        let mut engine = StateMachineBuilder::new()
            .add_state(Scripted::new("a", vec![STAY_EXIT, STAY_EXIT]))
            .and_then(|b| b.build("a"))
            .unwrap();
        let map = map();
        for t in 0..3 {
            let commands = engine.process(&sample(t), &map);
            assert_eq!(engine.status_name(), "a");
            assert!(!commands.motion.is_halt());
        }
        assert_eq!(engine.context().number("a.activations"), Some(1.0));
        assert!(engine.transition_history().is_empty());
    }

    #[test]
    fn test_transition_applies_transform() {
        let mut engine = StateMachineBuilder::new()
            .add_state(Scripted::new("a", vec![COMPLETED_EXIT]))
            .and_then(|b| b.add_state(Scripted::new("b", vec![])))
            .and_then(|b| {
                b.add_transition("a", COMPLETED_EXIT, "b", |ctx: &mut StateMachineContext| {
                    ctx.set_target(Point2D::new(1.0, 1.0))
                })
            })
            .and_then(|b| b.build("a"))
            .unwrap();
        let map = map();

        // the command of the exiting state is emitted on the transition tick
        let commands = engine.process(&sample(0), &map);
        assert!(!commands.motion.is_halt());
        assert_eq!(engine.status_name(), "b");
        assert_eq!(engine.context().target(), Some(Point2D::new(1.0, 1.0)));
        assert_eq!(engine.context().status_name(), Some("b"));
        assert_eq!(
            engine.transition_history(),
            &[("a".to_string(), COMPLETED_EXIT.to_string(), "b".to_string())]
        );
    }

    #[test]
    fn test_missing_transition_ends() {
        let mut engine = StateMachineBuilder::new()
            .add_state(Scripted::new("a", vec![UNREACHABLE_EXIT]))
            .and_then(|b| b.build("a"))
            .unwrap();
        let map = map();

        engine.process(&sample(0), &map);
        assert!(engine.is_ended());
        for t in 1..5 {
            let commands = engine.process(&sample(t * 1000), &map);
            assert_eq!(commands, RobotCommands::halt());
            assert!(engine.is_ended());
        }
    }

    #[test]
    fn test_timeout_from_context() {
        let mut engine = StateMachineBuilder::new()
            .add_state(Scripted::new("a", vec![]))
            .and_then(|b| b.add_transition("a", TIMEOUT_EXIT, END_STATUS, identity()))
            .map(|b| b.set_param("a.timeout", 1000))
            .and_then(|b| b.build("a"))
            .unwrap();
        let map = map();

        engine.process(&sample(500), &map);
        engine.process(&sample(1499), &map);
        assert_eq!(engine.status_name(), "a");
        let commands = engine.process(&sample(1500), &map);
        assert_eq!(commands, RobotCommands::halt());
        assert!(engine.is_ended());
    }

    #[test]
    fn test_describe() {
        let engine = StateMachineBuilder::new()
            .add_state(Scripted::new("a", vec![]))
            .and_then(|b| b.add_transition("a", COMPLETED_EXIT, END_STATUS, identity()))
            .and_then(|b| b.build("a"))
            .unwrap();
        let text = engine.describe();
        assert!(text.contains("Current State: a"));
        assert!(text.contains("  - a [CURRENT]"));
        assert!(text.contains("  - End"));
        assert!(text.contains("  a --[Completed]--> End"));
    }
}
