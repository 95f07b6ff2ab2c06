use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::common::{MotionCommand, RobotCommands, MAX_SENSOR_DEG};
use crate::mission_planning::context::StateMachineContext;
use crate::mission_planning::state_machine::{EngineStatus, StateTransition, Tick, COMPLETED_EXIT};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomScanConfig {
    /// Time spent on each direction [ms]
    pub interval_ms: u64,
    /// Number of random directions
    pub count: usize,
    pub timeout_ms: Option<u64>,
}

impl Default for RandomScanConfig {
    fn default() -> Self {
        RandomScanConfig {
            interval_ms: 500,
            count: 5,
            timeout_ms: None,
        }
    }
}

impl RandomScanConfig {
    pub fn resolve(name: &str, ctx: &StateMachineContext) -> Self {
        let d = Self::default();
        RandomScanConfig {
            interval_ms: ctx.state_millis(name, "interval", d.interval_ms).max(1),
            count: ctx.state_number(name, "count", d.count as f64).max(0.0).round() as usize,
            timeout_ms: ctx.state_timeout(name, d.timeout_ms),
        }
    }
}

/// Holds the robot and points the sensor to random directions
#[derive(Debug, Clone)]
pub struct RandomScanStatus<R = StdRng> {
    name: String,
    config: RandomScanConfig,
    rng: R,
    directions: Vec<i32>,
}

impl RandomScanStatus<StdRng> {
    pub fn new(name: &str) -> Self {
        Self::with_rng(name, StdRng::from_entropy())
    }
}

impl<R> RandomScanStatus<R>
where
    R: Rng + Send,
{
    pub fn with_rng(name: &str, rng: R) -> Self {
        RandomScanStatus {
            name: name.to_string(),
            config: RandomScanConfig::default(),
            rng,
            directions: Vec::new(),
        }
    }
}

impl<R> EngineStatus for RandomScanStatus<R>
where
    R: Rng + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self, ctx: &mut StateMachineContext, now_ms: u64) {
        self.config = RandomScanConfig::resolve(&self.name, ctx);
        ctx.enter(&self.name, now_ms, self.config.timeout_ms);
        let rng = &mut self.rng;
        self.directions = (0..self.config.count)
            .map(|_| rng.gen_range(-MAX_SENSOR_DEG..=MAX_SENSOR_DEG))
            .collect();
        debug!("{}: directions {:?}", self.name, self.directions);
    }

    fn process(&mut self, tick: &Tick<'_>, ctx: &mut StateMachineContext) -> StateTransition {
        let elapsed = ctx.elapsed(tick.now()).unwrap_or(0);
        let index = (elapsed / self.config.interval_ms) as usize;
        match self.directions.get(index) {
            Some(&direction) => StateTransition::stay(RobotCommands::new(MotionCommand::Halt, direction)),
            None => StateTransition::halt(COMPLETED_EXIT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Point2D, RobotSample};
    use crate::mapping::{OccupancyMap, OccupancyMapConfig};

    #[test]
    fn test_random_directions() {
        let map = OccupancyMap::new(OccupancyMapConfig::default()).unwrap();
        let mut ctx = StateMachineContext::new();
        ctx.set_param("look.count", 3);
        ctx.set_param("look.interval", 200);
        let mut scan = RandomScanStatus::with_rng("look", StdRng::seed_from_u64(42));
        scan.activate(&mut ctx, 0);
        assert_eq!(scan.directions.len(), 3);

        for (i, t) in [0u64, 250, 450].iter().enumerate() {
            let sample = RobotSample::new(*t, Point2D::origin(), 0);
            let tx = scan.process(&Tick::new(&sample, &map), &mut ctx);
            assert!(tx.is_stay());
            assert_eq!(tx.commands.sensor_deg, scan.directions[i]);
            assert!(tx.commands.sensor_deg.abs() <= MAX_SENSOR_DEG);
        }
        let sample = RobotSample::new(600, Point2D::origin(), 0);
        let tx = scan.process(&Tick::new(&sample, &map), &mut ctx);
        assert_eq!(tx.exit, COMPLETED_EXIT);
    }

    #[test]
    fn test_seeded_rng_is_repeatable() {
        let mut ctx = StateMachineContext::new();
        let mut a = RandomScanStatus::with_rng("look", StdRng::seed_from_u64(7));
        let mut b = RandomScanStatus::with_rng("look", StdRng::seed_from_u64(7));
        a.activate(&mut ctx, 0);
        b.activate(&mut ctx, 0);
        assert_eq!(a.directions, b.directions);
    }
}
