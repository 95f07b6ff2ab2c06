// Exploration demo on a simulated robot
//
// A square room with a box in the middle; the robot scans, picks random
// targets, plans safe paths and follows them, backing off and securing
// itself on contacts. Run with RUST_LOG=info (or debug) to follow the
// state machine.

use log::info;
use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use wheelly_brain::common::{normalize_deg, MotionCommand, Point2D, RobotCommands, RobotSample, ROBOT_RADIUS};
use wheelly_brain::mapping::{OccupancyMap, OccupancyMapConfig};
use wheelly_brain::mission_planning::transforms::{clear_obstacle, identity};
use wheelly_brain::mission_planning::*;
use wheelly_brain::BrainResult;

const TICK_MS: u64 = 100;
const MAX_TICKS: usize = 3000;
/// Robot speed at full command [m/s]
const MAX_SPEED: f64 = 0.3;
/// Maximum rotation in one tick [deg]
const MAX_TURN_DEG: f64 = 45.0;
const SENSOR_RANGE: f64 = 3.0;
const ECHO_NOISE: f64 = 0.01;

/// Axis aligned box
struct Block {
    min: Vector2<f64>,
    max: Vector2<f64>,
}

impl Block {
    fn contains(&self, p: &Vector2<f64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Distance along the ray to the box, slab method
    fn ray_distance(&self, origin: &Vector2<f64>, dir: &Vector2<f64>) -> Option<f64> {
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;
        for axis in 0..2 {
            if dir[axis].abs() < 1e-12 {
                if origin[axis] < self.min[axis] || origin[axis] > self.max[axis] {
                    return None;
                }
            } else {
                let t1 = (self.min[axis] - origin[axis]) / dir[axis];
                let t2 = (self.max[axis] - origin[axis]) / dir[axis];
                t_min = t_min.max(t1.min(t2));
                t_max = t_max.min(t1.max(t2));
            }
        }
        if t_max >= t_min.max(0.0) {
            Some(t_min.max(0.0))
        } else {
            None
        }
    }
}

/// Square room of side `2 * half_size` centered on the origin
struct Room {
    half_size: f64,
    blocks: Vec<Block>,
}

impl Room {
    fn is_free(&self, p: &Vector2<f64>) -> bool {
        p.x.abs() < self.half_size && p.y.abs() < self.half_size && !self.blocks.iter().any(|b| b.contains(p))
    }

    fn ray_distance(&self, origin: &Vector2<f64>, direction_deg: f64) -> Option<f64> {
        let rad = direction_deg.to_radians();
        let dir = Vector2::new(rad.cos(), rad.sin());
        let walls = (0..2)
            .filter(|&axis| dir[axis].abs() > 1e-12)
            .map(|axis| (self.half_size * dir[axis].signum() - origin[axis]) / dir[axis])
            .fold(f64::INFINITY, f64::min);
        let nearest = self
            .blocks
            .iter()
            .filter_map(|b| b.ray_distance(origin, &dir))
            .fold(walls, f64::min);
        Some(nearest).filter(|d| *d <= SENSOR_RANGE)
    }
}

struct SimRobot {
    location: Vector2<f64>,
    heading_deg: f64,
    sensor_deg: i32,
    time_ms: u64,
}

impl SimRobot {
    fn contact(&self, room: &Room, direction_deg: f64) -> bool {
        let rad = direction_deg.to_radians();
        let p = self.location + Vector2::new(rad.cos(), rad.sin()) * (ROBOT_RADIUS + 0.01);
        !room.is_free(&p)
    }

    fn sample<D: Distribution<f64>>(&self, room: &Room, rng: &mut StdRng, noise: &D) -> RobotSample {
        let sensor_abs = self.heading_deg + self.sensor_deg as f64;
        let echo = room
            .ray_distance(&self.location, sensor_abs)
            .map(|d| (d + noise.sample(rng)).max(0.01))
            .unwrap_or(0.0);
        RobotSample::new(
            self.time_ms,
            Point2D::from(self.location),
            self.heading_deg.round() as i32,
        )
        .with_sensor(self.sensor_deg, echo)
        .with_contacts(
            self.contact(room, self.heading_deg),
            self.contact(room, self.heading_deg + 180.0),
        )
    }

    fn apply(&mut self, commands: &RobotCommands, room: &Room) {
        self.time_ms += TICK_MS;
        self.sensor_deg = commands.sensor_deg;
        let MotionCommand::Move { direction_deg, speed } = commands.motion else {
            return;
        };
        let error = normalize_deg(direction_deg as f64 - self.heading_deg);
        self.heading_deg = normalize_deg(self.heading_deg + error.clamp(-MAX_TURN_DEG, MAX_TURN_DEG));
        if error.abs() > MAX_TURN_DEG {
            return;
        }
        let rad = self.heading_deg.to_radians();
        let step = Vector2::new(rad.cos(), rad.sin()) * (speed * MAX_SPEED * TICK_MS as f64 / 1000.0);
        let contact_side = if speed >= 0.0 { 0.0 } else { 180.0 };
        let next = self.location + step;
        let probe = SimRobot {
            location: next,
            heading_deg: self.heading_deg,
            sensor_deg: self.sensor_deg,
            time_ms: self.time_ms,
        };
        if !probe.contact(room, self.heading_deg + contact_side) {
            self.location = next;
        }
    }
}

fn build_engine(seed: u64) -> BrainResult<StateMachineEngine> {
    let mut builder = StateMachineBuilder::new()
        .add_state(HaltStatus::new("start"))?
        .add_state(ScanStatus::new("scan"))?
        .add_state(RandomTargetStatus::with_rng("random", StdRng::seed_from_u64(seed)))?
        .add_state(FindPathStatus::new("findPath"))?
        .add_state(NextSequenceStatus::new("next"))?
        .add_state(GotoStatus::new("goto"))?
        .add_state(AvoidObstacleStatus::new("avoid"))?
        .add_state(SecureStatus::new("secure"))?
        .set_param("start.timeout", 500)
        .set_param("random.maxDistance", 1.5)
        .set_param("goto.timeout", 20000);

    let table = [
        ("start", TIMEOUT_EXIT, "scan"),
        ("scan", COMPLETED_EXIT, "random"),
        ("random", TARGET_SELECTED_EXIT, "findPath"),
        ("random", NOT_FOUND_EXIT, "scan"),
        ("findPath", COMPLETED_EXIT, "next"),
        ("findPath", NO_PATH_EXIT, "scan"),
        ("findPath", TARGET_REACHED_EXIT, "scan"),
        ("next", TARGET_SELECTED_EXIT, "goto"),
        ("next", COMPLETED_EXIT, "scan"),
        ("goto", COMPLETED_EXIT, "next"),
        ("goto", UNREACHABLE_EXIT, "findPath"),
        ("goto", TIMEOUT_EXIT, "scan"),
        ("avoid", COMPLETED_EXIT, "secure"),
        ("avoid", OBSTACLE_EXIT, "secure"),
        ("avoid", TIMEOUT_EXIT, "secure"),
        ("secure", BLOCKED_EXIT, "start"),
        ("secure", TIMEOUT_EXIT, "start"),
    ];
    for (from, exit, to) in table {
        builder = builder.add_transition(from, exit, to, identity())?;
    }
    builder = builder.add_transition("secure", COMPLETED_EXIT, "scan", clear_obstacle())?;
    for from in ["scan", "random", "findPath", "next", "goto"] {
        builder = builder
            .add_transition(from, OBSTACLE_EXIT, "avoid", identity())?
            .add_transition(from, BLOCKED_EXIT, "secure", identity())?;
    }
    builder
        .add_transition("avoid", BLOCKED_EXIT, "secure", identity())?
        .build("start")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let room = Room {
        half_size: 2.0,
        blocks: vec![Block {
            min: Vector2::new(0.6, -0.3),
            max: Vector2::new(1.0, 0.3),
        }],
    };
    let mut robot = SimRobot {
        location: Vector2::new(-1.0, 0.0),
        heading_deg: 0.0,
        sensor_deg: 0,
        time_ms: 0,
    };
    let mut rng = StdRng::seed_from_u64(1234);
    let noise = Normal::new(0.0, ECHO_NOISE)?;

    let mut engine = build_engine(42)?;
    let mut map = OccupancyMap::new(OccupancyMapConfig::default())?;
    info!("{}", engine.describe());

    for tick in 0..MAX_TICKS {
        let sample = robot.sample(&room, &mut rng, &noise);
        map.update(&sample);
        let commands = engine.process(&sample, &map);
        robot.apply(&commands, &room);
        if engine.is_ended() {
            info!("Ended at tick {}", tick);
            break;
        }
    }

    info!(
        "Final location ({:.2}, {:.2}), state {}, {} obstacles, {} transitions",
        robot.location.x,
        robot.location.y,
        engine.status_name(),
        map.len(),
        engine.transition_history().len()
    );
    Ok(())
}
