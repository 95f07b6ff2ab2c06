// Occupancy grid map
// fuses the echoes of a rotating distance sensor into a sparse set of
// weighted obstacle cells

use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::common::{normalize_deg, BrainError, BrainResult, GridCell, Point2D, RobotSample};
use crate::mapping::ProhibitedCellFinder;
use crate::utils::fuzzy::{and, between, defuzzy, negative, not, or, positive};
use crate::utils::GridTopology;

/// An observed obstacle cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Center of the obstacle cell [m]
    pub location: Point2D,
    /// Instant of the last observation [ms]
    pub timestamp: u64,
    /// Occupancy likelihood in [0, 1]
    pub likelihood: f64,
}

impl Obstacle {
    pub fn new(location: Point2D, timestamp: u64, likelihood: f64) -> Self {
        Obstacle {
            location,
            timestamp,
            likelihood: likelihood.clamp(0.0, 1.0),
        }
    }
}

/// Tuning of the echo fusion rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorModelConfig {
    /// Half width of the full confidence sensing cone [deg]
    pub max_sensitivity_deg: f64,
    /// Half width of the sensing cone [deg]
    pub no_sensitivity_deg: f64,
    /// Tolerance around the echo distance [m]
    pub threshold_distance: f64,
    /// Width of the fuzzy band around the tolerance [m]
    pub fuzzy_threshold_distance: f64,
    /// Sensor range [m]
    pub max_distance: f64,
    /// Likelihood decay time constant [ms]
    pub likelihood_tau_ms: f64,
    /// Obstacles not observed for this long are forgotten [ms]
    pub hold_duration_ms: u64,
    /// Obstacles below this likelihood are forgotten
    pub min_likelihood: f64,
}

impl Default for SensorModelConfig {
    fn default() -> Self {
        SensorModelConfig {
            max_sensitivity_deg: 15.0,
            no_sensitivity_deg: 30.0,
            threshold_distance: 0.2,
            fuzzy_threshold_distance: 0.01,
            max_distance: 3.0,
            likelihood_tau_ms: 1000.0,
            hold_duration_ms: 60000,
            min_likelihood: 0.01,
        }
    }
}

/// Map geometry and safety parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupancyMapConfig {
    /// Cell size [m]
    pub grid_size: f64,
    /// Clearance kept from reliable obstacles [m]
    pub safe_distance: f64,
    /// Minimum likelihood of a reliable obstacle
    pub likelihood_threshold: f64,
    pub sensor: SensorModelConfig,
}

impl Default for OccupancyMapConfig {
    fn default() -> Self {
        OccupancyMapConfig {
            grid_size: 0.2,
            safe_distance: 0.3,
            likelihood_threshold: 0.5,
            sensor: SensorModelConfig::default(),
        }
    }
}

impl OccupancyMapConfig {
    pub fn validate(&self) -> BrainResult<()> {
        GridTopology::new(self.grid_size)?;
        if !(self.safe_distance >= 0.0) {
            return Err(BrainError::InvalidParameter(format!(
                "safe distance must be non negative, got {}",
                self.safe_distance
            )));
        }
        if !(0.0..=1.0).contains(&self.likelihood_threshold) {
            return Err(BrainError::InvalidParameter(format!(
                "likelihood threshold must be in [0, 1], got {}",
                self.likelihood_threshold
            )));
        }
        let s = &self.sensor;
        if !(s.max_sensitivity_deg > 0.0 && s.max_sensitivity_deg < s.no_sensitivity_deg) {
            return Err(BrainError::InvalidParameter(format!(
                "sensing cone must satisfy 0 < {} < {}",
                s.max_sensitivity_deg, s.no_sensitivity_deg
            )));
        }
        if !(s.fuzzy_threshold_distance > 0.0 && s.likelihood_tau_ms > 0.0) {
            return Err(BrainError::InvalidParameter(
                "fuzzy threshold and likelihood tau must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sparse occupancy grid
///
/// Obstacles are keyed by cell and always sit at the cell center. The
/// prohibited cells and their contour are computed on demand and cached
/// until the next fusion.
#[derive(Debug, Clone)]
pub struct OccupancyMap {
    grid: GridTopology,
    safe_distance: f64,
    likelihood_threshold: f64,
    sensor: SensorModelConfig,
    obstacles: Arc<HashMap<GridCell, Obstacle>>,
    prohibited: OnceCell<HashSet<GridCell>>,
    contours: OnceCell<HashSet<GridCell>>,
}

impl OccupancyMap {
    pub fn new(config: OccupancyMapConfig) -> BrainResult<Self> {
        config.validate()?;
        Ok(OccupancyMap {
            grid: GridTopology::new(config.grid_size)?,
            safe_distance: config.safe_distance,
            likelihood_threshold: config.likelihood_threshold,
            sensor: config.sensor,
            obstacles: Arc::new(HashMap::new()),
            prohibited: OnceCell::new(),
            contours: OnceCell::new(),
        })
    }

    /// Copy of the map sharing the obstacles with different safety parameters
    pub fn with_safety(&self, safe_distance: f64, likelihood_threshold: f64) -> Self {
        if safe_distance == self.safe_distance && likelihood_threshold == self.likelihood_threshold {
            return self.clone();
        }
        OccupancyMap {
            grid: self.grid,
            safe_distance,
            likelihood_threshold,
            sensor: self.sensor,
            obstacles: Arc::clone(&self.obstacles),
            prohibited: OnceCell::new(),
            contours: OnceCell::new(),
        }
    }

    pub fn grid(&self) -> &GridTopology {
        &self.grid
    }

    pub fn grid_size(&self) -> f64 {
        self.grid.grid_size()
    }

    pub fn safe_distance(&self) -> f64 {
        self.safe_distance
    }

    pub fn likelihood_threshold(&self) -> f64 {
        self.likelihood_threshold
    }

    pub fn cell(&self, point: &Point2D) -> GridCell {
        self.grid.cell(point)
    }

    pub fn to_point(&self, cell: &GridCell) -> Point2D {
        self.grid.to_point(cell)
    }

    pub fn snap(&self, point: &Point2D) -> Point2D {
        self.grid.snap(point)
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn obstacles(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.values()
    }

    pub fn obstacle_at(&self, point: &Point2D) -> Option<&Obstacle> {
        self.obstacles.get(&self.cell(point))
    }

    pub fn is_obstacle_at(&self, point: &Point2D) -> bool {
        self.obstacles.contains_key(&self.cell(point))
    }

    /// Cells too close to a reliable obstacle
    pub fn prohibited(&self) -> &HashSet<GridCell> {
        self.prohibited.get_or_init(|| {
            ProhibitedCellFinder::new(self.grid, self.safe_distance, self.likelihood_threshold)
                .find(self.obstacles.values())
        })
    }

    /// Free cells bordering the prohibited area
    pub fn contours(&self) -> &HashSet<GridCell> {
        self.contours
            .get_or_init(|| ProhibitedCellFinder::find_contour(self.prohibited()))
    }

    pub fn is_prohibited(&self, point: &Point2D) -> bool {
        self.is_prohibited_cell(&self.cell(point))
    }

    pub fn is_prohibited_cell(&self, cell: &GridCell) -> bool {
        self.prohibited().contains(cell)
    }

    /// Adds an obstacle at the cell containing `location`
    ///
    /// An obstacle already in the cell keeps the higher likelihood.
    pub fn insert(&mut self, location: &Point2D, timestamp: u64, likelihood: f64) {
        let cell = self.cell(location);
        let obstacle = Obstacle::new(self.to_point(&cell), timestamp, likelihood);
        merge_max(Arc::make_mut(&mut self.obstacles), cell, obstacle);
        self.invalidate();
    }

    /// Fuses a telemetry sample into the map
    pub fn update(&mut self, sample: &RobotSample) {
        let now = sample.timestamp;
        let mut fused: HashMap<GridCell, Obstacle> = HashMap::with_capacity(self.obstacles.len() + 3);
        let mut updated = 0usize;

        for (cell, obstacle) in self.obstacles.iter() {
            let next = match self.fuse(obstacle, sample) {
                Some(o) => {
                    updated += 1;
                    o
                }
                None => *obstacle,
            };
            fused.insert(*cell, next);
        }

        if let Some(echo) = sample.echo_location() {
            let cell = self.cell(&echo);
            merge_max(&mut fused, cell, Obstacle::new(self.to_point(&cell), now, 1.0));
        }

        let hold = self.sensor.hold_duration_ms;
        let min_likelihood = self.sensor.min_likelihood;
        fused.retain(|_, o| o.timestamp.saturating_add(hold) >= now && o.likelihood >= min_likelihood);

        let contacts = [
            (sample.contact_forward, sample.front_contact()),
            (sample.contact_backward, sample.rear_contact()),
        ];
        for (_, location) in contacts.iter().filter(|(tripped, _)| *tripped) {
            let cell = self.cell(location);
            merge_max(&mut fused, cell, Obstacle::new(self.to_point(&cell), now, 1.0));
        }

        debug!(
            "Map fusion at {} ms: {} obstacles updated, {} -> {} cells",
            now,
            updated,
            self.obstacles.len(),
            fused.len()
        );
        self.obstacles = Arc::new(fused);
        self.invalidate();
    }

    /// Fused obstacle or `None` if the sample says nothing about it
    fn fuse(&self, obstacle: &Obstacle, sample: &RobotSample) -> Option<Obstacle> {
        let s = &self.sensor;
        let robot = &sample.robot_location;
        let distance = robot.distance(&obstacle.location);
        let offset = normalize_deg(robot.bearing_deg(&obstacle.location) - sample.sensor_deg());
        let echo = sample.echo_distance;

        let in_range = if sample.has_echo() {
            distance < echo + s.threshold_distance + s.fuzzy_threshold_distance
        } else {
            distance < s.max_distance
        };
        if offset.abs() > s.no_sensitivity_deg || !in_range {
            return None;
        }

        let direction = between(
            offset,
            -s.no_sensitivity_deg,
            -s.max_sensitivity_deg,
            s.max_sensitivity_deg,
            s.no_sensitivity_deg,
        );
        let dt = sample.timestamp.saturating_sub(obstacle.timestamp) as f64;
        let decayed = obstacle.likelihood * (-dt / s.likelihood_tau_ms).exp();

        let likelihood = if sample.has_echo() {
            let before = negative(distance - (echo - s.threshold_distance), s.fuzzy_threshold_distance);
            let after = positive(distance - (echo + s.threshold_distance), s.fuzzy_threshold_distance);
            let near = not(or(before, after));
            let reinforce = and(direction, near);
            let clear = and(direction, before);
            let hold = not(or(reinforce, clear));
            defuzzy(&[(1.0, reinforce), (decayed, hold), (0.0, clear)])
        } else {
            let clear = and(direction, negative(distance - s.max_distance, s.fuzzy_threshold_distance));
            defuzzy(&[(decayed, not(clear)), (0.0, clear)])
        };
        Some(Obstacle::new(obstacle.location, sample.timestamp, likelihood))
    }

    fn invalidate(&mut self) {
        self.prohibited = OnceCell::new();
        self.contours = OnceCell::new();
    }
}

fn merge_max(obstacles: &mut HashMap<GridCell, Obstacle>, cell: GridCell, obstacle: Obstacle) {
    obstacles
        .entry(cell)
        .and_modify(|o| {
            if obstacle.likelihood >= o.likelihood {
                *o = obstacle;
            }
        })
        .or_insert(obstacle);
}
