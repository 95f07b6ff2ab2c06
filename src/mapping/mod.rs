// Mapping module

pub mod occupancy_grid_map;
pub mod prohibited_cells;

pub use occupancy_grid_map::*;
pub use prohibited_cells::*;
