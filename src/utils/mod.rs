//! Utility modules for wheelly_brain

pub mod fuzzy;
pub mod grid_map;

pub use grid_map::*;
