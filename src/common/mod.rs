//! Common types, traits, and error definitions for wheelly_brain
//!
//! This module provides the foundational building blocks used across
//! the mapping, planning and behavior modules of this crate.

pub mod types;
pub mod traits;
pub mod error;
pub mod telemetry;

pub use types::*;
pub use traits::*;
pub use error::*;
pub use telemetry::*;
