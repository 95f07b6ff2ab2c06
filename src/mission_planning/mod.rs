//! Behavior state machine
//!
//! A table driven engine runs one [`EngineStatus`] per control tick. The
//! shared [`safety_check`] runs before the state logic and every exit code
//! is routed through the transition table.

pub mod context;
pub mod safety;
pub mod state_machine;
pub mod states;
pub mod transforms;

pub use context::*;
pub use safety::*;
pub use state_machine::*;
pub use states::*;
