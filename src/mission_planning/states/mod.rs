// Behaviors run by the state machine engine

pub mod avoid_obstacle;
pub mod find_path;
pub mod goto;
pub mod halt;
pub mod nearest_obstacle;
pub mod nearest_safe;
pub mod next_sequence;
pub mod random_scan;
pub mod random_target;
pub mod scan;
pub mod secure;

pub use avoid_obstacle::*;
pub use find_path::*;
pub use goto::*;
pub use halt::*;
pub use nearest_obstacle::*;
pub use nearest_safe::*;
pub use next_sequence::*;
pub use random_scan::*;
pub use random_target::*;
pub use scan::*;
pub use secure::*;
