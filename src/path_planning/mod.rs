// Path Planning algorithms module

pub mod a_star;
pub mod path_optimizer;

pub use a_star::*;
pub use path_optimizer::*;
