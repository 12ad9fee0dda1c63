mod actor;
mod control;
mod group;
mod health;

pub use actor::*;
pub use control::*;
pub use group::*;
pub use health::*;
