mod actor_handle;
mod control_handle;
mod group_handle;
mod health_handle;
mod sse_handle;

pub use actor_handle::*;
pub use control_handle::*;
pub use group_handle::*;
pub use health_handle::*;
pub use sse_handle::*;
