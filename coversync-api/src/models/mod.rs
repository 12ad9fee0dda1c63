mod command;
mod device;
mod event;
mod status;

pub use command::*;
pub use device::*;
pub use event::*;
pub use status::*;

/// Lowest accepted position or slat angle.
pub const MIN_POSITION: i32 = 0;

/// Highest accepted position or slat angle.
pub const MAX_POSITION: i32 = 100;

/// Whether `position` is a valid percentage for a cover.
pub fn is_valid_position(position: i32) -> bool {
    (MIN_POSITION..=MAX_POSITION).contains(&position)
}
