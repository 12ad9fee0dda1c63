pub mod device;

pub use device::{BlindsConfig, Device};
