pub mod settings;

pub use settings::{Credentials, Gateway, Logger, Server, Settings, Shelly, Web};
