mod env_info;
mod fork;
mod log;
mod schedule;

pub use env_info::*;
pub use fork::*;
pub use log::*;
pub use schedule::*;
