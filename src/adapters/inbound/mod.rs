pub mod trigger;
pub mod waypoint_source;

pub use trigger::*;
pub use waypoint_source::*;
