pub mod logger;
pub mod navigation;
pub mod waypoint;

pub use logger::*;
pub use navigation::*;
pub use waypoint::*;
