pub mod patrol_service;

pub use patrol_service::*;
