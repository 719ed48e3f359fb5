pub mod loggers;
pub mod simulated_nav;

pub use loggers::*;
pub use simulated_nav::*;
