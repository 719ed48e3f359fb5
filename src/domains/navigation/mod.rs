pub mod dispatch;
pub mod events;
pub mod ports;
pub mod projections;
pub mod sequencer;

pub use dispatch::*;
pub use events::*;
pub use ports::*;
pub use projections::*;
pub use sequencer::*;
