pub mod list;
pub mod types;

pub use list::*;
pub use types::*;
