pub mod fixtures;

pub use builders::*;
pub use fixtures::*;
