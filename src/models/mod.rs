pub mod morph;
pub mod vote;

pub use morph::*;
pub use vote::*;
