//! Data models

pub mod features;
pub mod prediction;
pub mod drift;

pub use features::*;
pub use prediction::*;
pub use drift::*;
