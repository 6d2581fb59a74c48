//! Domain models for the skills checklist system.

mod answer;
mod assignment;
mod definition;

pub use answer::*;
pub use assignment::*;
pub use definition::*;
