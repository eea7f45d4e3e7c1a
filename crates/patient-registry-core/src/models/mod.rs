//! Domain models for the patient registry.

mod dates;
mod patient;

pub use dates::*;
pub use patient::*;
