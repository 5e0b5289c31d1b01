//! Growth factors used to age records and index parameters

pub mod growdiff;
pub mod growfactors;

pub use growdiff::GrowDiff;
pub use growfactors::{GrowFactors, DEFAULT_GROWFACTORS_PATH, VALID_NAMES};
