//! Tax microsimulation - federal individual income and payroll tax engine
//!
//! This library provides:
//! - Year-indexed policy and consumption parameters with JSON reforms
//! - Growth factors and growth differences for aging filing-unit data
//! - A record table of filing units and its CSV loaders
//! - The per-unit tax pipeline and the calculator that drives it
//! - Marginal tax rates, diagnostic tables and reform documentation
//! - Parallel batch runs over large tables

pub mod batch;
pub mod calcfunctions;
pub mod calculator;
pub mod error;
pub mod growth;
pub mod parameters;
pub mod records;

// Re-export commonly used types
pub use batch::BatchRunner;
pub use calculator::{Calculator, DiagnosticRow, MarginalRates, MtrOptions};
pub use error::{Result, TaxError};
pub use growth::{GrowDiff, GrowFactors};
pub use parameters::{Consumption, Policy, Reform};
pub use records::{Records, TaxUnit};
