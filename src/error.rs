//! Crate-wide error type
//!
//! Every fallible operation in the engine returns [`Result`]. Variants follow
//! the failure categories a caller needs to tell apart: bad input schema,
//! invalid reform values, obsolete parameter names, missing data columns,
//! years outside a supported window, and misuse of calculator state.

use thiserror::Error;

/// Error raised by parameter, records, growth-factor and calculator operations
#[derive(Error, Debug)]
pub enum TaxError {
    #[error("Schema error: {0}")]
    Schema(String),

    /// All validity problems found while checking one reform, one per line
    #[error("Invalid reform values:\n{}", .0.join("\n"))]
    Validation(Vec<String>),

    #[error("Parameter {old} was renamed; use {new} instead")]
    RenamedParameter { old: String, new: String },

    #[error("Parameter {name} was removed: {reason}")]
    RemovedParameter { name: String, reason: String },

    #[error("Unknown parameter {name}{}", suggest_suffix(.suggestions))]
    UnknownParameter { name: String, suggestions: Vec<String> },

    #[error("Required variables missing from input: {}", .0.join(", "))]
    MissingVariable(Vec<String>),

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Year {year} outside valid range [{first}, {last}] for {what}")]
    OutOfRange {
        what: String,
        year: i32,
        first: i32,
        last: i32,
    },

    #[error("Unknown growth factor: {0}")]
    UnknownFactor(String),

    #[error("Invalid state: {0}")]
    State(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

fn suggest_suffix(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

impl TaxError {
    pub fn out_of_range(what: impl Into<String>, year: i32, first: i32, last: i32) -> Self {
        TaxError::OutOfRange {
            what: what.into(),
            year,
            first,
            last,
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, TaxError>;
