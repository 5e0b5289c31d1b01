//! Parallel runs over large record tables
//!
//! Filing units are independent within a year, so a table can be cut into
//! row chunks that each get their own [`Calculator`]. Chunks run on the
//! rayon pool and results are written back in row order.

use crate::calculator::Calculator;
use crate::error::{Result, TaxError};
use crate::parameters::{Consumption, Policy};
use crate::records::{Records, TaxUnit};
use log::info;
use rayon::prelude::*;
use std::time::Instant;

/// Rows per chunk when none is given
pub const DEFAULT_CHUNK_SIZE: usize = 2_000;

/// Shared policy and consumption assumptions applied to many tables
///
/// # Example
/// ```ignore
/// let runner = BatchRunner::new(policy, consumption);
/// let baseline = runner.run(&records)?;
/// let reformed = runner.run_policies(&records, &[reform_a, reform_b])?;
/// ```
#[derive(Debug, Clone)]
pub struct BatchRunner {
    policy: Policy,
    consumption: Consumption,
    chunk_size: usize,
}

impl BatchRunner {
    pub fn new(policy: Policy, consumption: Consumption) -> Self {
        Self {
            policy,
            consumption,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Run the full pipeline on `records` and return the computed table
    ///
    /// The records must already be at the policy year.
    pub fn run(&self, records: &Records) -> Result<Records> {
        run_chunked(&self.policy, &self.consumption, records, self.chunk_size)
    }

    /// Run each policy on the same table, in parallel across policies
    pub fn run_policies(&self, records: &Records, policies: &[Policy]) -> Result<Vec<Records>> {
        policies
            .par_iter()
            .map(|pol| run_chunked(pol, &self.consumption, records, self.chunk_size))
            .collect()
    }
}

fn run_chunked(
    policy: &Policy,
    consumption: &Consumption,
    records: &Records,
    chunk_size: usize,
) -> Result<Records> {
    if records.current_year() != policy.current_year() {
        return Err(TaxError::State(format!(
            "records are at {} but policy is at {}",
            records.current_year(),
            policy.current_year()
        )));
    }
    let start = Instant::now();
    let n = records.array_length();
    let ranges: Vec<(usize, usize)> = (0..n)
        .step_by(chunk_size.max(1))
        .map(|s| (s, (s + chunk_size).min(n)))
        .collect();

    let parts: Vec<Vec<TaxUnit>> = ranges
        .par_iter()
        .map(|&(s, e)| {
            let chunk = records.slice(s, e)?;
            let mut calc = Calculator::new(policy.clone(), chunk, Some(consumption.clone()))?;
            calc.calc_all(false)?;
            Ok(calc.records().units().to_vec())
        })
        .collect::<Result<_>>()?;

    let mut out = records.clone();
    for (&(s, e), part) in ranges.iter().zip(parts) {
        out.units_mut()[s..e].clone_from_slice(&part);
    }
    info!(
        "Computed {} units in {} chunks for {} in {:?}",
        n,
        ranges.len(),
        policy.current_year(),
        start.elapsed()
    );
    Ok(out)
}
