//! Marginal tax rates by finite difference
//!
//! A one-cent change is added to one income or expense variable (and to
//! any aggregate that includes it), the pipeline is rerun, and the change in
//! payroll, income and combined tax is divided by the change in income.

use super::Calculator;
use crate::calcfunctions::TaxParams;
use crate::error::{Result, TaxError};
use log::debug;

/// Variables a marginal rate can be taken with respect to
pub const MTR_VALID_VARIABLES: [&str; 19] = [
    "e00200p", "e00200s", "e00900p", "e00300", "e00400", "e00600", "e00650", "e01400",
    "e01700", "e02000", "e02400", "p22250", "p23250", "e18500", "e19200", "e26270",
    "e19800", "e20100", "k1bx14p",
];

/// One cent
const FINITE_DIFF: f64 = 0.01;

/// Options for [`Calculator::mtr`]
#[derive(Debug, Clone, Copy)]
pub struct MtrOptions {
    /// Subtract the cent instead of adding it
    pub negative_finite_diff: bool,
    /// Pass `zero_out` to every `calc_all` run
    pub zero_out_calculated_vars: bool,
    /// Skip the base-case run because `calc_all` already ran on this state
    pub calc_all_already_called: bool,
    /// Express earnings rates per dollar of wages plus employer payroll tax
    pub wrt_full_compensation: bool,
}

impl Default for MtrOptions {
    fn default() -> Self {
        Self {
            negative_finite_diff: false,
            zero_out_calculated_vars: false,
            calc_all_already_called: false,
            wrt_full_compensation: true,
        }
    }
}

/// Per-unit marginal rates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarginalRates {
    pub payrolltax: Vec<f64>,
    pub incometax: Vec<f64>,
    pub combined: Vec<f64>,
}

/// Aggregates that move with the perturbed variable
fn linked_aggregates(variable: &str) -> &'static [&'static str] {
    match variable {
        "e00200p" | "e00200s" => &["e00200"],
        "e00900p" => &["e00900"],
        "e00650" => &["e00600"],
        "e26270" => &["e02000"],
        "k1bx14p" => &["e02000", "e26270"],
        _ => &[],
    }
}

impl Calculator {
    /// Marginal payroll, income and combined tax rates on `variable`
    ///
    /// The calculator's records are restored before returning, and unless
    /// `calc_all_already_called` is set the base case is recomputed, so
    /// afterwards the calculator holds base-case results.
    pub fn mtr(&mut self, variable: &str, opts: MtrOptions) -> Result<MarginalRates> {
        if opts.zero_out_calculated_vars && opts.calc_all_already_called {
            return Err(TaxError::State(
                "zero_out_calculated_vars and calc_all_already_called cannot both be set"
                    .to_string(),
            ));
        }
        if !MTR_VALID_VARIABLES.contains(&variable) {
            return Err(TaxError::UnknownVariable(format!(
                "{} is not a valid marginal rate variable",
                variable
            )));
        }
        let fd = if opts.negative_finite_diff {
            -FINITE_DIFF
        } else {
            FINITE_DIFF
        };
        let n = self.array_len();
        let base_values = self.array(variable)?;

        self.store_records()?;
        let bump = vec![fd; n];
        let perturbed = self.perturb_and_calc(variable, &bump, opts.zero_out_calculated_vars);
        // records go back even if the perturbed run failed
        self.restore_records()?;
        let (payroll_chng, income_chng) = perturbed?;

        if !opts.calc_all_already_called || opts.zero_out_calculated_vars {
            self.calc_all(opts.zero_out_calculated_vars)?;
        }
        let payroll_base = self.array("payrolltax")?;
        let income_base = self.array("iitax")?;

        let adj = if opts.wrt_full_compensation && (variable == "e00200p" || variable == "e00200s")
        {
            let p = TaxParams::from_policy(self.policy())?;
            base_values
                .iter()
                .map(|&v| {
                    if v < p.SS_Earnings_c || v >= p.SS_Earnings_thd {
                        p.FICA_ss_trt_employer + p.FICA_mc_trt_employer
                    } else {
                        p.FICA_mc_trt_employer
                    }
                })
                .collect()
        } else {
            vec![0.0; n]
        };

        let mars = self.array("MARS")?;
        let mut rates = MarginalRates {
            payrolltax: Vec::with_capacity(n),
            incometax: Vec::with_capacity(n),
            combined: Vec::with_capacity(n),
        };
        for i in 0..n {
            let denom = fd * (1.0 + adj[i]);
            let ptax_diff = payroll_chng[i] - payroll_base[i];
            let itax_diff = income_chng[i] - income_base[i];
            let (ptax, itax, comb) = if variable == "e00200s" && mars[i] != 2.0 {
                (f64::NAN, f64::NAN, f64::NAN)
            } else {
                (
                    ptax_diff / denom,
                    itax_diff / denom,
                    (ptax_diff + itax_diff) / denom,
                )
            };
            rates.payrolltax.push(ptax);
            rates.incometax.push(itax);
            rates.combined.push(comb);
        }
        debug!("Computed marginal rates on {} for {} units", variable, n);
        Ok(rates)
    }

    /// Add `bump` to `variable` and its aggregates, apply any consumption
    /// response and return the resulting payroll and income tax
    fn perturb_and_calc(
        &mut self,
        variable: &str,
        bump: &[f64],
        zero_out: bool,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        self.incarray(variable, bump)?;
        for aggregate in linked_aggregates(variable) {
            self.incarray(aggregate, bump)?;
        }
        if self.consumption.has_response()? {
            self.consumption.response(&mut self.records, bump)?;
        }
        self.calc_all(zero_out)?;
        Ok((self.array("payrolltax")?, self.array("iitax")?))
    }
}
