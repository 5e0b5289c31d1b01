//! Calculator: policy, records and consumption assumptions for one year
//!
//! The Calculator owns its [`Policy`], [`Records`] and [`Consumption`] and
//! keeps them on the same calendar year. [`Calculator::calc_all`] runs the
//! tax pipeline over every filing unit, choosing between the standard and
//! itemized deductions by computing tax both ways.

pub mod diagnostics;
pub mod docs;
pub mod frame;
pub mod mtr;
pub mod surtax;

#[cfg(test)]
mod scenarios;

pub use diagnostics::{DiagnosticRow, DIST_VARIABLES};
pub use docs::reform_documentation;
pub use frame::DataFrame;
pub use mtr::{MarginalRates, MtrOptions, MTR_VALID_VARIABLES};

use crate::calcfunctions::amt::{amt, net_inv_inc_tax};
use crate::calcfunctions::benefits::benefit_programs;
use crate::calcfunctions::credits::{
    additional_ctc, am_opp_credit_parts, charity_credit, child_dep_tax_credit, ctc_new,
    education_tax_credit, eitc, f2441, nonrefundable_credits, personal_tax_credit,
    refundable_payroll_tax_credit, sch_r,
};
use crate::calcfunctions::deductions::{item_ded, item_ded_cap, std_ded, tax_inc};
use crate::calcfunctions::income::{adj, agi, cap_gains, dependent_care, inv_inc_ec_base, ss_benefits};
use crate::calcfunctions::payroll::{additional_medicare_tax, ei_payroll_tax};
use crate::calcfunctions::schedules::{agi_surtax, gains_tax, sch_xyz_tax};
use crate::calcfunctions::totals::{
    aftertax_income, c1040, expand_income, fair_share_tax, iitax, lump_sum_tax,
};
use crate::calcfunctions::{Stage, TaxParams};
use crate::error::{Result, TaxError};
use crate::parameters::consumption::BenefitValues;
use crate::parameters::{Consumption, Policy};
use crate::records::{Records, TaxUnit};
use log::{debug, info, warn};

/// Stages from payroll tax through the standard deduction
const TO_STANDARD_DEDUCTION: [Stage; 11] = [
    ei_payroll_tax,
    dependent_care,
    adj,
    inv_inc_ec_base,
    cap_gains,
    ss_benefits,
    agi,
    item_ded_cap,
    item_ded,
    additional_medicare_tax,
    std_ded,
];

/// Stages run once per deduction choice in the optimizer
const TAXINC_TO_AMT: [Stage; 6] = [
    tax_inc,
    sch_xyz_tax,
    gains_tax,
    agi_surtax,
    net_inv_inc_tax,
    amt,
];

const CREDITS_TO_IITAX: [Stage; 14] = [
    f2441,
    eitc,
    refundable_payroll_tax_credit,
    personal_tax_credit,
    am_opp_credit_parts,
    sch_r,
    education_tax_credit,
    charity_credit,
    child_dep_tax_credit,
    nonrefundable_credits,
    additional_ctc,
    c1040,
    ctc_new,
    iitax,
];

const AFTER_SURTAXES: [Stage; 4] = [fair_share_tax, lump_sum_tax, expand_income, aftertax_income];

/// Itemized deduction total and its parts, as saved by the optimizer
#[derive(Debug, Clone, Copy, Default)]
struct Itemized {
    c04470: f64,
    c21060: f64,
    c21040: f64,
    c17000: f64,
    c18300: f64,
    c19200: f64,
    c19700: f64,
    c20500: f64,
    c20800: f64,
}

impl Itemized {
    fn take(u: &TaxUnit) -> Self {
        Self {
            c04470: u.c04470,
            c21060: u.c21060,
            c21040: u.c21040,
            c17000: u.c17000,
            c18300: u.c18300,
            c19200: u.c19200,
            c19700: u.c19700,
            c20500: u.c20500,
            c20800: u.c20800,
        }
    }

    fn put(&self, u: &mut TaxUnit) {
        u.c04470 = self.c04470;
        u.c21060 = self.c21060;
        u.c21040 = self.c21040;
        u.c17000 = self.c17000;
        u.c18300 = self.c18300;
        u.c19200 = self.c19200;
        u.c19700 = self.c19700;
        u.c20500 = self.c20500;
        u.c20800 = self.c20800;
    }
}

#[derive(Debug, Clone)]
pub struct Calculator {
    policy: Policy,
    records: Records,
    consumption: Consumption,
    stored_records: Option<Records>,
}

impl Calculator {
    /// Build a calculator and bring all three inputs to one year
    ///
    /// Policy moves forward to the records' data year if it is earlier.
    /// Records still at their data year are then aged to the policy year.
    /// Without a `consumption` argument the default assumptions are used.
    pub fn new(
        mut policy: Policy,
        mut records: Records,
        consumption: Option<Consumption>,
    ) -> Result<Self> {
        if policy.current_year() < records.data_year() {
            policy.set_year(records.data_year())?;
        }
        let mut consumption = match consumption {
            Some(c) => c,
            None => Consumption::new()?,
        };
        if consumption.current_year() != policy.current_year() {
            consumption.set_year(policy.current_year())?;
        }
        if !records.ignored_variables().is_empty() {
            warn!(
                "Ignoring unused input variables: {}",
                records.ignored_variables().join(", ")
            );
        }
        if records.current_year() == records.data_year() {
            while records.current_year() < policy.current_year() {
                records.increment_year()?;
            }
            info!(
                "Records for {} extrapolated to {}",
                records.data_year(),
                records.current_year()
            );
        }
        if records.current_year() != policy.current_year() {
            return Err(TaxError::State(format!(
                "records year {} does not match policy year {}",
                records.current_year(),
                policy.current_year()
            )));
        }
        Ok(Self {
            policy,
            records,
            consumption,
            stored_records: None,
        })
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn records(&self) -> &Records {
        &self.records
    }

    pub fn consumption(&self) -> &Consumption {
        &self.consumption
    }

    pub fn current_year(&self) -> i32 {
        self.policy.current_year()
    }

    pub fn data_year(&self) -> i32 {
        self.records.data_year()
    }

    pub fn array_len(&self) -> usize {
        self.records.array_length()
    }

    /// Warnings accumulated by the last reform applied to the policy
    pub fn reform_warnings(&self) -> &[String] {
        self.policy.parameter_warnings()
    }

    /// Advance policy, consumption and records to the next year
    pub fn increment_year(&mut self) -> Result<()> {
        let next = self.current_year() + 1;
        self.policy.check_year(next)?;
        self.consumption.check_year(next)?;
        self.records.increment_year()?;
        self.policy.set_year(next)?;
        self.consumption.set_year(next)?;
        Ok(())
    }

    pub fn advance_to_year(&mut self, year: i32) -> Result<()> {
        if year < self.current_year() {
            return Err(TaxError::State(format!(
                "cannot move from {} back to {}",
                self.current_year(),
                year
            )));
        }
        while self.current_year() < year {
            self.increment_year()?;
        }
        Ok(())
    }

    /// Run the whole pipeline for the current year
    ///
    /// With `zero_out` every changing calculated variable is reset first,
    /// so results cannot depend on a previous run.
    pub fn calc_all(&mut self, zero_out: bool) -> Result<()> {
        if self.policy.current_year() != self.records.current_year() {
            return Err(TaxError::State(format!(
                "policy year {} differs from records year {}",
                self.policy.current_year(),
                self.records.current_year()
            )));
        }
        if zero_out {
            self.records.zero_out_changing_calculated_vars();
        }
        let params = TaxParams::from_policy(&self.policy)?;
        let values = self.consumption.benval_params()?;
        self.apply_benefit_programs(&params, &values);
        self.calc_one_year(&params);
        surtax::benefit_surtax(self, &params)?;
        surtax::benefit_limitation(self, &params)?;
        self.run_stages(&params, &AFTER_SURTAXES);
        debug!(
            "calc_all finished for {} units in {}",
            self.array_len(),
            self.current_year()
        );
        Ok(())
    }

    fn apply_benefit_programs(&mut self, params: &TaxParams, values: &BenefitValues) {
        for unit in self.records.units_mut() {
            benefit_programs(params, values, unit);
        }
    }

    fn run_stages(&mut self, params: &TaxParams, stages: &[Stage]) {
        for unit in self.records.units_mut() {
            for stage in stages {
                stage(params, unit);
            }
        }
    }

    /// Income tax pipeline with the standard-versus-itemized choice
    ///
    /// Tax through AMT is computed over the whole table once with the
    /// standard deduction and once with itemized deductions; each unit then
    /// keeps whichever gives lower `c05800` (ties go to the standard
    /// deduction) and the tax is recomputed before the credit stages.
    pub(crate) fn calc_one_year(&mut self, params: &TaxParams) {
        for unit in self.records.units_mut() {
            unit.set_filing_counts();
        }
        self.run_stages(params, &TO_STANDARD_DEDUCTION);

        let itemized: Vec<Itemized> = self.records.units().iter().map(Itemized::take).collect();
        let standard: Vec<f64> = self.records.units().iter().map(|u| u.standard).collect();

        for unit in self.records.units_mut() {
            Itemized::default().put(unit);
        }
        self.run_stages(params, &TAXINC_TO_AMT);
        let std_taxes: Vec<f64> = self.records.units().iter().map(|u| u.c05800).collect();

        for (unit, item) in self.records.units_mut().iter_mut().zip(&itemized) {
            item.put(unit);
            unit.standard = 0.0;
        }
        self.run_stages(params, &TAXINC_TO_AMT);

        let mut num_itemizers = 0usize;
        let units = self.records.units_mut();
        for (i, unit) in units.iter_mut().enumerate() {
            if unit.c05800 < std_taxes[i] {
                num_itemizers += 1;
                unit.standard = 0.0;
            } else {
                unit.standard = standard[i];
                Itemized::default().put(unit);
            }
        }
        debug!("{} of {} units itemize", num_itemizers, units.len());

        self.run_stages(params, &TAXINC_TO_AMT);
        self.run_stages(params, &CREDITS_TO_IITAX);
    }

    /// One variable across all filing units
    pub fn array(&self, name: &str) -> Result<Vec<f64>> {
        self.records.column(name)
    }

    pub fn set_array(&mut self, name: &str, values: &[f64]) -> Result<()> {
        self.records.set_column(name, values)
    }

    /// Add `values` elementwise to a variable
    pub fn incarray(&mut self, name: &str, values: &[f64]) -> Result<()> {
        let mut column = self.array(name)?;
        if column.len() != values.len() {
            return Err(TaxError::Schema(format!(
                "{} has {} values, increment has {}",
                name,
                column.len(),
                values.len()
            )));
        }
        for (v, add) in column.iter_mut().zip(values) {
            *v += add;
        }
        self.set_array(name, &column)
    }

    pub fn zeroarray(&mut self, name: &str) -> Result<()> {
        let zeros = vec![0.0; self.array_len()];
        self.set_array(name, &zeros)
    }

    /// Weighted sum of a variable using `s006`
    pub fn weighted_total(&self, name: &str) -> Result<f64> {
        let values = self.array(name)?;
        Ok(values
            .iter()
            .zip(self.records.units())
            .map(|(v, u)| v * u.s006)
            .sum())
    }

    pub fn total_weight(&self) -> f64 {
        self.records.units().iter().map(|u| u.s006).sum()
    }

    /// Number of people aged 65 or over in each unit
    pub fn n65(&self) -> Vec<f64> {
        self.records
            .units()
            .iter()
            .map(|u| {
                let head = if u.age_head >= 65.0 { 1.0 } else { 0.0 };
                let spouse = if u.age_spouse >= 65.0 { 1.0 } else { 0.0 };
                head + spouse + u.elderly_dependents
            })
            .collect()
    }

    /// Columns for the named variables
    pub fn dataframe(&self, names: &[&str]) -> Result<DataFrame> {
        let mut frame = DataFrame::default();
        for name in names {
            frame.push(name, self.array(name)?);
        }
        Ok(frame)
    }

    /// The variables summarized by distribution tables
    pub fn distribution_frame(&self) -> Result<DataFrame> {
        self.dataframe(&DIST_VARIABLES)
    }

    /// Every read and calculated variable
    pub fn dataframe_all(&self) -> Result<DataFrame> {
        let names: Vec<&str> = TaxUnit::READ_FIELDS
            .iter()
            .chain(TaxUnit::CALC_FIELDS.iter())
            .copied()
            .collect();
        self.dataframe(&names)
    }

    /// Snapshot the records so temporary changes can be undone
    pub fn store_records(&mut self) -> Result<()> {
        if self.stored_records.is_some() {
            return Err(TaxError::State("records are already stored".to_string()));
        }
        self.stored_records = Some(self.records.clone());
        Ok(())
    }

    /// Put back the records saved by [`Calculator::store_records`]
    pub fn restore_records(&mut self) -> Result<()> {
        match self.stored_records.take() {
            Some(saved) => {
                self.records = saved;
                Ok(())
            }
            None => Err(TaxError::State(
                "restore_records called without store_records".to_string(),
            )),
        }
    }

    /// Current-year value of a policy parameter, one entry per label
    pub fn policy_param(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.policy.vector(name)?.to_vec())
    }

    /// Overwrite a policy parameter for the current year only
    pub fn set_policy_param(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        self.policy.set_current(name, values)
    }

    pub fn consump_param(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.consumption.vector(name)?.to_vec())
    }

    pub fn consump_benval_params(&self) -> Result<BenefitValues> {
        self.consumption.benval_params()
    }

    /// Aggregate statistics for `num_years` years starting at the current
    /// one, computed on a copy so this calculator is unchanged
    pub fn diagnostic_table(&self, num_years: usize) -> Result<Vec<DiagnosticRow>> {
        let max_years = (self.policy.end_year() - self.current_year() + 1).max(0) as usize;
        if num_years < 1 || num_years > max_years {
            return Err(TaxError::State(format!(
                "num_years must be between 1 and {}, got {}",
                max_years, num_years
            )));
        }
        let mut calc = self.clone();
        let mut rows = Vec::with_capacity(num_years);
        for i in 0..num_years {
            calc.calc_all(false)?;
            rows.push(DiagnosticRow::from_units(calc.current_year(), calc.records.units()));
            if i + 1 < num_years {
                calc.increment_year()?;
            }
        }
        Ok(rows)
    }

    pub(crate) fn records_mut(&mut self) -> &mut Records {
        &mut self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::GrowFactors;
    use crate::parameters::Reform;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    fn unit(mars: f64, wages: f64) -> TaxUnit {
        let (p, s) = if mars == 2.0 {
            (wages / 2.0, wages / 2.0)
        } else {
            (wages, 0.0)
        };
        TaxUnit {
            RECID: 1.0,
            MARS: mars,
            XTOT: if mars == 2.0 { 2.0 } else { 1.0 },
            age_head: 40.0,
            age_spouse: if mars == 2.0 { 40.0 } else { 0.0 },
            e00200: wages,
            e00200p: p,
            e00200s: s,
            s006: 10.0,
            ..Default::default()
        }
    }

    fn calculator(units: Vec<TaxUnit>, year: i32) -> Calculator {
        let mut pol = Policy::new().unwrap();
        pol.set_year(year).unwrap();
        let recs = Records::new(units, year).unwrap();
        Calculator::new(pol, recs, None).unwrap()
    }

    #[test]
    fn test_new_syncs_years() {
        let mut pol = Policy::new().unwrap();
        pol.set_year(2022).unwrap();
        let recs = Records::new(vec![unit(1.0, 50000.0)], 2020).unwrap();
        let calc = Calculator::new(pol, recs, None).unwrap();
        assert_eq!(calc.current_year(), 2022);
        assert_eq!(calc.data_year(), 2020);
        assert_eq!(calc.records().current_year(), 2022);
        assert_eq!(calc.consumption().current_year(), 2022);
    }

    #[test]
    fn test_policy_moves_up_to_data_year() {
        let pol = Policy::new().unwrap();
        let recs = Records::new(vec![unit(1.0, 50000.0)], 2021).unwrap();
        let calc = Calculator::new(pol, recs, None).unwrap();
        assert_eq!(calc.current_year(), 2021);
    }

    #[test]
    fn test_advance_to_year() {
        let mut calc = calculator(vec![unit(1.0, 50000.0)], 2020);
        calc.advance_to_year(2023).unwrap();
        assert_eq!(calc.current_year(), 2023);
        assert_eq!(calc.records().current_year(), 2023);
        assert!(matches!(calc.advance_to_year(2021), Err(TaxError::State(_))));
        calc.advance_to_year(2023).unwrap();
    }

    #[test]
    fn test_increment_past_policy_window_leaves_years_aligned() {
        let mut table = include_str!("../../data/growfactors.csv").trim_end().to_string();
        let last = table.lines().last().unwrap().replacen("2035", "2036", 1);
        table.push('\n');
        table.push_str(&last);
        let gf = GrowFactors::from_reader(table.as_bytes()).unwrap();
        let mut pol = Policy::new().unwrap();
        pol.set_year(2035).unwrap();
        let recs = Records::from_units(vec![unit(1.0, 50000.0)], 2035, gf, None).unwrap();
        let mut calc = Calculator::new(pol, recs, None).unwrap();

        assert!(matches!(calc.increment_year(), Err(TaxError::OutOfRange { .. })));
        assert_eq!(calc.current_year(), 2035);
        assert_eq!(calc.records().current_year(), 2035);
        assert_eq!(calc.records().units()[0].e00200, 50000.0);
    }

    #[test]
    fn test_weighted_totals() {
        let mut calc = calculator(vec![unit(1.0, 50000.0), unit(2.0, 80000.0)], 2023);
        calc.calc_all(false).unwrap();
        assert_abs_diff_eq!(calc.total_weight(), 20.0);
        assert_abs_diff_eq!(
            calc.weighted_total("e00200").unwrap(),
            10.0 * 130000.0,
            epsilon = 1e-6
        );
        assert!(calc.weighted_total("nope").is_err());
    }

    #[test]
    fn test_array_helpers() {
        let mut calc = calculator(vec![unit(1.0, 50000.0), unit(1.0, 10000.0)], 2023);
        calc.incarray("e00300", &[5.0, 6.0]).unwrap();
        assert_eq!(calc.array("e00300").unwrap(), vec![5.0, 6.0]);
        calc.zeroarray("e00300").unwrap();
        assert_eq!(calc.array("e00300").unwrap(), vec![0.0, 0.0]);
        assert!(calc.incarray("e00300", &[1.0]).is_err());

        let frame = calc.dataframe(&["MARS", "e00200"]).unwrap();
        assert_eq!(frame.columns(), &["MARS".to_string(), "e00200".to_string()]);
        assert_eq!(frame.column("e00200").unwrap(), &[50000.0, 10000.0]);
        let dist = calc.distribution_frame().unwrap();
        assert_eq!(dist.num_columns(), DIST_VARIABLES.len());
        let all = calc.dataframe_all().unwrap();
        assert_eq!(
            all.num_columns(),
            TaxUnit::READ_FIELDS.len() + TaxUnit::CALC_FIELDS.len()
        );
    }

    #[test]
    fn test_n65_counts_people() {
        let mut u = unit(2.0, 0.0);
        u.age_head = 70.0;
        u.age_spouse = 64.0;
        u.elderly_dependents = 1.0;
        let calc = calculator(vec![u], 2023);
        assert_eq!(calc.n65(), vec![2.0]);
    }

    #[test]
    fn test_store_restore_state_errors() {
        let mut calc = calculator(vec![unit(1.0, 50000.0)], 2023);
        assert!(matches!(calc.restore_records(), Err(TaxError::State(_))));
        calc.store_records().unwrap();
        assert!(matches!(calc.store_records(), Err(TaxError::State(_))));
        calc.set_array("e00200", &[1.0]).unwrap();
        calc.restore_records().unwrap();
        assert_eq!(calc.array("e00200").unwrap(), vec![50000.0]);
    }

    #[test]
    fn test_policy_param_access() {
        let mut calc = calculator(vec![unit(1.0, 50000.0)], 2023);
        assert_eq!(calc.policy_param("STD").unwrap()[0], 13850.0);
        calc.set_policy_param("II_em", vec![1000.0]).unwrap();
        assert_eq!(calc.policy_param("II_em").unwrap(), vec![1000.0]);
        assert_eq!(calc.consump_param("MPC_e17500").unwrap(), vec![0.0]);
        assert!(calc.policy_param("no_such").is_err());
    }

    #[test]
    fn test_reform_raises_tax() {
        let mut pol = Policy::new().unwrap();
        let mut reform = Reform::new();
        reform
            .entry(2023)
            .or_default()
            .insert("II_rt2".to_string(), json!(0.15));
        pol.implement_reform(&reform).unwrap();
        pol.set_year(2023).unwrap();
        let recs = Records::new(vec![unit(1.0, 50000.0)], 2023).unwrap();
        let mut calc = Calculator::new(pol, recs, None).unwrap();
        calc.calc_all(false).unwrap();
        let tax = calc.array("iitax").unwrap()[0];
        assert_abs_diff_eq!(tax, 1100.0 + 0.15 * 25150.0, epsilon = 1e-6);
    }

    #[test]
    fn test_diagnostic_table_leaves_calculator_unchanged() {
        let calc = calculator(vec![unit(1.0, 50000.0), unit(2.0, 120000.0)], 2023);
        let rows = calc.diagnostic_table(2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].year, 2023);
        assert_eq!(rows[1].year, 2024);
        assert_abs_diff_eq!(rows[0].returns, 20.0 * 1e-6, epsilon = 1e-12);
        assert_eq!(calc.current_year(), 2023);
        assert_eq!(calc.array("iitax").unwrap(), vec![0.0, 0.0]);
        assert!(calc.diagnostic_table(0).is_err());
    }

    #[test]
    fn test_calc_all_rejects_misaligned_years() {
        let mut calc = calculator(vec![unit(1.0, 50000.0)], 2023);
        calc.policy.set_year(2024).unwrap();
        assert!(matches!(calc.calc_all(false), Err(TaxError::State(_))));
    }
}
