//! Consumption response parameters
//!
//! Marginal propensities to consume (`MPC_*`) move deductible expenses when
//! income changes during marginal tax rate calculations, and benefit value
//! ratios (`BEN_*_value`) set the consumption value of in-kind benefits.

use super::policy::{JSON_START_YEAR, LAST_BUDGET_YEAR};
use super::{IndexRates, Parameters};
use crate::error::Result;
use crate::records::Records;
use std::ops::{Deref, DerefMut};

const CONSUMPTION_JSON: &str = include_str!("../../data/consumption.json");

/// Expense variables that respond to a change in income
pub const RESPONSE_VARS: [&str; 4] = ["e17500", "e18400", "e19800", "e20400"];

/// In-kind benefits whose consumption value may be below their cost
pub const BENEFIT_VARS: [&str; 8] = [
    "housing", "snap", "tanf", "vet", "wic", "mcare", "mcaid", "other",
];

/// Consumption value per dollar of government cost for each in-kind benefit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenefitValues {
    pub housing: f64,
    pub snap: f64,
    pub tanf: f64,
    pub vet: f64,
    pub wic: f64,
    pub mcare: f64,
    pub mcaid: f64,
    pub other: f64,
}

#[derive(Debug, Clone)]
pub struct Consumption(Parameters);

impl Consumption {
    pub fn new() -> Result<Self> {
        let num_years = (LAST_BUDGET_YEAR - JSON_START_YEAR + 1) as usize;
        let params = Parameters::from_json_str(
            "Consumption",
            CONSUMPTION_JSON,
            JSON_START_YEAR,
            LAST_BUDGET_YEAR,
            IndexRates::zeros(num_years),
        )?;
        Ok(Self(params))
    }

    /// True when any MPC is positive or any benefit is valued below cost
    pub fn has_response(&self) -> Result<bool> {
        for var in RESPONSE_VARS {
            if self.scalar(&format!("MPC_{}", var))? > 0.0 {
                return Ok(true);
            }
        }
        for var in BENEFIT_VARS {
            if self.scalar(&format!("BEN_{}_value", var))? < 1.0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Add `MPC * income_change` to each responsive expense column
    pub fn response(&self, records: &mut Records, income_change: &[f64]) -> Result<()> {
        for var in RESPONSE_VARS {
            let mpc = self.scalar(&format!("MPC_{}", var))?;
            if mpc == 0.0 {
                continue;
            }
            for (unit, change) in records.units_mut().iter_mut().zip(income_change) {
                if let Some(v) = unit.get_mut(var) {
                    *v += mpc * change;
                }
            }
        }
        Ok(())
    }

    pub fn benval_params(&self) -> Result<BenefitValues> {
        let get = |var: &str| self.scalar(&format!("BEN_{}_value", var));
        Ok(BenefitValues {
            housing: get("housing")?,
            snap: get("snap")?,
            tanf: get("tanf")?,
            vet: get("vet")?,
            wic: get("wic")?,
            mcare: get("mcare")?,
            mcaid: get("mcaid")?,
            other: get("other")?,
        })
    }
}

impl Deref for Consumption {
    type Target = Parameters;

    fn deref(&self) -> &Parameters {
        &self.0
    }
}

impl DerefMut for Consumption {
    fn deref_mut(&mut self) -> &mut Parameters {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Reform;
    use serde_json::json;

    #[test]
    fn test_defaults_have_no_response() {
        let con = Consumption::new().unwrap();
        assert!(!con.has_response().unwrap());
        let ben = con.benval_params().unwrap();
        assert_eq!(ben.snap, 1.0);
        assert_eq!(ben.mcaid, 1.0);
    }

    #[test]
    fn test_mpc_revision_creates_response() {
        let mut con = Consumption::new().unwrap();
        let mut rev = Reform::new();
        rev.entry(2015)
            .or_default()
            .insert("MPC_e17500".to_string(), json!(0.2));
        con.implement_reform(&rev).unwrap();
        con.set_year(2014).unwrap();
        assert!(!con.has_response().unwrap());
        con.set_year(2016).unwrap();
        assert!(con.has_response().unwrap());
    }

    #[test]
    fn test_benefit_value_below_one_is_response() {
        let mut con = Consumption::new().unwrap();
        let mut rev = Reform::new();
        rev.entry(2013)
            .or_default()
            .insert("BEN_snap_value".to_string(), json!(0.8));
        con.implement_reform(&rev).unwrap();
        assert!(con.has_response().unwrap());
        assert_eq!(con.benval_params().unwrap().snap, 0.8);
    }

    #[test]
    fn test_mpc_out_of_range_rejected() {
        let mut con = Consumption::new().unwrap();
        let mut rev = Reform::new();
        rev.entry(2015)
            .or_default()
            .insert("MPC_e19800".to_string(), json!(1.5));
        assert!(con.implement_reform(&rev).is_err());
    }
}
