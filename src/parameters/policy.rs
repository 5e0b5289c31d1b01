//! Federal tax policy parameters
//!
//! Current law is read from `policy_current_law.json` and indexed with the
//! CPI-U and average wage series of a [`GrowFactors`] table.

use super::{IndexRates, Parameters, Translation};
use crate::error::Result;
use crate::growth::GrowFactors;
use std::ops::{Deref, DerefMut};
use std::path::Path;

/// First year covered by the current-law file
pub const JSON_START_YEAR: i32 = 2013;

/// Last year of the budget window parameters are extrapolated through
pub const LAST_BUDGET_YEAR: i32 = 2035;

/// Default path to the current-law file
pub const DEFAULT_POLICY_PATH: &str = "data/policy_current_law.json";

const CURRENT_LAW_JSON: &str = include_str!("../../data/policy_current_law.json");

/// Obsolete names recognized in reforms
fn translations() -> Vec<Translation> {
    vec![
        Translation::Alias {
            old: "AMED_trt",
            new: "AMEDT_rt",
        },
        Translation::Alias {
            old: "AMED_thd",
            new: "AMEDT_ec",
        },
        Translation::Renamed {
            old: "CTC_c_under5_bonus",
            new: "CTC_c_under6_bonus",
        },
        Translation::Renamed {
            old: "DependentCredit_c",
            new: "ODC_c",
        },
        Translation::Removed {
            name: "ALD_InvInc_ec_base_RyanBrady",
            reason: "the Ryan-Brady investment income base is no longer modeled",
        },
        Translation::Removed {
            name: "FEI_ec_c",
            reason: "foreign earned income exclusion is handled in the input data",
        },
    ]
}

/// Policy parameters for `[JSON_START_YEAR, LAST_BUDGET_YEAR]`
#[derive(Debug, Clone)]
pub struct Policy(Parameters);

impl Policy {
    /// Current law indexed with the bundled growth factors
    pub fn new() -> Result<Self> {
        Self::with_growfactors(&GrowFactors::new()?)
    }

    /// Current law indexed with the given growth factors
    pub fn with_growfactors(growfactors: &GrowFactors) -> Result<Self> {
        Self::from_json_str(CURRENT_LAW_JSON, growfactors)
    }

    /// Load current law from a file instead of the bundled copy
    pub fn from_path<P: AsRef<Path>>(path: P, growfactors: &GrowFactors) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json, growfactors)
    }

    pub fn from_json_str(json: &str, growfactors: &GrowFactors) -> Result<Self> {
        let rates = IndexRates {
            price: growfactors.price_inflation_rates(JSON_START_YEAR, LAST_BUDGET_YEAR)?,
            wage: growfactors.wage_growth_rates(JSON_START_YEAR, LAST_BUDGET_YEAR)?,
        };
        let params =
            Parameters::from_json_str("Policy", json, JSON_START_YEAR, LAST_BUDGET_YEAR, rates)?
                .with_translations(translations());
        Ok(Self(params))
    }

    pub fn into_inner(self) -> Parameters {
        self.0
    }
}

impl Deref for Policy {
    type Target = Parameters;

    fn deref(&self) -> &Parameters {
        &self.0
    }
}

impl DerefMut for Policy {
    fn deref_mut(&mut self) -> &mut Parameters {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaxError;
    use crate::parameters::Reform;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    #[test]
    fn test_current_law_2023_values() {
        let mut pol = Policy::new().unwrap();
        pol.set_year(2023).unwrap();
        let std: [f64; 5] = pol.array("STD").unwrap();
        assert_eq!(std, [13850.0, 27700.0, 13850.0, 20800.0, 27700.0]);
        assert_eq!(pol.scalar("II_rt7").unwrap(), 0.37);
        assert_eq!(pol.scalar("SS_Earnings_c").unwrap(), 160200.0);
        let eitc: [f64; 4] = pol.array("EITC_c").unwrap();
        assert_eq!(eitc, [600.0, 3995.0, 6604.0, 7430.0]);
    }

    #[test]
    fn test_every_year_slice_is_populated() {
        let pol = Policy::new().unwrap();
        for name in pol.names() {
            let p = pol.param(name).unwrap();
            if p.is_text() {
                continue;
            }
            for year in JSON_START_YEAR..=LAST_BUDGET_YEAR {
                let values = pol.values_at(name, year).unwrap();
                assert_eq!(values.len(), p.width(), "{} {}", name, year);
                assert!(values.iter().all(|v| v.is_finite()), "{} {}", name, year);
            }
        }
    }

    #[test]
    fn test_empty_reform_matches_current_law() {
        let base = Policy::new().unwrap();
        let mut pol = Policy::new().unwrap();
        pol.implement_reform(&Reform::new()).unwrap();
        for name in base.names().filter(|n| !base.param(n).unwrap().is_text()) {
            for year in JSON_START_YEAR..=LAST_BUDGET_YEAR {
                assert_eq!(
                    base.values_at(name, year).unwrap(),
                    pol.values_at(name, year).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_indexed_parameter_grows_past_last_known_year() {
        let gf = GrowFactors::new().unwrap();
        let pol = Policy::with_growfactors(&gf).unwrap();
        let rates = gf.price_inflation_rates(JSON_START_YEAR, LAST_BUDGET_YEAR).unwrap();
        let last = pol.param("STD").unwrap().last_known_year;
        let k = (last - JSON_START_YEAR) as usize;
        let v0 = pol.values_at("STD", last).unwrap()[0];
        let v1 = pol.values_at("STD", last + 1).unwrap()[0];
        assert_abs_diff_eq!(v1, ((v0 * (1.0 + rates[k])) * 100.0).round() / 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_obsolete_names() {
        let mut pol = Policy::new().unwrap();
        let mut reform = Reform::new();
        reform
            .entry(2020)
            .or_default()
            .insert("AMED_trt".to_string(), json!(0.01));
        pol.implement_reform(&reform).unwrap();
        pol.set_year(2020).unwrap();
        assert_eq!(pol.scalar("AMEDT_rt").unwrap(), 0.01);
        assert!(!pol.parameter_warnings().is_empty());

        let mut reform = Reform::new();
        reform
            .entry(2020)
            .or_default()
            .insert("DependentCredit_c".to_string(), json!(600));
        match pol.implement_reform(&reform) {
            Err(TaxError::RenamedParameter { new, .. }) => assert_eq!(new, "ODC_c"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_raising_referenced_threshold_breaks_dependent() {
        let mut pol = Policy::new().unwrap();
        let mut reform = Reform::new();
        reform
            .entry(2023)
            .or_default()
            .insert("SS_thd1".to_string(), json!(vec![100000; 5]));
        match pol.implement_reform(&reform) {
            Err(TaxError::Validation(msgs)) => {
                assert!(msgs.iter().all(|m| m.contains("SS_thd2")));
                assert!(!msgs.is_empty());
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        pol.set_year(2023).unwrap();
        let thd1: [f64; 5] = pol.array("SS_thd1").unwrap();
        assert_eq!(thd1, [25000.0, 32000.0, 0.0, 25000.0, 25000.0]);
    }

    #[test]
    fn test_reform_outside_window() {
        let mut pol = Policy::new().unwrap();
        let mut reform = Reform::new();
        reform
            .entry(2040)
            .or_default()
            .insert("II_em".to_string(), json!(1000));
        assert!(matches!(
            pol.implement_reform(&reform),
            Err(TaxError::OutOfRange { .. })
        ));
    }
}
