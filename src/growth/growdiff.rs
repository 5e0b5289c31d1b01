//! User-specified differences layered onto the growth factor table

use super::growfactors::{GrowFactors, VALID_NAMES};
use crate::error::Result;
use crate::parameters::policy::{JSON_START_YEAR, LAST_BUDGET_YEAR};
use crate::parameters::{IndexRates, Parameters, Reform};

/// Default path to the growth difference defaults
pub const DEFAULT_GROWDIFF_PATH: &str = "data/growdiff.json";

const GROWDIFF_JSON: &str = include_str!("../../data/growdiff.json");

/// One delta per growth factor series and year, zero unless revised
///
/// A delta set in some year carries forward to every later year, so applying
/// it scales each later year-over-year factor and the effect compounds in
/// the level of the aged variable.
#[derive(Debug, Clone)]
pub struct GrowDiff {
    params: Parameters,
}

impl GrowDiff {
    pub fn new() -> Result<Self> {
        let num_years = (LAST_BUDGET_YEAR - JSON_START_YEAR + 1) as usize;
        let params = Parameters::from_json_str(
            "GrowDiff",
            GROWDIFF_JSON,
            JSON_START_YEAR,
            LAST_BUDGET_YEAR,
            IndexRates::zeros(num_years),
        )?;
        Ok(Self { params })
    }

    /// Revise deltas, e.g. `{2021: {"AWAGE": 0.01}}`
    pub fn update_growdiff(&mut self, revision: &Reform) -> Result<()> {
        self.params.implement_reform(revision)
    }

    /// True when any delta is non-zero in any year
    pub fn has_any_response(&self) -> bool {
        self.params.names().any(|name| {
            (self.params.start_year()..=self.params.end_year()).any(|year| {
                self.params
                    .values_at(name, year)
                    .map(|v| v.iter().any(|d| *d != 0.0))
                    .unwrap_or(false)
            })
        })
    }

    /// Scale every factor by `1 + delta` for the years the deltas cover
    pub fn apply_to(&self, growfactors: &mut GrowFactors) -> Result<()> {
        for name in VALID_NAMES {
            for year in self.params.start_year()..=self.params.end_year() {
                let delta = self.params.values_at(name, year)?[0];
                if delta != 0.0 {
                    growfactors.scale(name, year, 1.0 + delta)?;
                }
            }
        }
        Ok(())
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn test_defaults_have_no_response() {
        let gd = GrowDiff::new().unwrap();
        assert!(!gd.has_any_response());
        let mut gf = GrowFactors::new().unwrap();
        let before = gf.clone();
        gd.apply_to(&mut gf).unwrap();
        assert_eq!(
            before.factor_value("AWAGE", 2025).unwrap(),
            gf.factor_value("AWAGE", 2025).unwrap()
        );
    }

    #[test]
    fn test_delta_compounds_from_start_year() {
        let mut gd = GrowDiff::new().unwrap();
        let mut rev = Reform::new();
        rev.entry(2020)
            .or_default()
            .insert("ADIVS".to_string(), json!(0.02));
        gd.update_growdiff(&rev).unwrap();
        assert!(gd.has_any_response());

        let base = GrowFactors::new().unwrap();
        let mut gf = GrowFactors::new().unwrap();
        gd.apply_to(&mut gf).unwrap();

        assert_eq!(
            gf.factor_value("ADIVS", 2019).unwrap(),
            base.factor_value("ADIVS", 2019).unwrap()
        );
        let mut level_base = 1.0;
        let mut level_new = 1.0;
        for year in 2020..=2022 {
            let b = base.factor_value("ADIVS", year).unwrap();
            let n = gf.factor_value("ADIVS", year).unwrap();
            assert_relative_eq!(n, b * 1.02, epsilon = 1e-12);
            level_base *= b;
            level_new *= n;
        }
        assert_relative_eq!(level_new / level_base, 1.02f64.powi(3), epsilon = 1e-12);
    }

    #[test]
    fn test_apply_after_use_is_refused() {
        let mut gd = GrowDiff::new().unwrap();
        let mut rev = Reform::new();
        rev.entry(2020)
            .or_default()
            .insert("AWAGE".to_string(), json!(0.01));
        gd.update_growdiff(&rev).unwrap();
        let mut gf = GrowFactors::new().unwrap();
        gf.wage_growth_rates(2013, 2020).unwrap();
        assert!(gd.apply_to(&mut gf).is_err());
    }
}
