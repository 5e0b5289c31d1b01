//! Record variable metadata
//!
//! `records_variables.json` lists every variable an input table may carry
//! (`read`) and every variable the pipeline sets (`calc`), with its type,
//! description and, for read variables, the growth factor used when aging.

use super::unit::TaxUnit;
use crate::error::{Result, TaxError};
use crate::growth::growfactors::VALID_NAMES;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Default path to the record variable metadata
pub const DEFAULT_METADATA_PATH: &str = "data/records_variables.json";

const RECORDS_VARIABLES_JSON: &str = include_str!("../../data/records_variables.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    Int,
    Float,
}

/// Description of one record variable
#[derive(Debug, Clone, Deserialize)]
pub struct VarInfo {
    #[serde(rename = "type")]
    pub var_type: VarType,
    pub desc: String,
    #[serde(default)]
    pub form: BTreeMap<String, String>,
    #[serde(default)]
    pub availability: String,
    /// Must be present in every input table
    #[serde(default)]
    pub required: bool,
    /// Growth factor applied when the record is aged one year
    #[serde(default)]
    pub growfactor: Option<String>,
    /// Growth factor used instead when the value is negative
    #[serde(default)]
    pub growfactor_neg: Option<String>,
    /// Calculated once at construction and never reset
    #[serde(default)]
    pub fixed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordsMetadata {
    pub read: BTreeMap<String, VarInfo>,
    pub calc: BTreeMap<String, VarInfo>,
}

impl RecordsMetadata {
    /// Metadata bundled with the crate
    pub fn new() -> Result<Self> {
        Self::from_json_str(RECORDS_VARIABLES_JSON)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Parse and check every name against [`TaxUnit`] and every growth
    /// factor against the known series
    pub fn from_json_str(json: &str) -> Result<Self> {
        let meta: RecordsMetadata = serde_json::from_str(json)?;
        let mut problems = Vec::new();
        for name in meta.read.keys() {
            if !TaxUnit::READ_FIELDS.contains(&name.as_str()) {
                problems.push(format!("read variable {} is not a TaxUnit input", name));
            }
        }
        for name in meta.calc.keys() {
            if !TaxUnit::CALC_FIELDS.contains(&name.as_str()) {
                problems.push(format!("calc variable {} is not a TaxUnit output", name));
            }
        }
        for (name, info) in &meta.read {
            for factor in info.growfactor.iter().chain(info.growfactor_neg.iter()) {
                if !VALID_NAMES.contains(&factor.as_str()) {
                    problems.push(format!("{} uses unknown growth factor {}", name, factor));
                }
            }
        }
        if !problems.is_empty() {
            return Err(TaxError::Schema(problems.join("; ")));
        }
        Ok(meta)
    }

    pub fn required_vars(&self) -> impl Iterator<Item = &str> {
        self.read
            .iter()
            .filter(|(_, info)| info.required)
            .map(|(name, _)| name.as_str())
    }

    pub fn is_integer(&self, name: &str) -> bool {
        self.read
            .get(name)
            .or_else(|| self.calc.get(name))
            .map(|info| info.var_type == VarType::Int)
            .unwrap_or(false)
    }

    /// Calculated variables reset before each pipeline run
    pub fn changing_calc_vars(&self) -> impl Iterator<Item = &str> {
        self.calc
            .iter()
            .filter(|(_, info)| !info.fixed)
            .map(|(name, _)| name.as_str())
    }

    /// Read variables aged with a growth factor, with the factor for
    /// non-negative values and the one for negative values
    pub fn aged_vars(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.read.iter().filter_map(|(name, info)| {
            info.growfactor.as_deref().map(|pos| {
                let neg = info.growfactor_neg.as_deref().unwrap_or(pos);
                (name.as_str(), pos, neg)
            })
        })
    }

    pub fn describe(&self, name: &str) -> Option<&VarInfo> {
        self.read.get(name).or_else(|| self.calc.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_metadata_matches_tax_unit() {
        let meta = RecordsMetadata::new().unwrap();
        assert_eq!(meta.read.len(), TaxUnit::READ_FIELDS.len());
        assert_eq!(meta.calc.len(), TaxUnit::CALC_FIELDS.len());
        for name in TaxUnit::READ_FIELDS {
            assert!(meta.read.contains_key(*name), "{} missing from read", name);
        }
        for name in TaxUnit::CALC_FIELDS {
            assert!(meta.calc.contains_key(*name), "{} missing from calc", name);
        }
    }

    #[test]
    fn test_required_and_types() {
        let meta = RecordsMetadata::new().unwrap();
        let required: Vec<&str> = meta.required_vars().collect();
        assert_eq!(required, vec!["MARS", "RECID"]);
        assert!(meta.is_integer("MARS"));
        assert!(meta.is_integer("sep"));
        assert!(!meta.is_integer("e00200"));
    }

    #[test]
    fn test_fixed_vars_are_not_changing() {
        let meta = RecordsMetadata::new().unwrap();
        let changing: Vec<&str> = meta.changing_calc_vars().collect();
        assert!(!changing.contains(&"sep"));
        assert!(!changing.contains(&"num"));
        assert!(changing.contains(&"iitax"));
    }

    #[test]
    fn test_sign_dependent_growth() {
        let meta = RecordsMetadata::new().unwrap();
        let e00900 = meta.aged_vars().find(|(n, _, _)| *n == "e00900").unwrap();
        assert_eq!(e00900, ("e00900", "ASCHCI", "ASCHCL"));
        let e00200 = meta.aged_vars().find(|(n, _, _)| *n == "e00200").unwrap();
        assert_eq!(e00200, ("e00200", "AWAGE", "AWAGE"));
        assert!(meta.aged_vars().all(|(n, _, _)| n != "MARS"));
    }

    #[test]
    fn test_unknown_names_rejected() {
        let json = r#"{"read": {"bogus": {"type": "float", "desc": "x"}}, "calc": {}}"#;
        assert!(matches!(
            RecordsMetadata::from_json_str(json),
            Err(TaxError::Schema(_))
        ));
        let json = r#"{"read": {"e00200": {"type": "float", "desc": "x", "growfactor": "AXYZ"}},
                       "calc": {}}"#;
        assert!(RecordsMetadata::from_json_str(json).is_err());
    }
}
