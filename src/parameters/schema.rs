//! JSON parameter definitions
//!
//! Mirrors the layout of `policy_current_law.json`, `consumption.json` and
//! `growdiff.json`: a top-level object keyed by parameter name whose entries
//! carry metadata plus a list of `{year, [label], value}` records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared value type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Int,
    Float,
    Bool,
    Str,
}

/// Series used to extrapolate a parameter past its last known year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indexing {
    #[default]
    None,
    Price,
    Wage,
}

/// What to do when a reform value falls outside `valid_values`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidAction {
    #[default]
    Stop,
    Warn,
}

/// Enumerated label a vector parameter is indexed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelDim {
    /// Filing status, indexed by `MARS - 1`
    Mars,
    /// Number of EITC-qualifying children, indexed by `EIC`
    Eic,
    /// Itemized deduction category
    IdedType,
}

const MARS_LABELS: [&str; 5] = ["single", "mjoint", "mseparate", "headhh", "widow"];
const EIC_LABELS: [&str; 4] = ["0kids", "1kid", "2kids", "3+kids"];
const IDEDTYPE_LABELS: [&str; 7] = ["med", "sltx", "retx", "cas", "misc", "int", "char"];

impl LabelDim {
    /// Key used for the label inside a value entry
    pub fn key(&self) -> &'static str {
        match self {
            LabelDim::Mars => "MARS",
            LabelDim::Eic => "EIC",
            LabelDim::IdedType => "idedtype",
        }
    }

    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            LabelDim::Mars => &MARS_LABELS,
            LabelDim::Eic => &EIC_LABELS,
            LabelDim::IdedType => &IDEDTYPE_LABELS,
        }
    }

    pub fn size(&self) -> usize {
        self.labels().len()
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "MARS" => Some(LabelDim::Mars),
            "EIC" => Some(LabelDim::Eic),
            "idedtype" => Some(LabelDim::IdedType),
            _ => None,
        }
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels().iter().position(|l| *l == label)
    }
}

/// Lower or upper validity bound: a literal or the name of another parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Number(f64),
    Param(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidValues {
    #[serde(default)]
    pub min: Option<Bound>,
    #[serde(default)]
    pub max: Option<Bound>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompatibleData {
    #[serde(default)]
    pub puf: bool,
    #[serde(default)]
    pub cps: bool,
}

/// One `{year, [label], value}` record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueEntry {
    pub year: i32,
    pub value: serde_json::Value,
    /// Label key/value pairs such as `"MARS": "single"`
    #[serde(flatten)]
    pub labels: BTreeMap<String, serde_json::Value>,
}

/// A parameter definition as it appears in a defaults file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub indexing: Option<Indexing>,
    #[serde(default)]
    pub value_yrs: Vec<i32>,
    pub value: Vec<ValueEntry>,
    #[serde(default)]
    pub valid_values: Option<ValidValues>,
    #[serde(default)]
    pub invalid_action: InvalidAction,
    #[serde(default)]
    pub compatible_data: Option<CompatibleData>,
}

impl ParamSpec {
    /// Label dimension inferred from the keys used in the value entries
    pub fn label_dim(&self) -> Result<Option<LabelDim>, String> {
        let mut dim = None;
        for entry in &self.value {
            for key in entry.labels.keys() {
                let found = LabelDim::from_key(key)
                    .ok_or_else(|| format!("unknown label '{}'", key))?;
                match dim {
                    None => dim = Some(found),
                    Some(d) if d == found => {}
                    Some(d) => {
                        return Err(format!(
                            "mixes labels '{}' and '{}'",
                            d.key(),
                            found.key()
                        ))
                    }
                }
            }
        }
        Ok(dim)
    }
}

/// Contents of a defaults file keyed by parameter name
pub type ParamFile = BTreeMap<String, ParamSpec>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vector_spec() {
        let json = r#"{
            "title": "Standard deduction",
            "type": "float",
            "indexed": true,
            "value": [
                {"year": 2013, "MARS": "single", "value": 6100},
                {"year": 2013, "MARS": "mjoint", "value": 12200}
            ],
            "valid_values": {"min": 0, "max": "STD_max"}
        }"#;
        let spec: ParamSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.param_type, ParamType::Float);
        assert_eq!(spec.label_dim().unwrap(), Some(LabelDim::Mars));
        let valid = spec.valid_values.unwrap();
        assert_eq!(valid.min, Some(Bound::Number(0.0)));
        assert_eq!(valid.max, Some(Bound::Param("STD_max".to_string())));
        assert_eq!(spec.invalid_action, InvalidAction::Stop);
    }

    #[test]
    fn test_unknown_label_rejected() {
        let json = r#"{
            "title": "x", "type": "float",
            "value": [{"year": 2013, "kids": "one", "value": 1}]
        }"#;
        let spec: ParamSpec = serde_json::from_str(json).unwrap();
        assert!(spec.label_dim().is_err());
    }

    #[test]
    fn test_label_positions() {
        assert_eq!(LabelDim::Mars.position("headhh"), Some(3));
        assert_eq!(LabelDim::Eic.position("3+kids"), Some(3));
        assert_eq!(LabelDim::IdedType.size(), 7);
        assert_eq!(LabelDim::from_key("EIC"), Some(LabelDim::Eic));
    }
}
