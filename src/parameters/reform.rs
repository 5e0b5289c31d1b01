//! Reform parsing and application
//!
//! A reform maps years to `{parameter name: value}` provisions. Application
//! validates names, types and shapes, splices values into a staged copy,
//! re-extrapolates forward from each provision year and finally checks the
//! declared ranges. Range problems are collected across the whole reform and
//! reported together; the registry is only replaced when none are fatal.

use super::{coerce, Coerced, Indexing, Parameters, ParamType, Bound, InvalidAction, CPI_OFFSET_NAME};
use crate::error::{Result, TaxError};
use log::{info, warn};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Year → parameter name → raw JSON value
pub type Reform = BTreeMap<i32, BTreeMap<String, Value>>;

/// Entry in the table of obsolete parameter names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translation {
    /// Old name is rejected; the message points at the replacement
    Renamed { old: &'static str, new: &'static str },
    /// Old name is accepted and mapped onto the new one with a warning
    Alias { old: &'static str, new: &'static str },
    /// Parameter no longer exists
    Removed { name: &'static str, reason: &'static str },
}

#[derive(Debug, Clone, Default)]
struct PendingEdit {
    values: Option<Vec<Coerced>>,
    toggle: Option<bool>,
}

impl Parameters {
    /// Apply a multi-year reform
    ///
    /// Provisions are applied in ascending year order. For each provision the
    /// value is written at its year and every later year is re-extrapolated
    /// with the parameter's indexing status, which a `<name>-indexed` entry
    /// may switch. A change to `parameter_indexing_CPI_offset` in a year is
    /// applied before the other provisions of that year and re-extrapolates
    /// every price-indexed parameter.
    pub fn implement_reform(&mut self, reform: &Reform) -> Result<()> {
        self.errors.clear();
        if reform.values().all(|mods| mods.is_empty()) {
            return Ok(());
        }
        for &year in reform.keys() {
            self.year_index(year)?;
        }

        let mut warnings = Vec::new();
        let mut edits: BTreeMap<i32, BTreeMap<String, PendingEdit>> = BTreeMap::new();
        for (&year, mods) in reform {
            for (raw_name, value) in mods {
                let (name, is_toggle) = self.resolve_name(raw_name, &mut warnings)?;
                let shaped = if is_toggle {
                    None
                } else {
                    Some(self.shape_values(&name, value)?)
                };
                let edit = edits
                    .entry(year)
                    .or_default()
                    .entry(name.clone())
                    .or_default();
                match shaped {
                    Some(values) => edit.values = Some(values),
                    None => {
                        let flag = value.as_bool().ok_or_else(|| {
                            TaxError::Schema(format!(
                                "{}: indexing switch must be true or false, found {}",
                                raw_name, value
                            ))
                        })?;
                        edit.toggle = Some(flag);
                    }
                }
            }
        }

        let mut staged = self.clone();
        for (&year, year_edits) in &edits {
            if let Some(edit) = year_edits.get(CPI_OFFSET_NAME) {
                staged.apply_edit(year, CPI_OFFSET_NAME, edit)?;
                staged.reindex_price_params(year);
            }
            for (name, edit) in year_edits {
                if name != CPI_OFFSET_NAME {
                    staged.apply_edit(year, name, edit)?;
                }
            }
        }

        let mut errors = Vec::new();
        for (&year, year_edits) in &edits {
            let mut checked: Vec<&str> = Vec::new();
            for (name, edit) in year_edits {
                if edit.values.is_some() {
                    staged.check_range(year, name, &mut errors, &mut warnings)?;
                    checked.push(name);
                }
            }
            // parameters bounded by a reformed one, even when not named themselves
            for dependent in staged.bounded_by(year_edits.keys()) {
                if !checked.contains(&dependent.as_str()) {
                    staged.check_range(year, &dependent, &mut errors, &mut warnings)?;
                }
            }
        }

        for w in &warnings {
            warn!("{}: {}", self.group, w);
        }
        self.warnings.extend(warnings);

        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(TaxError::Validation(errors));
        }

        staged.warnings = self.warnings.clone();
        staged.errors.clear();
        staged.current_year = self.current_year;
        *self = staged;
        info!(
            "{}: implemented reform covering years {:?}",
            self.group,
            edits.keys().collect::<Vec<_>>()
        );
        Ok(())
    }

    /// Map a reform key onto a parameter name and whether it is an indexing switch
    fn resolve_name(&self, raw: &str, warnings: &mut Vec<String>) -> Result<(String, bool)> {
        if let Some(root) = raw.strip_suffix("-indexed") {
            self.param(root)?;
            return Ok((root.to_string(), true));
        }
        if let Some(root) = raw.strip_suffix("_cpi") {
            if self.contains(root) {
                warnings.push(format!(
                    "{} uses the deprecated _cpi suffix; use {}-indexed",
                    raw, root
                ));
                return Ok((root.to_string(), true));
            }
        }
        if self.contains(raw) {
            return Ok((raw.to_string(), false));
        }
        for t in self.translations() {
            match *t {
                Translation::Renamed { old, new } if old == raw => {
                    return Err(TaxError::RenamedParameter {
                        old: old.to_string(),
                        new: new.to_string(),
                    })
                }
                Translation::Alias { old, new } if old == raw => {
                    warnings.push(format!("{} is obsolete and was read as {}", old, new));
                    return Ok((new.to_string(), false));
                }
                Translation::Removed { name, reason } if name == raw => {
                    return Err(TaxError::RemovedParameter {
                        name: name.to_string(),
                        reason: reason.to_string(),
                    })
                }
                _ => {}
            }
        }
        Err(self.unknown(raw))
    }

    /// Coerce a reform value to the parameter's type and label width
    fn shape_values(&self, name: &str, value: &Value) -> Result<Vec<Coerced>> {
        let p = self.param(name)?;
        let width = p.width();
        match value {
            Value::Array(items) if p.dim.is_some() || items.len() == 1 => {
                if items.len() != width {
                    return Err(TaxError::Schema(format!(
                        "{}: expected {} values, found {}",
                        name,
                        width,
                        items.len()
                    )));
                }
                items.iter().map(|v| coerce(name, p.param_type, v)).collect()
            }
            Value::Array(_) => Err(TaxError::Schema(format!(
                "{}: scalar parameter given a list",
                name
            ))),
            scalar => {
                let c = coerce(name, p.param_type, scalar)?;
                Ok(vec![c; width])
            }
        }
    }

    fn apply_edit(&mut self, year: i32, name: &str, edit: &PendingEdit) -> Result<()> {
        let idx = self.year_index(year)?;
        let kind = self.param(name)?.index_kind;
        let rates = self.rates_for(kind);
        let p = self.param_mut(name)?;
        if let Some(flag) = edit.toggle {
            if matches!(p.param_type, ParamType::Bool | ParamType::Str) {
                return Err(TaxError::Schema(format!(
                    "{} is a {:?} parameter and cannot be indexed",
                    name, p.param_type
                )));
            }
            p.indexed = flag;
        }
        if let Some(values) = &edit.values {
            for (j, v) in values.iter().enumerate() {
                match v {
                    Coerced::Num(x) => p.values[idx][j] = *x,
                    Coerced::Text(s) => p.text[idx] = s.clone(),
                }
            }
        }
        p.last_known_year = year;
        p.fill_forward(idx, &rates);
        Ok(())
    }

    /// Re-extrapolate price-indexed parameters after a CPI offset change
    fn reindex_price_params(&mut self, year: i32) {
        let price = self.price_rates();
        let start = self.start_year;
        for p in self.params.values_mut() {
            if p.indexed && p.index_kind == Indexing::Price && !p.is_text() {
                let from = year.max(p.last_known_year);
                p.fill_forward((from - start) as usize, &price);
            }
        }
    }

    /// Names of parameters whose min or max refers to one of `changed`
    fn bounded_by<'a, I>(&self, changed: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let changed: Vec<&String> = changed.into_iter().collect();
        let refers = |b: &Option<Bound>| {
            matches!(b, Some(Bound::Param(other)) if changed.iter().any(|c| *c == other))
        };
        self.params
            .iter()
            .filter(|(_, p)| refers(&p.valid.min) || refers(&p.valid.max))
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn bound_value(&self, bound: &Bound, year: i32, j: usize, width: usize) -> Result<f64> {
        match bound {
            Bound::Number(x) => Ok(*x),
            Bound::Param(other) => {
                let values = self.values_at(other, year)?;
                if values.len() == width {
                    Ok(values[j])
                } else {
                    values.first().copied().ok_or_else(|| {
                        TaxError::Schema(format!("bound parameter {} has no values", other))
                    })
                }
            }
        }
    }

    fn check_range(
        &self,
        year: i32,
        name: &str,
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        let p = self.param(name)?;
        if matches!(p.param_type, ParamType::Bool | ParamType::Str) {
            return Ok(());
        }
        let values = self.values_at(name, year)?;
        let width = p.width();
        for (j, &v) in values.iter().enumerate() {
            let label = p
                .dim
                .map(|d| format!("[{}]", d.labels()[j]))
                .unwrap_or_default();
            let mut problems = Vec::new();
            if let Some(min) = &p.valid.min {
                let m = self.bound_value(min, year, j, width)?;
                if v < m {
                    problems.push(format!("{} {}{} value {} < min {}", year, name, label, v, m));
                }
            }
            if let Some(max) = &p.valid.max {
                let m = self.bound_value(max, year, j, width)?;
                if v > m {
                    problems.push(format!("{} {}{} value {} > max {}", year, name, label, v, m));
                }
            }
            match p.invalid_action {
                InvalidAction::Stop => errors.extend(problems),
                InvalidAction::Warn => warnings.extend(problems),
            }
        }
        Ok(())
    }
}

fn year_map_to_reform(map: &Map<String, Value>, what: &str) -> Result<Reform> {
    let mut reform = Reform::new();
    for (name, by_year) in map {
        let by_year = by_year.as_object().ok_or_else(|| {
            TaxError::Schema(format!(
                "{}: {} must map years to values, found {}",
                what, name, by_year
            ))
        })?;
        for (year, value) in by_year {
            let year: i32 = year.trim().parse().map_err(|_| {
                TaxError::Schema(format!("{}: {} has non-integer year '{}'", what, name, year))
            })?;
            reform
                .entry(year)
                .or_default()
                .insert(name.clone(), value.clone());
        }
    }
    Ok(reform)
}

const ASSUMPTION_KEYS: [&str; 3] = ["consumption", "growdiff_baseline", "growdiff_response"];

/// Parse a reform given as `{"name": {"year": value}}`, optionally wrapped
/// in `{"policy": ...}`
pub fn reform_from_json(text: &str) -> Result<Reform> {
    let root: Value = serde_json::from_str(text)?;
    let obj = root
        .as_object()
        .ok_or_else(|| TaxError::Schema("reform must be a JSON object".to_string()))?;
    let inner = match obj.get("policy") {
        Some(Value::Object(policy)) if obj.len() == 1 => policy,
        Some(_) => {
            return Err(TaxError::Schema(
                "policy key must hold the only object in a reform".to_string(),
            ))
        }
        None => obj,
    };
    if let Some(key) = inner.keys().find(|k| ASSUMPTION_KEYS.contains(&k.as_str())) {
        return Err(TaxError::Schema(format!(
            "reform contains assumption key '{}'",
            key
        )));
    }
    year_map_to_reform(inner, "policy")
}

/// Parsed user inputs: a policy reform plus economic assumptions
#[derive(Debug, Clone, Default)]
pub struct ParamInputs {
    pub policy: Reform,
    pub consumption: Reform,
    pub growdiff_baseline: Reform,
    pub growdiff_response: Reform,
}

fn json_text(source: &str) -> Result<String> {
    let trimmed = source.trim();
    if trimmed.starts_with('{') {
        return Ok(trimmed.to_string());
    }
    let path = Path::new(trimmed);
    if path.exists() {
        return Ok(std::fs::read_to_string(path)?);
    }
    Err(TaxError::Schema(format!(
        "'{}' is neither JSON text nor an existing file",
        trimmed
    )))
}

/// Read a reform and an assumption set, each given as JSON text or a path
pub fn read_json_param_objects(reform: Option<&str>, assump: Option<&str>) -> Result<ParamInputs> {
    let mut inputs = ParamInputs::default();
    if let Some(source) = reform {
        inputs.policy = reform_from_json(&json_text(source)?)?;
    }
    if let Some(source) = assump {
        let root: Value = serde_json::from_str(&json_text(source)?)?;
        let obj = root
            .as_object()
            .ok_or_else(|| TaxError::Schema("assumptions must be a JSON object".to_string()))?;
        for (key, section) in obj {
            let section = section.as_object().ok_or_else(|| {
                TaxError::Schema(format!("assumption section {} must be an object", key))
            })?;
            let parsed = year_map_to_reform(section, key)?;
            match key.as_str() {
                "consumption" => inputs.consumption = parsed,
                "growdiff_baseline" => inputs.growdiff_baseline = parsed,
                "growdiff_response" => inputs.growdiff_response = parsed,
                other => {
                    return Err(TaxError::Schema(format!(
                        "unknown assumption section '{}'",
                        other
                    )))
                }
            }
        }
    }
    Ok(inputs)
}
