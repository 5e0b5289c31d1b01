//! Year-indexed parameter registry shared by Policy, Consumption and GrowDiff
//!
//! A [`Parameters`] object holds, for every named parameter, a dense
//! year-by-label array covering `[start_year, end_year]`. Years past the last
//! known value are extrapolated with the price or wage series, and
//! [`Parameters::set_year`] selects the slice the tax kernels read.

mod schema;
mod reform;
pub mod consumption;
pub mod policy;

pub use consumption::Consumption;
pub use policy::Policy;
pub use reform::{read_json_param_objects, reform_from_json, ParamInputs, Reform, Translation};
pub use schema::{
    Bound, Indexing, InvalidAction, LabelDim, ParamFile, ParamSpec, ParamType, ValidValues,
};

use crate::error::{Result, TaxError};
use std::collections::BTreeMap;

/// Name of the parameter whose value is added to every price indexing rate
pub const CPI_OFFSET_NAME: &str = "parameter_indexing_CPI_offset";

/// Round an extrapolated dollar amount to cents
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Annual indexing rates, one per year of the parameter window
#[derive(Debug, Clone, Default)]
pub struct IndexRates {
    pub price: Vec<f64>,
    pub wage: Vec<f64>,
}

impl IndexRates {
    /// All-zero rates for parameter groups that are never indexed
    pub fn zeros(num_years: usize) -> Self {
        Self {
            price: vec![0.0; num_years],
            wage: vec![0.0; num_years],
        }
    }
}

/// One parameter's metadata and its dense year-by-label values
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub title: String,
    pub description: String,
    pub param_type: ParamType,
    /// Label dimension for vector parameters, `None` for scalars
    pub dim: Option<LabelDim>,
    /// Series used when the parameter is indexed
    pub index_kind: Indexing,
    /// Current indexing status, possibly toggled by a reform
    pub indexed: bool,
    pub valid: ValidValues,
    pub invalid_action: InvalidAction,
    /// Last year with an explicit value in the defaults file
    pub last_known_year: i32,
    values: Vec<Vec<f64>>,
    text: Vec<String>,
}

impl Parameter {
    /// Number of entries in each year slice
    pub fn width(&self) -> usize {
        self.dim.map(|d| d.size()).unwrap_or(1)
    }

    pub fn is_text(&self) -> bool {
        self.param_type == ParamType::Str
    }

    /// Recompute every year after `from_idx` from the value at `from_idx`
    fn fill_forward(&mut self, from_idx: usize, rates: &[f64]) {
        if self.is_text() {
            for k in (from_idx + 1)..self.text.len() {
                self.text[k] = self.text[k - 1].clone();
            }
            return;
        }
        for k in (from_idx + 1)..self.values.len() {
            let prev = self.values[k - 1].clone();
            self.values[k] = if self.indexed {
                let rate = rates.get(k - 1).copied().unwrap_or(0.0);
                prev.iter().map(|v| round2(v * (1.0 + rate))).collect()
            } else {
                prev
            };
        }
    }
}

/// Year-indexed parameter store with reform application
#[derive(Debug, Clone)]
pub struct Parameters {
    /// Group name used in messages ("Policy", "Consumption", ...)
    group: &'static str,
    start_year: i32,
    end_year: i32,
    current_year: i32,
    params: BTreeMap<String, Parameter>,
    base_rates: IndexRates,
    translations: Vec<Translation>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl Parameters {
    /// Build a registry from a parsed defaults file
    ///
    /// Values are laid out for every year in `[start_year, end_year]`. A year
    /// without an entry is extrapolated from the previous year, so defaults
    /// files only need to list the years in which values are known.
    pub fn from_specs(
        group: &'static str,
        specs: ParamFile,
        start_year: i32,
        end_year: i32,
        rates: IndexRates,
    ) -> Result<Self> {
        if end_year < start_year {
            return Err(TaxError::Schema(format!(
                "{}: end year {} precedes start year {}",
                group, end_year, start_year
            )));
        }
        let num_years = (end_year - start_year + 1) as usize;
        if rates.price.len() < num_years || rates.wage.len() < num_years {
            return Err(TaxError::Schema(format!(
                "{}: indexing rates cover fewer than {} years",
                group, num_years
            )));
        }

        let mut params = BTreeMap::new();
        for (name, spec) in specs {
            let param = build_parameter(&name, spec, start_year, end_year, &rates)?;
            params.insert(name, param);
        }

        let mut built = Self {
            group,
            start_year,
            end_year,
            current_year: start_year,
            params,
            base_rates: rates,
            translations: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        };

        // a non-zero default CPI offset changes the price series itself
        if built.params.contains_key(CPI_OFFSET_NAME) {
            let price = built.price_rates();
            let names: Vec<String> = built.params.keys().cloned().collect();
            for name in names {
                if let Some(p) = built.params.get_mut(&name) {
                    if p.indexed && p.index_kind == Indexing::Price {
                        let from = (p.last_known_year - start_year).max(0) as usize;
                        p.fill_forward(from, &price);
                    }
                }
            }
        }
        Ok(built)
    }

    /// Parse a defaults file from JSON text
    pub fn from_json_str(
        group: &'static str,
        json: &str,
        start_year: i32,
        end_year: i32,
        rates: IndexRates,
    ) -> Result<Self> {
        let specs: ParamFile = serde_json::from_str(json)?;
        Self::from_specs(group, specs, start_year, end_year, rates)
    }

    pub fn with_translations(mut self, translations: Vec<Translation>) -> Self {
        self.translations = translations;
        self
    }

    pub fn group(&self) -> &'static str {
        self.group
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_year(&self) -> i32 {
        self.end_year
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn num_years(&self) -> usize {
        (self.end_year - self.start_year + 1) as usize
    }

    /// Select the year slice returned by the value accessors
    pub fn set_year(&mut self, year: i32) -> Result<()> {
        self.check_year(year)?;
        self.current_year = year;
        Ok(())
    }

    /// Fail unless `year` lies inside the parameter window
    pub fn check_year(&self, year: i32) -> Result<()> {
        self.year_index(year).map(|_| ())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(|k| k.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn param(&self, name: &str) -> Result<&Parameter> {
        self.params.get(name).ok_or_else(|| self.unknown(name))
    }

    pub(crate) fn param_mut(&mut self, name: &str) -> Result<&mut Parameter> {
        if !self.params.contains_key(name) {
            return Err(self.unknown(name));
        }
        self.params
            .get_mut(name)
            .ok_or_else(|| TaxError::State(format!("parameter {} vanished", name)))
    }

    fn year_index(&self, year: i32) -> Result<usize> {
        if year < self.start_year || year > self.end_year {
            return Err(TaxError::out_of_range(
                self.group,
                year,
                self.start_year,
                self.end_year,
            ));
        }
        Ok((year - self.start_year) as usize)
    }

    /// Values of a parameter in the given year
    pub fn values_at(&self, name: &str, year: i32) -> Result<&[f64]> {
        let idx = self.year_index(year)?;
        let p = self.param(name)?;
        if p.is_text() {
            return Err(TaxError::Schema(format!("{} is a string parameter", name)));
        }
        Ok(&p.values[idx])
    }

    /// Values of a parameter in the current year
    pub fn vector(&self, name: &str) -> Result<&[f64]> {
        self.values_at(name, self.current_year)
    }

    /// Value of a scalar parameter in the current year
    pub fn scalar(&self, name: &str) -> Result<f64> {
        let values = self.vector(name)?;
        match values {
            [v] => Ok(*v),
            _ => Err(TaxError::Schema(format!(
                "{} is a vector parameter with {} entries",
                name,
                values.len()
            ))),
        }
    }

    /// Scalar parameter interpreted as a switch
    pub fn flag(&self, name: &str) -> Result<bool> {
        Ok(self.scalar(name)? != 0.0)
    }

    /// Vector parameter as a fixed-size array (MARS, EIC or idedtype)
    pub fn array<const N: usize>(&self, name: &str) -> Result<[f64; N]> {
        let values = self.vector(name)?;
        values.try_into().map_err(|_| {
            TaxError::Schema(format!(
                "{} has {} entries, expected {}",
                name,
                values.len(),
                N
            ))
        })
    }

    /// Value of a string parameter in the current year
    pub fn text(&self, name: &str) -> Result<&str> {
        let idx = self.year_index(self.current_year)?;
        let p = self.param(name)?;
        if !p.is_text() {
            return Err(TaxError::Schema(format!("{} is not a string parameter", name)));
        }
        Ok(p.text[idx].as_str())
    }

    /// Overwrite the current-year slice of a parameter
    ///
    /// Later years are left untouched, matching a direct attribute write on
    /// the year slice; use [`Parameters::implement_reform`] to change a
    /// parameter from a year forward.
    pub fn set_current(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        let idx = self.year_index(self.current_year)?;
        let p = self.param_mut(name)?;
        if p.is_text() || values.len() != p.width() {
            return Err(TaxError::Schema(format!(
                "{} expects {} numeric values, got {}",
                name,
                p.width(),
                values.len()
            )));
        }
        p.values[idx] = values;
        Ok(())
    }

    /// Price indexing rates including any CPI offset
    pub fn price_rates(&self) -> Vec<f64> {
        let offset = self.params.get(CPI_OFFSET_NAME);
        self.base_rates
            .price
            .iter()
            .enumerate()
            .map(|(i, rate)| {
                let adj = offset
                    .and_then(|p| p.values.get(i))
                    .and_then(|v| v.first())
                    .copied()
                    .unwrap_or(0.0);
                rate + adj
            })
            .collect()
    }

    pub fn wage_rates(&self) -> &[f64] {
        &self.base_rates.wage
    }

    pub(crate) fn rates_for(&self, kind: Indexing) -> Vec<f64> {
        match kind {
            Indexing::Wage => self.base_rates.wage.clone(),
            _ => self.price_rates(),
        }
    }

    pub fn parameter_warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn parameter_errors(&self) -> &[String] {
        &self.errors
    }

    pub(crate) fn translations(&self) -> &[Translation] {
        &self.translations
    }

    fn unknown(&self, name: &str) -> TaxError {
        TaxError::UnknownParameter {
            name: name.to_string(),
            suggestions: self.suggestions(name),
        }
    }

    /// Known names within a small edit distance of `name`
    pub fn suggestions(&self, name: &str) -> Vec<String> {
        let mut near: Vec<(usize, &String)> = self
            .params
            .keys()
            .map(|k| (strsim::levenshtein(name, k), k))
            .filter(|(d, _)| *d <= 2)
            .collect();
        near.sort();
        near.into_iter().take(3).map(|(_, k)| k.clone()).collect()
    }
}

/// Coerced reform or default value
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Coerced {
    Num(f64),
    Text(String),
}

pub(crate) fn coerce(name: &str, ptype: ParamType, value: &serde_json::Value) -> Result<Coerced> {
    use serde_json::Value;
    let bad = |what: &str| {
        TaxError::Schema(format!(
            "{}: expected {} value, found {}",
            name, what, value
        ))
    };
    match ptype {
        ParamType::Float => value.as_f64().map(Coerced::Num).ok_or_else(|| bad("float")),
        ParamType::Int => match value.as_f64() {
            Some(v) if v.fract() == 0.0 => Ok(Coerced::Num(v)),
            _ => Err(bad("integer")),
        },
        ParamType::Bool => match value {
            Value::Bool(b) => Ok(Coerced::Num(if *b { 1.0 } else { 0.0 })),
            Value::Number(_) => match value.as_f64() {
                Some(v) if v == 0.0 || v == 1.0 => Ok(Coerced::Num(v)),
                _ => Err(bad("boolean")),
            },
            _ => Err(bad("boolean")),
        },
        ParamType::Str => value
            .as_str()
            .map(|s| Coerced::Text(s.to_string()))
            .ok_or_else(|| bad("string")),
    }
}

fn build_parameter(
    name: &str,
    spec: ParamSpec,
    start_year: i32,
    end_year: i32,
    rates: &IndexRates,
) -> Result<Parameter> {
    let dim = spec
        .label_dim()
        .map_err(|e| TaxError::Schema(format!("{}: {}", name, e)))?;
    let width = dim.map(|d| d.size()).unwrap_or(1);
    let num_years = (end_year - start_year + 1) as usize;
    let index_kind = match spec.indexing {
        Some(Indexing::Wage) => Indexing::Wage,
        _ => Indexing::Price,
    };
    let indexed = spec.indexed && spec.indexing != Some(Indexing::None);
    let is_text = spec.param_type == ParamType::Str;

    let mut grid: Vec<Vec<Option<Coerced>>> = vec![vec![None; width]; num_years];
    let mut last_known_year = start_year;
    for entry in &spec.value {
        if entry.year < start_year || entry.year > end_year {
            return Err(TaxError::Schema(format!(
                "{}: value for year {} outside [{}, {}]",
                name, entry.year, start_year, end_year
            )));
        }
        let col = match dim {
            None => 0,
            Some(d) => entry
                .labels
                .get(d.key())
                .and_then(|v| match v {
                    serde_json::Value::String(s) => d.position(s),
                    serde_json::Value::Number(n) => {
                        n.as_u64().map(|i| i as usize).filter(|i| *i < d.size())
                    }
                    _ => None,
                })
                .ok_or_else(|| {
                    TaxError::Schema(format!(
                        "{}: entry for {} has invalid {} label",
                        name,
                        entry.year,
                        d.key()
                    ))
                })?,
        };
        let value = coerce(name, spec.param_type, &entry.value)?;
        grid[(entry.year - start_year) as usize][col] = Some(value);
        last_known_year = last_known_year.max(entry.year);
    }

    let rate_series = match index_kind {
        Indexing::Wage => &rates.wage,
        _ => &rates.price,
    };
    let mut values = vec![vec![0.0; width]; num_years];
    let mut text = vec![String::new(); if is_text { num_years } else { 0 }];
    for k in 0..num_years {
        for j in 0..width {
            match grid[k][j].take() {
                Some(Coerced::Num(v)) if !is_text => values[k][j] = v,
                Some(Coerced::Text(s)) if is_text => text[k] = s,
                Some(_) => {
                    return Err(TaxError::Schema(format!("{}: inconsistent value types", name)))
                }
                None if k == 0 => {
                    return Err(TaxError::Schema(format!(
                        "{}: no value for first year {}",
                        name, start_year
                    )))
                }
                None if is_text => text[k] = text[k - 1].clone(),
                None => {
                    let prev = values[k - 1][j];
                    values[k][j] = if indexed {
                        round2(prev * (1.0 + rate_series[k - 1]))
                    } else {
                        prev
                    };
                }
            }
        }
    }

    Ok(Parameter {
        name: name.to_string(),
        title: spec.title,
        description: spec.description,
        param_type: spec.param_type,
        dim,
        index_kind,
        indexed,
        valid: spec.valid_values.unwrap_or_default(),
        invalid_action: spec.invalid_action,
        last_known_year,
        values,
        text,
    })
}
