//! Filing-unit records
//!
//! A [`Records`] table owns one [`TaxUnit`] per filing unit for a single
//! calendar year. Construction validates the input, zeroes every
//! calculated variable and attaches growth factors and optional weights;
//! [`Records::increment_year`] ages the input variables one year.

pub mod loader;
pub mod metadata;
pub mod unit;

pub use loader::{Weights, DEFAULT_DATA_PATH, DEFAULT_WEIGHTS_PATH};
pub use metadata::{RecordsMetadata, VarInfo, VarType, DEFAULT_METADATA_PATH};
pub use unit::TaxUnit;

use crate::error::{Result, TaxError};
use crate::growth::GrowFactors;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Tolerance for the sum-of-parts consistency checks
const CONSISTENCY_TOL: f64 = 1e-6;

/// Spouse variables that must be zero unless filing jointly
const SPOUSE_VARS: [&str; 7] = [
    "e00200s", "e00900s", "e02100s", "pencon_s", "k1bx14s", "age_spouse", "blind_spouse",
];

#[derive(Debug, Clone)]
pub struct Records {
    data_year: i32,
    current_year: i32,
    units: Vec<TaxUnit>,
    weights: Option<Weights>,
    growfactors: GrowFactors,
    meta: Arc<RecordsMetadata>,
    ignored: Vec<String>,
}

impl Records {
    /// In-memory units for `start_year` with the bundled growth factors
    pub fn new(units: Vec<TaxUnit>, start_year: i32) -> Result<Self> {
        Self::from_units(units, start_year, GrowFactors::new()?, None)
    }

    pub fn from_units(
        units: Vec<TaxUnit>,
        start_year: i32,
        growfactors: GrowFactors,
        weights: Option<Weights>,
    ) -> Result<Self> {
        let meta = Arc::new(RecordsMetadata::new()?);
        Self::build(units, Vec::new(), start_year, growfactors, weights, meta)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        start_year: i32,
        growfactors: GrowFactors,
        weights: Option<Weights>,
    ) -> Result<Self> {
        let meta = Arc::new(RecordsMetadata::new()?);
        let table = loader::read_units(reader, &meta)?;
        Self::build(table.units, table.ignored, start_year, growfactors, weights, meta)
    }

    pub fn from_csv_path<P: AsRef<Path>>(
        path: P,
        start_year: i32,
        growfactors: GrowFactors,
        weights: Option<Weights>,
    ) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file, start_year, growfactors, weights)
    }

    fn build(
        mut units: Vec<TaxUnit>,
        ignored: Vec<String>,
        start_year: i32,
        growfactors: GrowFactors,
        weights: Option<Weights>,
        meta: Arc<RecordsMetadata>,
    ) -> Result<Self> {
        if start_year < growfactors.first_year() || start_year > growfactors.last_year() {
            return Err(TaxError::out_of_range(
                "Records",
                start_year,
                growfactors.first_year(),
                growfactors.last_year(),
            ));
        }
        check_units(&units)?;
        if let Some(w) = &weights {
            if let Some(n) = w.num_rows() {
                if n != units.len() {
                    return Err(TaxError::Schema(format!(
                        "weights table has {} rows but records have {}",
                        n,
                        units.len()
                    )));
                }
            }
            for (unit, wt) in units.iter_mut().zip(w.year(start_year)?) {
                unit.s006 = wt * 0.01;
            }
        }
        for unit in units.iter_mut() {
            for name in TaxUnit::CALC_FIELDS {
                if let Some(v) = unit.get_mut(name) {
                    *v = 0.0;
                }
            }
            unit.set_filing_counts();
        }
        Ok(Self {
            data_year: start_year,
            current_year: start_year,
            units,
            weights,
            growfactors,
            meta,
            ignored,
        })
    }

    pub fn data_year(&self) -> i32 {
        self.data_year
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn array_length(&self) -> usize {
        self.units.len()
    }

    pub fn units(&self) -> &[TaxUnit] {
        &self.units
    }

    pub fn units_mut(&mut self) -> &mut [TaxUnit] {
        &mut self.units
    }

    pub fn metadata(&self) -> &RecordsMetadata {
        &self.meta
    }

    /// Input columns dropped because they are not read variables
    pub fn ignored_variables(&self) -> &[String] {
        &self.ignored
    }

    pub fn growfactors(&self) -> &GrowFactors {
        &self.growfactors
    }

    /// One variable across all units
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        if !TaxUnit::has_field(name) {
            return Err(TaxError::UnknownVariable(name.to_string()));
        }
        Ok(self.units.iter().filter_map(|u| u.get(name)).collect())
    }

    /// Overwrite one variable across all units
    pub fn set_column(&mut self, name: &str, values: &[f64]) -> Result<()> {
        if !TaxUnit::has_field(name) {
            return Err(TaxError::UnknownVariable(name.to_string()));
        }
        if values.len() != self.units.len() {
            return Err(TaxError::Schema(format!(
                "{} needs {} values, got {}",
                name,
                self.units.len(),
                values.len()
            )));
        }
        for (unit, value) in self.units.iter_mut().zip(values) {
            if let Some(slot) = unit.get_mut(name) {
                *slot = *value;
            }
        }
        Ok(())
    }

    /// Age every input variable that has a growth factor by one year and
    /// pick up that year's weights
    ///
    /// Calculated variables are left alone; the next pipeline run
    /// recomputes them.
    pub fn increment_year(&mut self) -> Result<()> {
        let next = self.current_year + 1;
        let mut factors = Vec::new();
        for (name, pos, neg) in self.meta.aged_vars() {
            let up = self.growfactors.factor_value(pos, next)?;
            let down = self.growfactors.factor_value(neg, next)?;
            factors.push((name.to_string(), up, down));
        }
        let new_weights = match &self.weights {
            Some(w) => Some(w.year(next)?.to_vec()),
            None => None,
        };

        for unit in self.units.iter_mut() {
            for (name, up, down) in &factors {
                if let Some(v) = unit.get_mut(name) {
                    *v *= if *v < 0.0 { *down } else { *up };
                }
            }
        }
        if let Some(col) = new_weights {
            for (unit, wt) in self.units.iter_mut().zip(col) {
                unit.s006 = wt * 0.01;
            }
        }
        self.current_year = next;
        log::info!("Records advanced to {}", next);
        Ok(())
    }

    /// Reset every calculated variable except the fixed ones
    pub fn zero_out_changing_calculated_vars(&mut self) {
        let names: Vec<&str> = self.meta.changing_calc_vars().collect();
        for unit in self.units.iter_mut() {
            for name in &names {
                if let Some(v) = unit.get_mut(name) {
                    *v = 0.0;
                }
            }
        }
    }

    /// Rows `[start, end)` as an independent table for the same year
    pub fn slice(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end > self.units.len() {
            return Err(TaxError::Schema(format!(
                "row range {}..{} outside 0..{}",
                start,
                end,
                self.units.len()
            )));
        }
        Ok(Self {
            data_year: self.data_year,
            current_year: self.current_year,
            units: self.units[start..end].to_vec(),
            weights: self.weights.as_ref().map(|w| w.slice(start, end)),
            growfactors: self.growfactors.clone(),
            meta: Arc::clone(&self.meta),
            ignored: self.ignored.clone(),
        })
    }
}

fn check_units(units: &[TaxUnit]) -> Result<()> {
    let mut problems = Vec::new();
    for (row, u) in units.iter().enumerate() {
        if !(1.0..=5.0).contains(&u.MARS) || u.MARS.fract() != 0.0 {
            problems.push(format!("row {}: MARS = {} not in 1..5", row + 1, u.MARS));
        }
        if !(0.0..=3.0).contains(&u.EIC) {
            problems.push(format!("row {}: EIC = {} not in 0..3", row + 1, u.EIC));
        }
        for (total, p, s, label) in [
            (u.e00200, u.e00200p, u.e00200s, "e00200 = e00200p + e00200s"),
            (u.e00900, u.e00900p, u.e00900s, "e00900 = e00900p + e00900s"),
            (u.e02100, u.e02100p, u.e02100s, "e02100 = e02100p + e02100s"),
        ] {
            if (total - (p + s)).abs() > CONSISTENCY_TOL {
                problems.push(format!("row {}: {} does not hold", row + 1, label));
            }
        }
        if u.MARS != 2.0 {
            for name in SPOUSE_VARS {
                if u.get(name).unwrap_or(0.0) != 0.0 {
                    problems.push(format!("row {}: {} must be zero unless MARS is 2", row + 1, name));
                }
            }
        }
        if u.s006 < 0.0 {
            problems.push(format!("row {}: negative weight {}", row + 1, u.s006));
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(TaxError::Schema(problems.join("\n")))
    }
}
