//! Year-indexed growth factor table
//!
//! Loaded from `growfactors.csv`: a `YEAR` column followed by one column per
//! named series. Each value is the ratio of the series in that year to its
//! value in the previous year.

use crate::error::{Result, TaxError};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default path to the growth factor table
pub const DEFAULT_GROWFACTORS_PATH: &str = "data/growfactors.csv";

const EMBEDDED_GROWFACTORS: &str = include_str!("../../data/growfactors.csv");

/// Every series a growth factor table must carry
pub const VALID_NAMES: [&str; 26] = [
    "ABENHOUSING",
    "ABENMCAID",
    "ABENMCARE",
    "ABENOTHER",
    "ABENSNAP",
    "ABENSSI",
    "ABENTANF",
    "ABENVET",
    "ABENWIC",
    "ABOOK",
    "ACGNS",
    "ACPIM",
    "ACPIU",
    "ADIVS",
    "AINTS",
    "AIPD",
    "APOPN",
    "ASCHCI",
    "ASCHCL",
    "ASCHEI",
    "ASCHEL",
    "ASCHF",
    "ASOCSEC",
    "ATXPY",
    "AUCOMP",
    "AWAGE",
];

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Growth factor series keyed by name, one value per year
#[derive(Debug)]
pub struct GrowFactors {
    first_year: i32,
    last_year: i32,
    series: BTreeMap<String, Vec<f64>>,
    /// Set once any rate or factor has been read
    used: AtomicBool,
}

impl Clone for GrowFactors {
    fn clone(&self) -> Self {
        Self {
            first_year: self.first_year,
            last_year: self.last_year,
            series: self.series.clone(),
            used: AtomicBool::new(self.used.load(Ordering::Relaxed)),
        }
    }
}

impl GrowFactors {
    /// Growth factors bundled with the crate
    pub fn new() -> Result<Self> {
        Self::from_reader(EMBEDDED_GROWFACTORS.as_bytes())
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();
        if headers.get(0).map(str::trim) != Some("YEAR") {
            return Err(TaxError::Schema(
                "growfactors table must start with a YEAR column".to_string(),
            ));
        }
        let names: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

        let found: BTreeSet<&str> = names.iter().map(String::as_str).collect();
        let valid: BTreeSet<&str> = VALID_NAMES.iter().copied().collect();
        let missing: Vec<&str> = valid.difference(&found).copied().collect();
        let invalid: Vec<&str> = found.difference(&valid).copied().collect();
        if !missing.is_empty() || !invalid.is_empty() {
            return Err(TaxError::Schema(format!(
                "growfactors missing names are: {:?} and invalid names are: {:?}",
                missing, invalid
            )));
        }

        let mut series: BTreeMap<String, Vec<f64>> =
            names.iter().map(|n| (n.clone(), Vec::new())).collect();
        let mut years = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let year: i32 = record[0].trim().parse().map_err(|_| {
                TaxError::Schema(format!("growfactors: bad YEAR '{}'", &record[0]))
            })?;
            if let Some(&prev) = years.last() {
                if year != prev + 1 {
                    return Err(TaxError::Schema(format!(
                        "growfactors: year {} does not follow {}",
                        year, prev
                    )));
                }
            }
            years.push(year);
            for (i, name) in names.iter().enumerate() {
                let raw = record.get(i + 1).unwrap_or("").trim();
                let value: f64 = raw.parse().map_err(|_| {
                    TaxError::Schema(format!("growfactors: {} {} has value '{}'", name, year, raw))
                })?;
                if value <= 0.0 {
                    return Err(TaxError::Schema(format!(
                        "growfactors: {} {} must be positive, found {}",
                        name, year, value
                    )));
                }
                if let Some(col) = series.get_mut(name) {
                    col.push(value);
                }
            }
        }

        let (first_year, last_year) = match (years.first(), years.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => return Err(TaxError::Schema("growfactors table has no rows".to_string())),
        };
        log::info!("Loaded growth factors for {}-{}", first_year, last_year);

        Ok(Self {
            first_year,
            last_year,
            series,
            used: AtomicBool::new(false),
        })
    }

    pub fn first_year(&self) -> i32 {
        self.first_year
    }

    pub fn last_year(&self) -> i32 {
        self.last_year
    }

    /// Whether any rate or factor has been read since construction
    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::Relaxed)
    }

    fn check_window(&self, first: i32, last: i32) -> Result<()> {
        if first > last {
            return Err(TaxError::Schema(format!(
                "first year {} after last year {}",
                first, last
            )));
        }
        for year in [first, last] {
            if year < self.first_year || year > self.last_year {
                return Err(TaxError::out_of_range(
                    "GrowFactors",
                    year,
                    self.first_year,
                    self.last_year,
                ));
            }
        }
        Ok(())
    }

    fn rates(&self, name: &str, first: i32, last: i32) -> Result<Vec<f64>> {
        self.used.store(true, Ordering::Relaxed);
        self.check_window(first, last)?;
        let col = self
            .series
            .get(name)
            .ok_or_else(|| TaxError::UnknownFactor(name.to_string()))?;
        let lo = (first - self.first_year) as usize;
        let hi = (last - self.first_year) as usize;
        Ok(col[lo..=hi].iter().map(|f| round4(f - 1.0)).collect())
    }

    /// CPI-U inflation rates for `[first, last]`, rounded to four decimals
    pub fn price_inflation_rates(&self, first: i32, last: i32) -> Result<Vec<f64>> {
        self.rates("ACPIU", first, last)
    }

    /// Average wage growth rates for `[first, last]`, rounded to four decimals
    pub fn wage_growth_rates(&self, first: i32, last: i32) -> Result<Vec<f64>> {
        self.rates("AWAGE", first, last)
    }

    pub fn factor_value(&self, name: &str, year: i32) -> Result<f64> {
        self.used.store(true, Ordering::Relaxed);
        let col = self
            .series
            .get(name)
            .ok_or_else(|| TaxError::UnknownFactor(name.to_string()))?;
        self.check_window(year, year)?;
        Ok(col[(year - self.first_year) as usize])
    }

    fn entry_mut(&mut self, name: &str, year: i32) -> Result<Option<&mut f64>> {
        if self.is_used() {
            return Err(TaxError::State(
                "cannot update growfactors after they have been used".to_string(),
            ));
        }
        let first = self.first_year;
        let col = self
            .series
            .get_mut(name)
            .ok_or_else(|| TaxError::UnknownFactor(name.to_string()))?;
        if year < first {
            return Ok(None);
        }
        Ok(col.get_mut((year - first) as usize))
    }

    /// Add `diff` to one factor; years outside the table are ignored
    pub fn update(&mut self, name: &str, year: i32, diff: f64) -> Result<()> {
        if let Some(v) = self.entry_mut(name, year)? {
            *v += diff;
        }
        Ok(())
    }

    /// Multiply one factor by `multiplier`; years outside the table are ignored
    pub fn scale(&mut self, name: &str, year: i32, multiplier: f64) -> Result<()> {
        if let Some(v) = self.entry_mut(name, year)? {
            *v *= multiplier;
        }
        Ok(())
    }
}
