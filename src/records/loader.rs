//! CSV readers for filing-unit tables and weight tables

use super::metadata::RecordsMetadata;
use super::unit::TaxUnit;
use crate::error::{Result, TaxError};
use csv::Reader;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Default path to the sample filing-unit table
pub const DEFAULT_DATA_PATH: &str = "data/sample_records.csv";

/// Default path to the sample weights table
pub const DEFAULT_WEIGHTS_PATH: &str = "data/sample_weights.csv";

/// Filing units read from a table plus the columns that were dropped
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub units: Vec<TaxUnit>,
    /// Input columns that are not read variables
    pub ignored: Vec<String>,
}

fn parse_cell(raw: &str, name: &str, row: usize) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    raw.parse::<f64>().map_err(|_| {
        TaxError::Schema(format!("row {}: {} has non-numeric value '{}'", row + 1, name, raw))
    })
}

/// Read a filing-unit table, coercing integer variables by truncation
pub fn read_units<R: Read>(reader: R, meta: &RecordsMetadata) -> Result<LoadedTable> {
    let mut rdr = Reader::from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let missing: Vec<String> = meta
        .required_vars()
        .filter(|req| !headers.iter().any(|h| h == req))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(TaxError::MissingVariable(missing));
    }

    let mut ignored = Vec::new();
    // (column position, variable name, truncate to integer)
    let mut columns = Vec::new();
    for (pos, name) in headers.iter().enumerate() {
        if meta.read.contains_key(name) {
            columns.push((pos, name.as_str(), meta.is_integer(name)));
        } else {
            ignored.push(name.clone());
        }
    }
    if !ignored.is_empty() {
        log::warn!("Ignoring {} input columns: {}", ignored.len(), ignored.join(", "));
    }

    let mut units = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let mut unit = TaxUnit::default();
        for &(pos, name, is_int) in &columns {
            let value = parse_cell(record.get(pos).unwrap_or(""), name, row)?;
            if let Some(slot) = unit.get_mut(name) {
                *slot = if is_int { value.trunc() } else { value };
            }
        }
        units.push(unit);
    }
    log::info!("Read {} filing units with {} variables", units.len(), columns.len());
    Ok(LoadedTable { units, ignored })
}

pub fn load_units<P: AsRef<Path>>(path: P, meta: &RecordsMetadata) -> Result<LoadedTable> {
    let file = std::fs::File::open(path.as_ref())?;
    read_units(file, meta)
}

/// Sampling weights by year, from `WT<year>` columns holding weight times 100
#[derive(Debug, Clone, Default)]
pub struct Weights {
    by_year: BTreeMap<i32, Vec<f64>>,
}

impl Weights {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();
        let mut years = Vec::with_capacity(headers.len());
        for h in headers.iter() {
            let h = h.trim();
            let year = h
                .strip_prefix("WT")
                .and_then(|y| y.parse::<i32>().ok())
                .ok_or_else(|| TaxError::Schema(format!("weights column '{}' is not WT<year>", h)))?;
            years.push(year);
        }
        let mut by_year: BTreeMap<i32, Vec<f64>> =
            years.iter().map(|y| (*y, Vec::new())).collect();
        for (row, result) in rdr.records().enumerate() {
            let record = result?;
            for (pos, year) in years.iter().enumerate() {
                let w = parse_cell(record.get(pos).unwrap_or(""), &headers[pos], row)?;
                if w < 0.0 {
                    return Err(TaxError::Schema(format!(
                        "row {}: WT{} weight {} is negative",
                        row + 1,
                        year,
                        w
                    )));
                }
                if let Some(col) = by_year.get_mut(year) {
                    col.push(w);
                }
            }
        }
        Ok(Self { by_year })
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Build from explicit per-year columns (weight times 100)
    pub fn from_columns(by_year: BTreeMap<i32, Vec<f64>>) -> Self {
        Self { by_year }
    }

    pub fn year(&self, year: i32) -> Result<&[f64]> {
        self.by_year.get(&year).map(Vec::as_slice).ok_or_else(|| {
            let first = self.by_year.keys().next().copied().unwrap_or(year);
            let last = self.by_year.keys().next_back().copied().unwrap_or(year);
            TaxError::out_of_range("Weights", year, first, last)
        })
    }

    pub fn num_rows(&self) -> Option<usize> {
        self.by_year.values().next().map(Vec::len)
    }

    /// Weights restricted to the rows `[start, end)`
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let by_year = self
            .by_year
            .iter()
            .map(|(y, col)| (*y, col[start.min(col.len())..end.min(col.len())].to_vec()))
            .collect();
        Self { by_year }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> RecordsMetadata {
        RecordsMetadata::new().unwrap()
    }

    #[test]
    fn test_read_units_coerces_and_ignores() {
        let csv = "RECID,MARS,XTOT,e00200,e00200p,e00200s,zip_code\n\
                   1,1,1.7,50000.5,50000.5,0,12345\n\
                   2,2,,80000,40000,40000,\n";
        let table = read_units(csv.as_bytes(), &meta()).unwrap();
        assert_eq!(table.units.len(), 2);
        assert_eq!(table.ignored, vec!["zip_code".to_string()]);
        assert_eq!(table.units[0].XTOT, 1.0);
        assert_eq!(table.units[0].e00200, 50000.5);
        assert_eq!(table.units[1].XTOT, 0.0);
        assert_eq!(table.units[1].MARS, 2.0);
    }

    #[test]
    fn test_missing_required_columns_listed() {
        let csv = "e00200\n100\n";
        match read_units(csv.as_bytes(), &meta()) {
            Err(TaxError::MissingVariable(names)) => {
                assert_eq!(names, vec!["MARS".to_string(), "RECID".to_string()])
            }
            other => panic!("expected missing variable error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_cell_is_schema_error() {
        let csv = "RECID,MARS\n1,single\n";
        assert!(matches!(
            read_units(csv.as_bytes(), &meta()),
            Err(TaxError::Schema(_))
        ));
    }

    #[test]
    fn test_weights_by_year() {
        let csv = "WT2021,WT2022\n100,110\n250,260\n";
        let w = Weights::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(w.year(2022).unwrap(), &[110.0, 260.0]);
        assert_eq!(w.num_rows(), Some(2));
        assert!(matches!(w.year(2030), Err(TaxError::OutOfRange { .. })));
        assert_eq!(w.slice(1, 2).year(2021).unwrap(), &[250.0]);
        assert!(Weights::from_reader("weight\n1\n".as_bytes()).is_err());
    }
}
