//! Named column views of calculator variables with CSV output

use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// Named columns of equal length
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl DataFrame {
    pub fn push(&mut self, name: &str, values: Vec<f64>) {
        self.names.push(name.to_string());
        self.columns.push(values);
    }

    pub fn columns(&self) -> &[String] {
        &self.names
    }

    pub fn num_columns(&self) -> usize {
        self.names.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Write a header row and one line per filing unit
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.names)?;
        for row in 0..self.num_rows() {
            let record: Vec<String> = self
                .columns
                .iter()
                .map(|c| c.get(row).map(|v| v.to_string()).unwrap_or_default())
                .collect();
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}
