//! Weighted aggregates for one simulated year
//!
//! Counts are in millions of filing units and dollar amounts in billions.

use crate::records::TaxUnit;
use serde::Serialize;

const IN_MILLIONS: f64 = 1.0e-6;
const IN_BILLIONS: f64 = 1.0e-9;

/// Variables summarized by distribution tables
pub const DIST_VARIABLES: [&str; 19] = [
    "expanded_income",
    "c00100",
    "aftertax_income",
    "standard",
    "c04470",
    "c04600",
    "c04800",
    "taxbc",
    "c62100",
    "c09600",
    "c05800",
    "othertaxes",
    "refund",
    "c07100",
    "surtax",
    "iitax",
    "payrolltax",
    "combined",
    "s006",
];

/// One year of the diagnostic table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiagnosticRow {
    pub year: i32,
    /// Filing units (millions)
    pub returns: f64,
    pub agi: f64,
    /// Units with positive AGI that itemize (millions)
    pub itemizers: f64,
    pub itemized_deduction: f64,
    pub standard_deduction_filers: f64,
    pub standard_deduction: f64,
    pub personal_exemption: f64,
    pub taxable_income: f64,
    pub regular_tax: f64,
    pub amt_income: f64,
    pub amt_liability: f64,
    pub amt_filers: f64,
    pub tax_before_credits: f64,
    pub refundable_credits: f64,
    pub nonrefundable_credits: f64,
    pub reform_surtaxes: f64,
    pub other_taxes: f64,
    pub ind_income_tax: f64,
    pub payroll_taxes: f64,
    pub combined_liability: f64,
    /// Units with zero or negative income tax (millions)
    pub with_income_tax_le_0: f64,
    pub with_combined_tax_le_0: f64,
}

fn weighted<F: Fn(&TaxUnit) -> f64>(units: &[TaxUnit], value: F) -> f64 {
    units.iter().map(|u| value(u) * u.s006).sum()
}

fn count<F: Fn(&TaxUnit) -> bool>(units: &[TaxUnit], keep: F) -> f64 {
    units.iter().filter(|u| keep(u)).map(|u| u.s006).sum()
}

impl DiagnosticRow {
    pub fn from_units(year: i32, units: &[TaxUnit]) -> Self {
        let pos_agi = |u: &TaxUnit| u.c00100 > 0.0;
        Self {
            year,
            returns: count(units, |_| true) * IN_MILLIONS,
            agi: weighted(units, |u| u.c00100) * IN_BILLIONS,
            itemizers: count(units, |u| u.c04470 > 0.0 && pos_agi(u)) * IN_MILLIONS,
            itemized_deduction: weighted(units, |u| u.c04470.max(0.0)) * IN_BILLIONS,
            standard_deduction_filers: count(units, |u| u.standard > 0.0 && pos_agi(u))
                * IN_MILLIONS,
            standard_deduction: weighted(units, |u| {
                if u.standard > 0.0 && pos_agi(u) {
                    u.standard
                } else {
                    0.0
                }
            }) * IN_BILLIONS,
            personal_exemption: weighted(units, |u| if pos_agi(u) { u.c04600 } else { 0.0 })
                * IN_BILLIONS,
            taxable_income: weighted(units, |u| u.c04800) * IN_BILLIONS,
            regular_tax: weighted(units, |u| u.taxbc) * IN_BILLIONS,
            amt_income: weighted(units, |u| u.c62100) * IN_BILLIONS,
            amt_liability: weighted(units, |u| u.c09600) * IN_BILLIONS,
            amt_filers: count(units, |u| u.c09600 > 0.0) * IN_MILLIONS,
            tax_before_credits: weighted(units, |u| u.c05800) * IN_BILLIONS,
            refundable_credits: weighted(units, |u| u.refund) * IN_BILLIONS,
            nonrefundable_credits: weighted(units, |u| u.c07100) * IN_BILLIONS,
            reform_surtaxes: weighted(units, |u| u.surtax) * IN_BILLIONS,
            other_taxes: weighted(units, |u| u.othertaxes) * IN_BILLIONS,
            ind_income_tax: weighted(units, |u| u.iitax) * IN_BILLIONS,
            payroll_taxes: weighted(units, |u| u.payrolltax) * IN_BILLIONS,
            combined_liability: weighted(units, |u| u.combined) * IN_BILLIONS,
            with_income_tax_le_0: count(units, |u| u.iitax <= 0.0) * IN_MILLIONS,
            with_combined_tax_le_0: count(units, |u| u.combined <= 0.0) * IN_MILLIONS,
        }
    }
}
