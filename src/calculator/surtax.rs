//! Taxes on the benefit of itemizing
//!
//! Both taxes measure, per filing unit, how much income tax falls because
//! selected itemized deductions are allowed: the pipeline is rerun on a copy
//! with those deductions fully haircut and the increase in `iitax` is the
//! benefit.

use super::Calculator;
use crate::calcfunctions::TaxParams;
use crate::error::Result;
use log::debug;

/// Haircut parameters in deduction-switch order
const HAIRCUTS: [&str; 7] = [
    "ID_Medical_hc",
    "ID_StateLocalTax_hc",
    "ID_RealEstate_hc",
    "ID_Casualty_hc",
    "ID_Miscellaneous_hc",
    "ID_InterestPaid_hc",
    "ID_Charity_hc",
];

/// Income tax saved by the deductions selected in `switches`
fn deduction_benefit(calc: &Calculator, switches: &[bool; 7]) -> Result<Vec<f64>> {
    let mut without = calc.clone();
    for (name, on) in HAIRCUTS.iter().zip(switches) {
        if *on {
            without.set_policy_param(name, vec![1.0])?;
        }
    }
    let params = TaxParams::from_policy(without.policy())?;
    without.calc_one_year(&params);
    Ok(without
        .records()
        .units()
        .iter()
        .zip(calc.records().units())
        .map(|(no_ded, base)| (no_ded.iitax - base.iitax).max(0.0))
        .collect())
}

fn add_to_liability(calc: &mut Calculator, extra: &[f64]) {
    for (u, x) in calc.records_mut().units_mut().iter_mut().zip(extra) {
        u.iitax += x;
        u.combined += x;
        u.surtax += x;
    }
}

/// Surtax on the itemization benefit above `ID_BenefitSurtax_crt` times AGI
/// plus a filing-status exemption
pub(crate) fn benefit_surtax(calc: &mut Calculator, p: &TaxParams) -> Result<()> {
    if p.ID_BenefitSurtax_crt == 1.0 {
        return Ok(());
    }
    let benefit = deduction_benefit(calc, &p.ID_BenefitSurtax_Switch)?;
    let surtax: Vec<f64> = calc
        .records()
        .units()
        .iter()
        .zip(&benefit)
        .map(|(u, ben)| {
            let exempt = p.ID_BenefitSurtax_crt * u.c00100 + p.ID_BenefitSurtax_em[u.mars_idx()];
            p.ID_BenefitSurtax_trt * (ben - exempt).max(0.0)
        })
        .collect();
    debug!("Benefit surtax applied to {} units", surtax.iter().filter(|x| **x > 0.0).count());
    add_to_liability(calc, &surtax);
    Ok(())
}

/// Limit the itemization benefit to `ID_BenefitCap_rt` times the deductible
/// expenses; the excess is taxed back
pub(crate) fn benefit_limitation(calc: &mut Calculator, p: &TaxParams) -> Result<()> {
    if p.ID_BenefitCap_rt == 1.0 {
        return Ok(());
    }
    let sw = p.ID_BenefitCap_Switch;
    let benefit = deduction_benefit(calc, &sw)?;
    let excess: Vec<f64> = calc
        .records()
        .units()
        .iter()
        .zip(&benefit)
        .map(|(u, ben)| {
            let parts = [
                u.c17000,
                (1.0 - p.ID_StateLocalTax_hc) * u.e18400_capped.max(0.0),
                (1.0 - p.ID_RealEstate_hc) * u.e18500_capped,
                u.c20500,
                u.c20800,
                u.c19200,
                u.c19700,
            ];
            let expenses: f64 = parts
                .iter()
                .zip(sw.iter())
                .filter(|(_, on)| **on)
                .map(|(v, _)| v)
                .sum();
            (ben - p.ID_BenefitCap_rt * expenses).max(0.0)
        })
        .collect();
    add_to_liability(calc, &excess);
    Ok(())
}
