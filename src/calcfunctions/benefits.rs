//! Benefit programs and universal basic income

use super::TaxParams;
use crate::parameters::consumption::BenefitValues;
use crate::records::TaxUnit;

/// Zero repealed benefits and total the cost and consumption value of what
/// remains
///
/// Social Security, unemployment insurance, SSI and UBI count at cost in the
/// value total. UBI is evaluated here from its own inputs so both totals
/// reflect the current year.
pub fn benefit_programs(p: &TaxParams, values: &BenefitValues, u: &mut TaxUnit) {
    let repeals = [
        (p.BEN_housing_repeal, &mut u.housing_ben),
        (p.BEN_ssi_repeal, &mut u.ssi_ben),
        (p.BEN_snap_repeal, &mut u.snap_ben),
        (p.BEN_tanf_repeal, &mut u.tanf_ben),
        (p.BEN_vet_repeal, &mut u.vet_ben),
        (p.BEN_wic_repeal, &mut u.wic_ben),
        (p.BEN_mcare_repeal, &mut u.mcare_ben),
        (p.BEN_mcaid_repeal, &mut u.mcaid_ben),
        (p.BEN_oasdi_repeal, &mut u.e02400),
        (p.BEN_ui_repeal, &mut u.e02300),
        (p.BEN_other_repeal, &mut u.other_ben),
    ];
    for (repealed, column) in repeals {
        if repealed {
            *column = 0.0;
        }
    }
    ubi(p, u);

    u.benefit_cost_total = u.housing_ben
        + u.ssi_ben
        + u.snap_ben
        + u.tanf_ben
        + u.vet_ben
        + u.wic_ben
        + u.mcare_ben
        + u.mcaid_ben
        + u.e02400
        + u.e02300
        + u.ubi
        + u.other_ben;
    u.benefit_value_total = u.housing_ben * values.housing
        + u.ssi_ben
        + u.snap_ben * values.snap
        + u.tanf_ben * values.tanf
        + u.vet_ben * values.vet
        + u.wic_ben * values.wic
        + u.mcare_ben * values.mcare
        + u.mcaid_ben * values.mcaid
        + u.e02400
        + u.e02300
        + u.ubi
        + u.other_ben * values.other;
}

/// Per-person UBI by age group, split into taxable and excluded parts
pub fn ubi(p: &TaxParams, u: &mut TaxUnit) {
    u.ubi = u.nu18 * p.UBI_u18 + u.n1820 * p.UBI_1820 + u.n21 * p.UBI_21;
    u.taxable_ubi = u.ubi * (1.0 - p.UBI_ecrt);
    u.nontaxable_ubi = u.ubi - u.taxable_ubi;
}
