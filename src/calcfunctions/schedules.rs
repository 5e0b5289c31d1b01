//! Regular tax: Schedule X/Y/Z, the Schedule D worksheet and the AGI surtax

use super::{Schedule, TaxParams};
use crate::records::TaxUnit;

/// Bracketed tax on `income` with every bracket top lowered by `base`
///
/// A positive `base` places this income on top of `base` dollars taxed
/// under another schedule.
pub fn taxes(income: f64, m: usize, base: f64, sched: &Schedule) -> f64 {
    let mut tops = [0.0; 7];
    for (top, brk) in tops.iter_mut().zip(sched.brackets.iter()) {
        *top = if base > 0.0 {
            (brk[m] - base).max(0.0)
        } else {
            brk[m]
        };
    }
    let mut tax = sched.rates[0] * income.min(tops[0]);
    for i in 1..7 {
        tax += sched.rates[i] * (tops[i] - tops[i - 1]).min((income - tops[i - 1]).max(0.0));
    }
    tax + sched.rates[7] * (income - tops[6]).max(0.0)
}

/// Tax on `taxable_income` split between the ordinary and pass-through
/// schedules
///
/// With `PT_top_stacking` the pass-through portion sits above ordinary
/// income, otherwise below it.
pub fn sch_xyz(p: &TaxParams, u: &TaxUnit, taxable_income: f64) -> f64 {
    let m = u.mars_idx();
    let pt_passive = p.PT_EligibleRate_passive * (u.e02000 - u.e26270);
    let mut pt_active_gross = u.e00900 + u.e26270;
    if pt_active_gross > 0.0 && p.PT_wages_active_income {
        pt_active_gross += u.e00200;
    }
    let pt_active = (p.PT_EligibleRate_active * pt_active_gross).min(u.e00900 + u.e26270);
    let mut pt_taxinc = (pt_passive + pt_active).max(0.0);
    let reg_taxinc = if pt_taxinc >= taxable_income {
        pt_taxinc = taxable_income;
        0.0
    } else {
        taxable_income - pt_taxinc
    };
    let (reg_base, pt_base) = if p.PT_top_stacking {
        (0.0, reg_taxinc)
    } else {
        (pt_taxinc, 0.0)
    };
    let reg_tax = if reg_taxinc > 0.0 {
        taxes(reg_taxinc, m, reg_base, &p.ordinary_schedule())
    } else {
        0.0
    };
    let pt_tax = if pt_taxinc > 0.0 {
        taxes(pt_taxinc, m, pt_base, &p.pass_through_schedule())
    } else {
        0.0
    };
    reg_tax + pt_tax
}

/// Regular tax on all taxable income at ordinary rates
pub fn sch_xyz_tax(p: &TaxParams, u: &mut TaxUnit) {
    u.c05200 = sch_xyz(p, u, u.c04800);
}

/// Schedule D tax worksheet
///
/// Qualified dividends and long-term gains are taxed across the `CG_rt`
/// tiers, collectibles at 28% and unrecaptured section 1250 gain at 25%;
/// the remainder is taxed at ordinary rates. The result never exceeds the
/// all-ordinary tax in `c05200`.
pub fn gains_tax(p: &TaxParams, u: &mut TaxUnit) {
    let m = u.mars_idx();
    let has_qdiv_ltcg = !p.CG_nodiff
        && (u.c01000 > 0.0
            || u.c23650 > 0.0
            || u.p23250 > 0.0
            || u.e01100 > 0.0
            || u.e00650 > 0.0);

    let c24580 = if has_qdiv_ltcg {
        let dwks1 = u.c04800;
        let dwks5 = u.e58990.max(0.0);
        let dwks6 = (u.e00650 - dwks5).max(0.0);
        let dwks7 = u.p23250.min(u.c23650);
        let c24510 = if u.e01100 > 0.0 {
            u.e01100
        } else {
            dwks7.max(0.0) + u.e01100
        };
        let dwks9 = (c24510 - u.e58990.min(0.0)).max(0.0);
        u.dwks10 = dwks6 + dwks9;
        let dwks12 = dwks9.min(u.e24515 + u.e24518);
        u.dwks13 = u.dwks10 - dwks12;
        u.dwks14 = (dwks1 - u.dwks13).max(0.0);

        let dwks16 = p.CG_brk1[m].min(dwks1);
        let dwks17 = u.dwks14.min(dwks16);
        let dwks18 = (dwks1 - u.dwks10).max(0.0);
        u.dwks19 = dwks17.max(dwks18);
        let dwks20 = dwks16 - dwks17;
        let lowest_rate_tax = p.CG_rt1 * dwks20;

        let dwks21 = dwks1.min(u.dwks13);
        let dwks23 = (dwks21 - dwks20).max(0.0);
        let dwks25 = p.CG_brk2[m].min(dwks1);
        let dwks27 = (dwks25 - (u.dwks19 + dwks20)).max(0.0);
        let dwks28 = dwks23.min(dwks27);
        let dwks29 = p.CG_rt2 * dwks28;
        let dwks31 = dwks21 - (dwks20 + dwks28);
        let dwks32 = p.CG_rt3 * dwks31;

        let cg_all = dwks20 + dwks28 + dwks31;
        let hi_base = (cg_all - p.CG_brk3[m]).max(0.0);
        let highest_rate_incremental_tax = (p.CG_rt4 - p.CG_rt3) * hi_base;

        // unrecaptured section 1250 gain
        let dwks33 = dwks9.min(u.e24515);
        let dwks36 = (u.dwks10 + u.dwks19 - dwks1).max(0.0);
        let dwks37 = (dwks33 - dwks36).max(0.0);
        let dwks38 = 0.25 * dwks37;
        // collectibles
        let dwks39 = u.dwks19 + dwks20 + dwks28 + dwks31 + dwks37;
        let dwks41 = 0.28 * (dwks1 - dwks39);

        let dwks42 = sch_xyz(p, u, u.dwks19);
        u.dwks43 = dwks29
            + dwks32
            + dwks38
            + dwks41
            + dwks42
            + lowest_rate_tax
            + highest_rate_incremental_tax;
        u.dwks43.min(u.c05200)
    } else {
        u.dwks10 = u.p23250.min(u.c23650).max(0.0) + u.e01100;
        u.dwks13 = 0.0;
        u.dwks14 = 0.0;
        u.dwks19 = 0.0;
        u.dwks43 = 0.0;
        u.c05200
    };
    u.c05700 = 0.0;
    u.taxbc = u.c05700 + c24580;
}

/// Surtax on AGI above a filing-status threshold, added to regular tax
pub fn agi_surtax(p: &TaxParams, u: &mut TaxUnit) {
    // assigned rather than accumulated so repeated optimizer passes agree
    u.surtax = 0.0;
    if p.AGI_surtax_trt > 0.0 {
        let hi_agi_tax = p.AGI_surtax_trt * (u.c00100 - p.AGI_surtax_thd[u.mars_idx()]).max(0.0);
        u.taxbc += hi_agi_tax;
        u.surtax = hi_agi_tax;
    }
}
