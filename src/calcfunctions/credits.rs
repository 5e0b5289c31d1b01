//! Tax credits
//!
//! Nonrefundable credits are first computed at their full amounts and then
//! limited in [`nonrefundable_credits`] against tax liability in statutory
//! order. Refundable credits are totalled later in the `totals` stages.

use super::{ctc_child_count, TaxParams};
use crate::records::TaxUnit;

/// Number of whole or fractional phase-out steps, rounded up in exact mode
fn phaseout_steps(excess: f64, step: f64, exact: bool) -> f64 {
    let steps = excess / step;
    if exact {
        steps.ceil()
    } else {
        steps
    }
}

/// Form 2441 child and dependent care credit
pub fn f2441(p: &TaxParams, u: &mut TaxUnit) {
    let m = u.mars_idx();
    let exact = u.exact == 1.0;
    let max_credit = u.f2441.min(2.0) * p.CDCC_c;
    u.c32800 = u.e32800.min(max_credit).max(0.0);
    let spouse_earned = if u.MARS == 2.0 { u.earned_s } else { u.earned_p };
    let c33000 = u.c32800.min(u.earned_p).min(spouse_earned).max(0.0);

    let mut crate_ = p.CDCC_po1_rate_max;
    if u.c00100 > p.CDCC_ps1 {
        let steps = phaseout_steps(u.c00100 - p.CDCC_ps1, p.CDCC_po1_step_size, exact);
        crate_ = p
            .CDCC_po1_rate_min
            .max(p.CDCC_po1_rate_max - steps * p.CDCC_po_rate_per_step);
        let ps2 = p.CDCC_ps2[m].max(p.CDCC_ps1);
        if u.c00100 > ps2 {
            let steps = phaseout_steps(u.c00100 - ps2, p.CDCC_po2_step_size[m], exact);
            crate_ = p
                .CDCC_po2_rate_min
                .max(p.CDCC_po1_rate_min - steps * p.CDCC_po_rate_per_step);
        }
    }
    let c33200 = c33000 * crate_;
    if p.CDCC_refundable {
        u.c07180 = 0.0;
        u.CDCC_refund = c33200;
    } else {
        u.c07180 = (u.c05800 - u.e07300).max(0.0).min(c33200);
        u.CDCC_refund = 0.0;
    }
}

/// Phased-in, phased-out EITC amount
///
/// Phase-out applies to the larger of earnings and AGI, so the smaller
/// resulting credit wins.
pub fn eitc_amount(
    basic_frac: f64,
    phasein_rate: f64,
    earnings: f64,
    max_amount: f64,
    phaseout_start: f64,
    agi: f64,
    phaseout_rate: f64,
) -> f64 {
    let mut eitc = (basic_frac * max_amount + (1.0 - basic_frac) * phasein_rate * earnings)
        .min(max_amount);
    if earnings > phaseout_start || agi > phaseout_start {
        let eitcx = (max_amount
            - phaseout_rate * (earnings.max(agi) - phaseout_start).max(0.0))
        .max(0.0);
        eitc = eitc.min(eitcx);
    }
    eitc
}

fn in_eitc_age_range(p: &TaxParams, age: f64) -> bool {
    p.EITC_MinEligAge <= age && age <= p.EITC_MaxEligAge
}

/// Earned income tax credit
pub fn eitc(p: &TaxParams, u: &mut TaxUnit) {
    let k = (u.EIC as usize).min(3);
    let amount = |earnings: f64, ps: f64, agi: f64| {
        eitc_amount(
            p.EITC_basic_frac,
            p.EITC_rt[k],
            earnings,
            p.EITC_c[k],
            ps,
            agi,
            p.EITC_prt[k],
        )
    };

    u.c59660 = if u.MARS != 2.0 {
        let credit = amount(u.earned, p.EITC_ps[k], u.c00100);
        let age_ok = u.age_head == 0.0 || in_eitc_age_range(p, u.age_head);
        if k > 0 || age_ok {
            credit
        } else {
            0.0
        }
    } else {
        let po_start = p.EITC_ps[k] + p.EITC_ps_MarriedJ[k];
        let credit = if p.EITC_indiv {
            amount(u.earned_p, po_start, u.earned_p) + amount(u.earned_s, po_start, u.earned_s)
        } else {
            amount(u.earned, po_start, u.c00100)
        };
        let age_ok = u.age_head == 0.0
            || u.age_spouse == 0.0
            || in_eitc_age_range(p, u.age_head)
            || in_eitc_age_range(p, u.age_spouse);
        if k > 0 || age_ok {
            credit
        } else {
            0.0
        }
    };

    if (u.MARS == 3.0 && !p.EITC_sep_filers_elig) || u.DSI == 1.0 {
        u.c59660 = 0.0;
    }
    if u.c59660 > 0.0 {
        let invinc = u.e00400
            + u.e00300
            + u.e00600
            + u.c01000.max(0.0)
            + (u.e02000 - u.e26270).max(0.0);
        if invinc > p.EITC_InvestIncome_c {
            let reduced =
                u.c59660 - p.EITC_excess_InvestIncome_rt * (invinc - p.EITC_InvestIncome_c);
            u.c59660 = reduced.max(0.0);
        }
    }
}

/// Refundable credit against each spouse's payroll tax base
pub fn refundable_payroll_tax_credit(p: &TaxParams, u: &mut TaxUnit) {
    u.rptc_p = (u.was_plus_sey_p * p.RPTC_rt).min(p.RPTC_c);
    u.rptc_s = (u.was_plus_sey_s * p.RPTC_rt).min(p.RPTC_c);
    u.rptc = u.rptc_p + u.rptc_s;
}

/// Flat personal credits, refundable and nonrefundable, each with its own
/// AGI phase-out
pub fn personal_tax_credit(p: &TaxParams, u: &mut TaxUnit) {
    let m = u.mars_idx();
    let phased = |credit: f64, prt: f64, ps: f64| {
        if prt > 0.0 && u.c00100 > ps {
            (credit - prt * (u.c00100 - ps)).max(0.0)
        } else {
            credit
        }
    };
    u.personal_refundable_credit = phased(p.II_credit[m], p.II_credit_prt, p.II_credit_ps[m]);
    u.personal_nonrefundable_credit =
        phased(p.II_credit_nr[m], p.II_credit_nr_prt, p.II_credit_nr_ps[m]);
}

/// American Opportunity credit split into its refundable 40% (`c10960`) and
/// nonrefundable remainder (`c87668`)
pub fn am_opp_credit_parts(p: &TaxParams, u: &mut TaxUnit) {
    if u.e87521 <= 0.0 {
        u.c10960 = 0.0;
        u.c87668 = 0.0;
        return;
    }
    let c87658 = (90000.0 * u.num - u.c00100).max(0.0);
    let c87660 = 10000.0 * u.num;
    let ratio = c87658 / c87660;
    let ratio = if u.exact == 1.0 {
        (ratio * 1000.0).round() / 1000.0
    } else {
        ratio
    };
    let c87662 = 1000.0 * ratio.min(1.0);
    let c87664 = c87662 * u.e87521 / 1000.0;
    u.c10960 = 0.4 * c87664 * (1.0 - p.CR_AmOppRefundable_hc);
    u.c87668 = c87664 - u.c10960 * (1.0 - p.CR_AmOppNonRefundable_hc);
}

/// Schedule R credit for the elderly or disabled
pub fn sch_r(p: &TaxParams, u: &mut TaxUnit) {
    let aged = u.age_head >= 65.0 || (u.MARS == 2.0 && u.age_spouse >= 65.0);
    if !aged {
        u.c07200 = 0.0;
        return;
    }
    let (schr12, schr15) = match u.MARS as i32 {
        2 if u.age_head >= 65.0 && u.age_spouse >= 65.0 => (7500.0, 10000.0),
        2 => (5000.0, 10000.0),
        3 => (3750.0, 5000.0),
        1 | 4 => (5000.0, 7500.0),
        _ => (0.0, 0.0),
    };
    let nontaxable = (u.e02400 - u.c02500).max(0.0) + (u.e01500 - u.e01700).max(0.0);
    let schr17 = 0.5 * (u.c00100 - schr15).max(0.0);
    let schr19 = (schr12 - (nontaxable + schr17)).max(0.0);
    let schr20 = 0.15 * schr19;
    let schr21 = (u.c05800 - u.e07300 - u.c07180).max(0.0);
    u.c07200 = schr20.min(schr21) * (1.0 - p.CR_SchR_hc);
}

/// Lifetime Learning credit combined with the nonrefundable AOTC
pub fn education_tax_credit(p: &TaxParams, u: &mut TaxUnit) {
    let c87560 = 0.2 * u.e87530.min(p.LLC_Expense_c);
    let (c87570, c87600) = if u.MARS == 2.0 {
        (p.ETC_pe_Married * 1000.0, 20000.0)
    } else {
        (p.ETC_pe_Single * 1000.0, 10000.0)
    };
    let ratio = (c87570 - u.c00100).max(0.0) / c87600;
    let ratio = if u.exact == 1.0 {
        (ratio * 1000.0).round() / 1000.0
    } else {
        ratio
    };
    let c87620 = c87560 * ratio.min(1.0);
    let prior = u.e07300 + u.c07180 + u.c07200;
    let xline5 = c87620.min((u.c05800 - prior).max(0.0));
    let xline10 = u.c87668.min((u.c05800 - (prior + xline5)).max(0.0));
    u.c07230 = (xline5 + xline10) * (1.0 - p.CR_Education_hc);
}

/// Credit on charitable giving above a dollar and AGI-share floor
pub fn charity_credit(p: &TaxParams, u: &mut TaxUnit) {
    let total_charity = u.e19800 + u.e20100;
    let floor = (p.CR_Charity_frt * u.c00100).max(p.CR_Charity_f[u.mars_idx()]);
    u.charity_credit = p.CR_Charity_rt * (total_charity - floor).max(0.0);
}

/// Child tax credit and other dependent credit, Publication 972 worksheet
///
/// `codtc_limited` keeps the portion that exceeded tax liability for the
/// additional child tax credit.
pub fn child_dep_tax_credit(p: &TaxParams, u: &mut TaxUnit) {
    let m = u.mars_idx();
    let childnum = ctc_child_count(p, u);
    let line1 = p.CTC_c * childnum + p.CTC_c_under6_bonus * u.nu06;
    let line2 = p.ODC_c * (u.XTOT - childnum - u.num).max(0.0);
    let line3 = line1 + line2;
    let line10 = if line3 > 0.0 && u.c00100 > p.CTC_ps[m] {
        let mut excess = u.c00100 - p.CTC_ps[m];
        if u.exact == 1.0 {
            excess = 1000.0 * (excess / 1000.0).ceil();
        }
        (line3 - p.CTC_prt * excess).max(0.0)
    } else {
        line3
    };
    if line10 <= 0.0 {
        u.c07220 = 0.0;
        u.odc = 0.0;
        u.codtc_limited = 0.0;
        return;
    }
    let line12 = u.e07260 * (1.0 - p.CR_ResidentialEnergy_hc)
        + u.e07300 * (1.0 - p.CR_ForeignTax_hc)
        + u.c07180
        + u.c07230
        + u.e07240 * (1.0 - p.CR_RetirementSavings_hc)
        + u.c07200;
    let line15 = (u.c05800 - line12).max(0.0);
    if p.CTC_is_refundable {
        u.c07220 = line10 * line1 / line3;
        u.odc = (line10 - u.c07220).max(0.0);
        u.codtc_limited = 0.0;
    } else {
        let line16 = line10.min(line15);
        u.c07220 = line16 * line1 / line3;
        u.odc = (line16 - u.c07220).max(0.0);
        u.codtc_limited = (line10 - line16).max(0.0);
    }
}

/// Limit each nonrefundable credit to the liability left after the
/// credits ahead of it, applying its haircut
pub fn nonrefundable_credits(p: &TaxParams, u: &mut TaxUnit) {
    let mut avail = u.c05800;
    let mut take = |amount: f64| {
        let used = amount.min(avail);
        avail -= used;
        used
    };
    u.c07300 = take(u.e07300 * (1.0 - p.CR_ForeignTax_hc));
    u.c07180 = take(u.c07180);
    u.c07230 = take(u.c07230);
    u.c07240 = take(u.e07240 * (1.0 - p.CR_RetirementSavings_hc));
    if !p.CTC_is_refundable {
        u.c07220 = take(u.c07220);
        u.odc = take(u.odc);
    }
    u.c07260 = take(u.e07260 * (1.0 - p.CR_ResidentialEnergy_hc));
    u.c07400 = take(u.e07400 * (1.0 - p.CR_GeneralBusiness_hc));
    u.c07600 = take(u.e07600 * (1.0 - p.CR_MinimumTax_hc));
    u.c07200 = take(u.c07200);
    u.c08000 = take(u.p08000 * (1.0 - p.CR_OtherCredits_hc));
    u.charity_credit = take(u.charity_credit);
    u.personal_nonrefundable_credit = take(u.personal_nonrefundable_credit);
}

/// Form 8812 additional child tax credit
pub fn additional_ctc(p: &TaxParams, u: &mut TaxUnit) {
    u.c11070 = 0.0;
    if p.CTC_is_refundable {
        return;
    }
    let childnum = ctc_child_count(p, u);
    let line3 = u.codtc_limited;
    let line4 = p.ACTC_c.min(p.CTC_c) * childnum;
    if line3 <= 0.0 || line4 <= 0.0 {
        return;
    }
    let line5 = line3.min(line4);
    let line7 = (u.earned - p.ACTC_Income_thd).max(0.0);
    let rate = if u.nu06 == 0.0 {
        p.ACTC_rt
    } else {
        p.ACTC_rt + p.ACTC_rt_bonus_under6family
    };
    let line8 = rate * line7;
    u.c11070 = if childnum < p.ACTC_ChildNum {
        if line8 > 0.0 {
            line5.min(line8)
        } else {
            0.0
        }
    } else if line8 >= line5 {
        line5
    } else {
        // larger families may use payroll tax net of EITC instead
        let line11 = 0.5 * u.ptax_was + u.c03260 + u.e09800;
        let line12 = u.c59660 + u.e11200;
        let line13 = (line11 - line12).max(0.0);
        line5.min(line8.max(line13))
    };
}

/// Optional refundable child credit outside the regular CTC
pub fn ctc_new(p: &TaxParams, u: &mut TaxUnit) {
    let childnum = ctc_child_count(p, u);
    if childnum <= 0.0 {
        u.ctc_new = 0.0;
        return;
    }
    let posagi = u.c00100.max(0.0);
    let mut credit = p.CTC_new_c * childnum + p.CTC_new_c_under6_bonus * u.nu06;
    if !p.CTC_new_for_all {
        credit = credit.min(p.CTC_new_rt * posagi);
    }
    let ymax = p.CTC_new_ps[u.mars_idx()];
    if posagi > ymax {
        let over = posagi - ymax;
        let excess = if u.exact == 1.0 {
            (over / 1000.0).ceil() * 1000.0
        } else {
            over
        };
        credit = credit.min((credit - p.CTC_new_prt * excess).max(0.0));
    }
    if credit > 0.0 && p.CTC_new_refund_limited {
        let refund_new = (credit - u.c09200).max(0.0);
        let payroll = if p.CTC_new_refund_limited_all_payroll {
            u.payrolltax
        } else {
            u.ptax_oasdi
        };
        let limit_new = p.CTC_new_refund_limit_payroll_rt * payroll;
        let limited_new = (refund_new - limit_new).max(0.0);
        credit = (credit - limited_new).max(0.0);
    }
    u.ctc_new = credit;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Policy;
    use approx::assert_abs_diff_eq;

    fn params(year: i32) -> TaxParams {
        let mut pol = Policy::new().unwrap();
        pol.set_year(year).unwrap();
        TaxParams::from_policy(&pol).unwrap()
    }

    #[test]
    fn test_eitc_maximum_hoh_three_children() {
        for (year, max) in [(2020, 6660.0), (2023, 7430.0)] {
            let p = params(year);
            let mut u = TaxUnit {
                MARS: 4.0,
                EIC: 3.0,
                age_head: 35.0,
                earned: 19330.0,
                c00100: 19330.0,
                ..Default::default()
            };
            eitc(&p, &mut u);
            assert_abs_diff_eq!(u.c59660, max, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_eitc_childless_age_limits() {
        let p = params(2019);
        let mut young = TaxUnit {
            MARS: 1.0,
            age_head: 22.0,
            earned: 7000.0,
            c00100: 7000.0,
            ..Default::default()
        };
        eitc(&p, &mut young);
        assert_eq!(young.c59660, 0.0);

        let mut eligible = TaxUnit {
            age_head: 30.0,
            ..young.clone()
        };
        eitc(&p, &mut eligible);
        assert!(eligible.c59660 > 0.0);
    }

    #[test]
    fn test_eitc_investment_income_disqualifies() {
        let p = params(2023);
        let mut u = TaxUnit {
            MARS: 4.0,
            EIC: 1.0,
            age_head: 35.0,
            earned: 15000.0,
            c00100: 30000.0,
            e00300: 15000.0,
            ..Default::default()
        };
        eitc(&p, &mut u);
        assert_eq!(u.c59660, 0.0);
    }

    #[test]
    fn test_eitc_amount_phaseout_uses_larger_income() {
        let by_earnings = eitc_amount(0.0, 0.34, 30000.0, 3995.0, 21560.0, 10000.0, 0.1598);
        let by_agi = eitc_amount(0.0, 0.34, 10000.0, 3995.0, 21560.0, 30000.0, 0.1598);
        let expected = 3995.0 - 0.1598 * (30000.0 - 21560.0);
        assert_abs_diff_eq!(by_earnings, expected, epsilon = 1e-9);
        assert_abs_diff_eq!(by_agi, expected.min(3400.0), epsilon = 1e-9);
    }

    #[test]
    fn test_ctc_limited_by_liability() {
        let p = params(2023);
        let mut u = TaxUnit {
            MARS: 2.0,
            XTOT: 4.0,
            num: 2.0,
            n24: 2.0,
            nu06: 2.0,
            age_head: 30.0,
            age_spouse: 30.0,
            c00100: 60000.0,
            c05800: 3000.0,
            ..Default::default()
        };
        child_dep_tax_credit(&p, &mut u);
        assert_eq!(u.c07220, 3000.0);
        assert_eq!(u.odc, 0.0);
        assert_eq!(u.codtc_limited, 1000.0);
    }

    #[test]
    fn test_other_dependent_credit() {
        let p = params(2023);
        let mut u = TaxUnit {
            MARS: 4.0,
            XTOT: 2.0,
            num: 1.0,
            age_head: 50.0,
            c00100: 60000.0,
            c05800: 5000.0,
            ..Default::default()
        };
        child_dep_tax_credit(&p, &mut u);
        assert_eq!(u.c07220, 0.0);
        assert_eq!(u.odc, 500.0);
    }

    #[test]
    fn test_ctc_phaseout_exact_steps() {
        let p = params(2023);
        let mut u = TaxUnit {
            MARS: 1.0,
            XTOT: 2.0,
            num: 1.0,
            n24: 1.0,
            age_head: 40.0,
            exact: 1.0,
            c00100: 200000.0 + 1.0,
            c05800: 50000.0,
            ..Default::default()
        };
        child_dep_tax_credit(&p, &mut u);
        assert_abs_diff_eq!(u.c07220, 2000.0 - 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_additional_ctc_from_earnings() {
        let p = params(2023);
        let mut u = TaxUnit {
            MARS: 1.0,
            n24: 1.0,
            earned: 12500.0,
            codtc_limited: 2000.0,
            ..Default::default()
        };
        additional_ctc(&p, &mut u);
        // 15% of earnings above 2500, below the 1600 refundable cap
        assert_abs_diff_eq!(u.c11070, 1500.0, epsilon = 1e-9);
    }

    #[test]
    fn test_nonrefundable_cascade_order() {
        let p = params(2023);
        let mut u = TaxUnit {
            c05800: 1000.0,
            e07300: 400.0,
            c07180: 300.0,
            c07220: 2000.0,
            ..Default::default()
        };
        nonrefundable_credits(&p, &mut u);
        assert_eq!(u.c07300, 400.0);
        assert_eq!(u.c07180, 300.0);
        assert_eq!(u.c07220, 300.0);
        assert_eq!(u.c07200, 0.0);
    }

    #[test]
    fn test_dependent_care_credit_rate() {
        let p = params(2023);
        let mut u = TaxUnit {
            MARS: 2.0,
            f2441: 2.0,
            e32800: 8000.0,
            earned_p: 50000.0,
            earned_s: 30000.0,
            c00100: 80000.0,
            c05800: 5000.0,
            ..Default::default()
        };
        f2441(&p, &mut u);
        assert_eq!(u.c32800, 6000.0);
        assert_abs_diff_eq!(u.c07180, 6000.0 * 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_aotc_split() {
        let p = params(2023);
        let mut u = TaxUnit {
            num: 1.0,
            c00100: 50000.0,
            e87521: 2500.0,
            ..Default::default()
        };
        am_opp_credit_parts(&p, &mut u);
        assert_abs_diff_eq!(u.c10960, 1000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(u.c87668, 1500.0, epsilon = 1e-9);
    }

    #[test]
    fn test_schedule_r_for_low_income_elderly() {
        let p = params(2023);
        let mut u = TaxUnit {
            MARS: 1.0,
            age_head: 70.0,
            c00100: 8000.0,
            c05800: 2000.0,
            ..Default::default()
        };
        sch_r(&p, &mut u);
        // 15% of (5000 - 0.5 * 500)
        assert_abs_diff_eq!(u.c07200, 0.15 * 4750.0, epsilon = 1e-9);
    }

    fn ctc_new_params() -> TaxParams {
        let mut p = params(2023);
        p.CTC_include17 = false;
        p.CTC_new_c = 1000.0;
        p.CTC_new_c_under6_bonus = 0.0;
        p.CTC_new_rt = 0.15;
        p.CTC_new_prt = 0.05;
        p.CTC_new_ps = [9e99; 5];
        p.CTC_new_for_all = true;
        p.CTC_new_refund_limited = false;
        p.CTC_new_refund_limited_all_payroll = false;
        p.CTC_new_refund_limit_payroll_rt = 0.5;
        p
    }

    fn two_children(agi: f64) -> TaxUnit {
        TaxUnit {
            MARS: 1.0,
            age_head: 40.0,
            n24: 2.0,
            c00100: agi,
            ..Default::default()
        }
    }

    #[test]
    fn test_ctc_new_phase_in_when_not_for_all() {
        let mut p = ctc_new_params();
        let mut u = two_children(10000.0);
        ctc_new(&p, &mut u);
        assert_abs_diff_eq!(u.ctc_new, 2000.0, epsilon = 1e-9);

        p.CTC_new_for_all = false;
        ctc_new(&p, &mut u);
        assert_abs_diff_eq!(u.ctc_new, 1500.0, epsilon = 1e-9);

        let mut childless = TaxUnit {
            n24: 0.0,
            ..two_children(10000.0)
        };
        ctc_new(&p, &mut childless);
        assert_eq!(childless.ctc_new, 0.0);
    }

    #[test]
    fn test_ctc_new_phaseout_rounds_up_when_exact() {
        let mut p = ctc_new_params();
        p.CTC_new_ps = [75000.0; 5];
        let mut u = two_children(75500.0);
        ctc_new(&p, &mut u);
        assert_abs_diff_eq!(u.ctc_new, 1975.0, epsilon = 1e-9);

        u.exact = 1.0;
        ctc_new(&p, &mut u);
        assert_abs_diff_eq!(u.ctc_new, 1950.0, epsilon = 1e-9);

        let mut high = two_children(200000.0);
        ctc_new(&p, &mut high);
        assert_eq!(high.ctc_new, 0.0);
    }

    #[test]
    fn test_ctc_new_refund_limited_by_payroll_tax() {
        let mut p = ctc_new_params();
        p.CTC_new_refund_limited = true;
        let mut u = TaxUnit {
            c09200: 500.0,
            ptax_oasdi: 1000.0,
            payrolltax: 3000.0,
            ..two_children(50000.0)
        };
        // refundable part 1500 limited to half of OASDI tax
        ctc_new(&p, &mut u);
        assert_abs_diff_eq!(u.ctc_new, 1000.0, epsilon = 1e-9);

        p.CTC_new_refund_limited_all_payroll = true;
        ctc_new(&p, &mut u);
        assert_abs_diff_eq!(u.ctc_new, 2000.0, epsilon = 1e-9);

        u.payrolltax = 0.0;
        ctc_new(&p, &mut u);
        assert_abs_diff_eq!(u.ctc_new, 500.0, epsilon = 1e-9);
    }
}
