//! Adjustments, capital gains, Social Security benefits and AGI

use super::TaxParams;
use crate::records::TaxUnit;

/// Above-the-line deduction for dependent care, available only below the
/// earnings threshold
pub fn dependent_care(p: &TaxParams, u: &mut TaxUnit) {
    let m = u.mars_idx();
    u.care_deduction = if u.earned <= p.ALD_Dependents_thd[m] {
        let keep = 1.0 - p.ALD_Dependents_hc;
        keep * u.nu13 * p.ALD_Dependents_Child_c
            + keep * u.elderly_dependents * p.ALD_Dependents_Elder_c
    } else {
        0.0
    };
}

/// Total above-the-line adjustments, each item scaled by `1 - haircut`
pub fn adj(p: &TaxParams, u: &mut TaxUnit) {
    u.c02900 = (1.0 - p.ALD_StudentLoan_hc) * u.e03210
        + u.c03260
        + (1.0 - p.ALD_EarlyWithdraw_hc) * u.e03400
        + (1.0 - p.ALD_AlimonyPaid_hc) * u.e03500
        + (1.0 - p.ALD_AlimonyReceived_hc) * u.e00800
        + (1.0 - p.ALD_EducatorExpenses_hc) * u.e03220
        + (1.0 - p.ALD_Tuition_hc) * u.e03230
        + (1.0 - p.ALD_DomesticProduction_hc) * u.e03240
        + (1.0 - p.ALD_HSADeduction_hc) * u.e03290
        + (1.0 - p.ALD_SelfEmp_HealthIns_hc) * u.e03270
        + (1.0 - p.ALD_IRAContributions_hc) * u.e03150
        + (1.0 - p.ALD_KEOGH_SEP_hc) * u.e03300
        + u.care_deduction;
}

/// Net capital gain after the capital loss limitation
fn limited_capital_gain(p: &TaxParams, u: &TaxUnit) -> f64 {
    (-p.Capital_loss_limitation[u.mars_idx()] / u.sep).max(u.p22250 + u.p23250)
}

/// Base for the investment income exclusion
pub fn inv_inc_ec_base(p: &TaxParams, u: &mut TaxUnit) {
    let cgain = limited_capital_gain(p, u);
    u.invinc_ec_base = u.e00300 + u.e00600 + cgain + u.e01100 + u.e01200;
}

/// Capital gains, investment income exclusion and the income measures that
/// feed AGI and the Social Security benefit test
pub fn cap_gains(p: &TaxParams, u: &mut TaxUnit) {
    let m = u.mars_idx();
    u.c23650 = u.p23250 + u.p22250;
    u.c01000 = limited_capital_gain(p, u);
    let invinc = u.e00300 + u.e00600 + u.c01000 + u.e01100 + u.e01200;
    u.invinc_agi_ec = p.ALD_InvInc_ec_rt * u.invinc_ec_base.max(0.0);
    u.ymod1 = u.e00200
        + u.e00700
        + u.e00800
        + u.e01400
        + u.e01700
        + invinc
        - u.invinc_agi_ec
        + u.e02100
        + u.e02300
        + (u.e00900 + u.e02000).max(-p.ALD_BusinessLosses_c[m]);
    if p.CG_nodiff {
        // qualified dividends and long-term gains taxed as ordinary income
        // less an exclusion
        let qdcg_pos = (u.e00650 + u.c01000).max(0.0);
        let exclusion =
            p.CG_ec.min(qdcg_pos) + p.CG_reinvest_ec_rt * (qdcg_pos - p.CG_ec).max(0.0);
        u.ymod1 = (u.ymod1 - exclusion).max(0.0);
        u.invinc_agi_ec += exclusion;
    }
    let ymod2 = u.e00400 + 0.5 * u.e02400 - u.c02900;
    let ymod3 = (1.0 - p.ALD_StudentLoan_hc) * u.e03210 + u.e03230 + u.e03240;
    u.ymod = u.ymod1 + ymod2 + ymod3;
}

/// Taxable Social Security benefits under the two-threshold rule
pub fn ss_benefits(p: &TaxParams, u: &mut TaxUnit) {
    let m = u.mars_idx();
    let (thd1, thd2) = (p.SS_thd1[m], p.SS_thd2[m]);
    u.c02500 = if u.ymod < thd1 {
        0.0
    } else if u.ymod < thd2 {
        p.SS_percentage1 * (u.ymod - thd1).min(u.e02400)
    } else {
        (p.SS_percentage2 * (u.ymod - thd2)
            + p.SS_percentage1 * u.e02400.min(thd2 - thd1))
        .min(p.SS_percentage2 * u.e02400)
    };
    if p.SS_all_in_agi {
        u.c02500 = u.e02400;
    }
}

/// AGI and the personal exemption after its phase-out
pub fn agi(p: &TaxParams, u: &mut TaxUnit) {
    let m = u.mars_idx();
    u.c00100 = u.ymod1 + u.c02500 - u.c02900 + u.taxable_ubi;
    let ui_excluded = if u.c00100 - u.e02300 <= p.UI_thd[m] {
        u.e02300.min(p.UI_em)
    } else {
        0.0
    };
    u.c00100 -= ui_excluded;

    u.pre_c04600 = if p.II_no_em_nu18 {
        (u.XTOT - u.nu18).max(0.0) * p.II_em
    } else {
        u.XTOT * p.II_em
    };
    if u.DSI == 1.0 {
        u.pre_c04600 = 0.0;
    }

    let step = 2500.0 / u.sep;
    u.c04600 = if u.exact == 1.0 {
        let line5 = (u.c00100 - p.II_em_ps[m]).max(0.0);
        let line7 = p.II_prt * (line5 / step).ceil();
        (u.pre_c04600 * (1.0 - line7)).max(0.0)
    } else {
        let dispc = (p.II_prt * (u.c00100 - p.II_em_ps[m]) / step).clamp(0.0, 1.0);
        u.pre_c04600 * (1.0 - dispc)
    };
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

    fn run_to_agi(p: &TaxParams, u: &mut TaxUnit) {
        u.set_filing_counts();
        super::super::payroll::ei_payroll_tax(p, u);
        dependent_care(p, u);
        adj(p, u);
        inv_inc_ec_base(p, u);
        cap_gains(p, u);
        ss_benefits(p, u);
        super::super::benefits::ubi(p, u);
        agi(p, u);
    }

    #[test]
    fn test_capital_loss_limited() {
        let p = params(2023);
        let mut u = TaxUnit {
            MARS: 3.0,
            p23250: -10000.0,
            e00200: 40000.0,
            e00200p: 40000.0,
            ..Default::default()
        };
        run_to_agi(&p, &mut u);
        assert_eq!(u.c23650, -10000.0);
        assert_eq!(u.c01000, -1500.0);
        assert_abs_diff_eq!(u.c00100, 38500.0, epsilon = 1e-9);
    }

    #[test]
    fn test_social_security_inclusion_tiers() {
        let p = params(2023);
        let mut low = TaxUnit {
            MARS: 1.0,
            e02400: 20000.0,
            e00300: 5000.0,
            ..Default::default()
        };
        run_to_agi(&p, &mut low);
        // ymod = 5000 + 10000 is below the 25000 single threshold
        assert_eq!(low.c02500, 0.0);

        let mut high = TaxUnit {
            MARS: 1.0,
            e02400: 20000.0,
            e00300: 100000.0,
            ..Default::default()
        };
        run_to_agi(&p, &mut high);
        assert_abs_diff_eq!(high.c02500, 0.85 * 20000.0, epsilon = 1e-9);

        let mut mid = TaxUnit {
            MARS: 1.0,
            e02400: 20000.0,
            e00300: 20000.0,
            ..Default::default()
        };
        run_to_agi(&p, &mut mid);
        // ymod = 30000, between 25000 and 34000
        assert_abs_diff_eq!(mid.c02500, 0.5 * 5000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_business_losses_capped() {
        let mut p = params(2023);
        p.ALD_BusinessLosses_c = [10000.0; 5];
        let mut u = TaxUnit {
            MARS: 1.0,
            e00200: 50000.0,
            e00200p: 50000.0,
            e02000: -30000.0,
            ..Default::default()
        };
        run_to_agi(&p, &mut u);
        assert_abs_diff_eq!(u.c00100, 40000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_exemption_phaseout_modes() {
        let mut p = params(2017);
        p.II_em = 4050.0;
        let ps = p.II_em_ps[0];
        let mut exact = TaxUnit {
            MARS: 1.0,
            XTOT: 1.0,
            exact: 1.0,
            e00200: ps + 100.0,
            e00200p: ps + 100.0,
            ..Default::default()
        };
        run_to_agi(&p, &mut exact);
        assert_abs_diff_eq!(exact.c04600, 4050.0 * (1.0 - p.II_prt), epsilon = 1e-9);

        let mut smooth = TaxUnit {
            exact: 0.0,
            ..exact.clone()
        };
        run_to_agi(&p, &mut smooth);
        assert_abs_diff_eq!(
            smooth.c04600,
            4050.0 * (1.0 - p.II_prt * 100.0 / 2500.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_dependents_get_no_exemption() {
        let mut p = params(2017);
        p.II_em = 4050.0;
        let mut u = TaxUnit {
            MARS: 1.0,
            XTOT: 1.0,
            DSI: 1.0,
            ..Default::default()
        };
        run_to_agi(&p, &mut u);
        assert_eq!(u.pre_c04600, 0.0);
    }
}
