//! End-to-end filing unit cases and cross-variable identities

use super::*;
use approx::assert_abs_diff_eq;

fn wage_earner(mars: f64, wages: f64) -> TaxUnit {
    let joint = mars == 2.0;
    TaxUnit {
        RECID: 1.0,
        MARS: mars,
        XTOT: if joint { 2.0 } else { 1.0 },
        age_head: 30.0,
        age_spouse: if joint { 30.0 } else { 0.0 },
        e00200: wages,
        e00200p: if joint { wages / 2.0 } else { wages },
        e00200s: if joint { wages / 2.0 } else { 0.0 },
        s006: 1.0,
        ..Default::default()
    }
}

fn run(units: Vec<TaxUnit>, year: i32) -> Calculator {
    let mut pol = Policy::new().unwrap();
    pol.set_year(year).unwrap();
    let recs = Records::new(units, year).unwrap();
    let mut calc = Calculator::new(pol, recs, None).unwrap();
    calc.calc_all(false).unwrap();
    calc
}

/// A varied table used for the identities
fn mixed_units() -> Vec<TaxUnit> {
    let mut units = vec![
        wage_earner(1.0, 50000.0),
        wage_earner(2.0, 80000.0),
        wage_earner(1.0, 1_000_000.0),
        wage_earner(3.0, 40000.0),
        wage_earner(1.0, 0.0),
    ];
    let mut kids = wage_earner(4.0, 19330.0);
    kids.EIC = 3.0;
    kids.n24 = 3.0;
    kids.nu18 = 3.0;
    kids.XTOT = 4.0;
    units.push(kids);
    let mut itemizer = wage_earner(1.0, 200000.0);
    itemizer.e18400 = 20000.0;
    itemizer.e19200 = 10000.0;
    itemizer.e19800 = 5000.0;
    units.push(itemizer);
    let mut investor = wage_earner(2.0, 150000.0);
    investor.e00300 = 40000.0;
    investor.e00600 = 60000.0;
    investor.e00650 = 50000.0;
    investor.p23250 = 120000.0;
    investor.e02400 = 30000.0;
    investor.e00900 = 25000.0;
    investor.e00900p = 25000.0;
    investor.e02000 = 15000.0;
    investor.e26270 = 15000.0;
    investor.age_head = 70.0;
    units.push(investor);
    let mut retiree = wage_earner(1.0, 0.0);
    retiree.age_head = 68.0;
    retiree.e02400 = 24000.0;
    retiree.e01700 = 18000.0;
    retiree.snap_ben = 1200.0;
    retiree.mcare_ben = 9000.0;
    units.push(retiree);
    units
}

#[test]
fn test_single_fifty_thousand() {
    let calc = run(vec![wage_earner(1.0, 50000.0)], 2023);
    let u = &calc.records().units()[0];
    assert_abs_diff_eq!(u.c00100, 50000.0, epsilon = 1e-9);
    assert_abs_diff_eq!(u.standard, 13850.0, epsilon = 1e-9);
    assert_abs_diff_eq!(u.c04800, 36150.0, epsilon = 1e-9);
    assert_abs_diff_eq!(u.iitax, 4118.0, epsilon = 1e-6);
    assert_abs_diff_eq!(u.payrolltax, 7650.0, epsilon = 1e-6);
}

#[test]
fn test_married_two_young_children() {
    let mut u = wage_earner(2.0, 80000.0);
    u.XTOT = 4.0;
    u.n24 = 2.0;
    u.nu18 = 2.0;
    u.nu13 = 2.0;
    u.nu06 = 2.0;
    u.EIC = 2.0;
    let calc = run(vec![u], 2023);
    let u = &calc.records().units()[0];
    assert_abs_diff_eq!(u.standard, 27700.0, epsilon = 1e-9);
    assert_abs_diff_eq!(u.c04800, 52300.0, epsilon = 1e-9);
    assert_abs_diff_eq!(u.c05800, 5836.0, epsilon = 1e-6);
    assert_abs_diff_eq!(u.c07220, 4000.0, epsilon = 1e-6);
    assert_abs_diff_eq!(u.iitax, 1836.0, epsilon = 1e-6);
}

#[test]
fn test_head_of_household_maximum_eitc() {
    let mut u = wage_earner(4.0, 19330.0);
    u.EIC = 3.0;
    u.n24 = 3.0;
    u.nu18 = 3.0;
    u.XTOT = 4.0;
    let calc = run(vec![u.clone()], 2020);
    assert_abs_diff_eq!(calc.records().units()[0].c59660, 6660.0, epsilon = 1e-6);
    // the maximum credit is indexed; by 2023 it has grown to 7430
    let calc = run(vec![u], 2023);
    assert_abs_diff_eq!(calc.records().units()[0].c59660, 7430.0, epsilon = 1e-6);
}

#[test]
fn test_high_income_joint_filers() {
    let calc = run(vec![wage_earner(2.0, 1_100_000.0)], 2023);
    let u = &calc.records().units()[0];
    assert_eq!(u.c04600, 0.0);
    assert_eq!(u.c09600, 0.0);
    assert_abs_diff_eq!(u.c04800, 1_072_300.0, epsilon = 1e-6);
    assert_abs_diff_eq!(u.taxbc, 326665.0, epsilon = 1e-6);
    assert_abs_diff_eq!(u.ptax_amc, 0.009 * 850000.0, epsilon = 1e-6);
    assert_abs_diff_eq!(u.iitax, 326665.0 + 7650.0, epsilon = 1e-6);
}

#[test]
fn test_itemizer_beats_standard_deduction() {
    let mut u = wage_earner(1.0, 200000.0);
    u.e18400 = 20000.0;
    u.e19200 = 10000.0;
    u.e19800 = 5000.0;
    let calc = run(vec![u], 2023);
    let u = &calc.records().units()[0];
    assert_eq!(u.standard, 0.0);
    assert_abs_diff_eq!(u.c04470, 25000.0, epsilon = 1e-6);
    assert_abs_diff_eq!(u.c04800, 175000.0, epsilon = 1e-6);
}

#[test]
fn test_small_itemized_amounts_take_standard() {
    let mut u = wage_earner(1.0, 60000.0);
    u.e18400 = 3000.0;
    u.e19800 = 1000.0;
    let calc = run(vec![u], 2023);
    let u = &calc.records().units()[0];
    assert_abs_diff_eq!(u.standard, 13850.0, epsilon = 1e-9);
    assert_eq!(u.c04470, 0.0);
    assert_eq!(u.c21060, 0.0);
}

#[test]
fn test_mtr_sign_of_finite_difference_does_not_matter() {
    let mut calc = run(vec![wage_earner(1.0, 500000.0)], 2023);
    let up = calc.mtr("e00200p", MtrOptions::default()).unwrap();
    let down = calc
        .mtr(
            "e00200p",
            MtrOptions {
                negative_finite_diff: true,
                ..Default::default()
            },
        )
        .unwrap();
    assert_abs_diff_eq!(up.combined[0], down.combined[0], epsilon = 1e-6);
    assert_abs_diff_eq!(up.incometax[0], down.incometax[0], epsilon = 1e-6);
}

#[test]
fn test_mtr_top_bracket() {
    let mut calc = run(vec![wage_earner(1.0, 1_000_000.0)], 2023);
    let p = TaxParams::from_policy(calc.policy()).unwrap();
    let rates = calc
        .mtr(
            "e00200p",
            MtrOptions {
                wrt_full_compensation: false,
                ..Default::default()
            },
        )
        .unwrap();
    assert_abs_diff_eq!(rates.payrolltax[0], p.fica_mc_rate(), epsilon = 1e-6);
    // Additional Medicare Tax is collected with income tax
    assert_abs_diff_eq!(rates.incometax[0], p.II_rt7 + p.AMEDT_rt, epsilon = 1e-6);
}

#[test]
fn test_mtr_negative_in_eitc_phase_in() {
    let mut u = wage_earner(4.0, 8000.0);
    u.EIC = 2.0;
    u.n24 = 2.0;
    u.nu18 = 2.0;
    u.XTOT = 3.0;
    let mut calc = run(vec![u], 2023);
    let rates = calc.mtr("e00200p", MtrOptions::default()).unwrap();
    assert!(rates.incometax[0] < -0.3);
    assert!(rates.combined[0] < 0.0);
}

#[test]
fn test_liability_identities() {
    let calc = run(mixed_units(), 2023);
    for u in calc.records().units() {
        let refundable = u.eitc
            + u.c11070
            + u.c10960
            + u.CDCC_refund
            + u.personal_refundable_credit
            + u.ctc_new
            + u.rptc;
        assert_abs_diff_eq!(u.iitax, u.c09200 - refundable, epsilon = 1e-6);
        assert_abs_diff_eq!(u.combined, u.iitax + u.payrolltax, epsilon = 1e-6);
        assert_abs_diff_eq!(u.ptax_was, u.ptax_oasdi_wage + u.ptax_hi_wage, epsilon = 1e-6);
        assert_abs_diff_eq!(u.c21060 - u.c21040, u.c04470, epsilon = 1e-6);
        assert_abs_diff_eq!(u.taxbc + u.c09600, u.c05800, epsilon = 1e-6);
        assert_abs_diff_eq!(u.c05800 + u.othertaxes - u.c07100, u.c09200, epsilon = 1e-6);
        assert!(u.standard == 0.0 || u.c04470 == 0.0);
    }
}

#[test]
fn test_repealing_every_benefit_zeroes_cost() {
    let mut pol = Policy::new().unwrap();
    pol.set_year(2023).unwrap();
    let recs = Records::new(mixed_units(), 2023).unwrap();
    let mut calc = Calculator::new(pol, recs, None).unwrap();
    calc.calc_all(false).unwrap();
    assert!(calc.weighted_total("benefit_cost_total").unwrap() > 0.0);
    for program in [
        "housing", "ssi", "snap", "tanf", "vet", "wic", "mcare", "mcaid", "oasdi", "ui", "other",
    ] {
        calc.set_policy_param(&format!("BEN_{}_repeal", program), vec![1.0])
            .unwrap();
    }
    calc.calc_all(false).unwrap();
    for u in calc.records().units() {
        assert_eq!(u.benefit_cost_total, 0.0);
    }
}

#[test]
fn test_store_perturb_restore_round_trip() {
    let mut calc = run(mixed_units(), 2023);
    let before = calc.records().units().to_vec();
    calc.store_records().unwrap();
    let bump = vec![1000.0; calc.array_len()];
    calc.incarray("e00300", &bump).unwrap();
    calc.calc_all(false).unwrap();
    assert_ne!(calc.records().units(), before.as_slice());
    calc.restore_records().unwrap();
    calc.calc_all(false).unwrap();
    assert_eq!(calc.records().units(), before.as_slice());
}

#[test]
fn test_zero_out_gives_same_results() {
    let mut calc = run(mixed_units(), 2023);
    let once = calc.records().units().to_vec();
    calc.calc_all(true).unwrap();
    assert_eq!(calc.records().units(), once.as_slice());
}
