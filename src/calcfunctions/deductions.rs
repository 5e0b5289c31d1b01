//! Itemized and standard deductions and taxable income

use super::TaxParams;
use crate::records::TaxUnit;

/// Cap the itemizable amounts flagged in `ID_AmountCap_Switch` at a share
/// of AGI, allocating any overage across them in proportion to size
///
/// The `*_capped` variables are what Schedule A reads; they equal the raw
/// amounts when the cap does not bind.
pub fn item_ded_cap(p: &TaxParams, u: &mut TaxUnit) {
    u.e17500_capped = u.e17500;
    u.e18400_capped = u.e18400;
    u.e18500_capped = u.e18500;
    u.g20500_capped = u.g20500;
    u.e20400_capped = u.e20400;
    u.e19200_capped = u.e19200;
    u.e19800_capped = u.e19800;
    u.e20100_capped = u.e20100;

    let sw = &p.ID_AmountCap_Switch;
    let cap = (p.ID_AmountCap_rt * u.c00100).max(0.0);
    let mut gross = 0.0;
    for (on, amount) in [
        (sw[0], u.e17500),
        (sw[1], u.e18400),
        (sw[2], u.e18500),
        (sw[3], u.g20500),
        (sw[4], u.e20400),
        (sw[5], u.e19200),
        (sw[6], u.e19800 + u.e20100),
    ] {
        if on {
            gross += amount;
        }
    }
    let overage = (gross - cap).max(0.0);
    if overage <= 0.0 || u.c00100 <= 0.0 {
        return;
    }
    let share = |amount: f64| amount / gross * overage;
    if sw[0] {
        u.e17500_capped -= share(u.e17500);
    }
    if sw[1] {
        u.e18400_capped -= share(u.e18400);
    }
    if sw[2] {
        u.e18500_capped -= share(u.e18500);
    }
    if sw[3] {
        u.g20500_capped -= share(u.g20500);
    }
    if sw[4] {
        u.e20400_capped -= share(u.e20400);
    }
    if sw[5] {
        u.e19200_capped -= share(u.e19200);
    }
    if sw[6] {
        u.e19800_capped -= share(u.e19800);
        u.e20100_capped -= share(u.e20100);
    }
}

/// Schedule A itemized deductions
///
/// Each category applies its floor, haircut and ceiling. State and local
/// taxes are then capped jointly, the Pease limitation disallows the lesser
/// of `ID_crt` times the limitable deductions and `ID_prt` times AGI above
/// `ID_ps`, and `ID_c` caps the total.
pub fn item_ded(p: &TaxParams, u: &mut TaxUnit) {
    let m = u.mars_idx();
    let posagi = u.c00100.max(0.0);

    // medical
    let mut medical_frt = p.ID_Medical_frt;
    if u.age_head >= 65.0 || (u.MARS == 2.0 && u.age_spouse >= 65.0) {
        medical_frt += p.ID_Medical_frt_add4aged;
    }
    let c17750 = medical_frt * posagi;
    u.c17000 = ((u.e17500_capped - c17750).max(0.0) * (1.0 - p.ID_Medical_hc))
        .min(p.ID_Medical_c[m]);

    // state and local taxes
    let agi_floor = u.c00100.max(0.0001);
    let c18400 = ((1.0 - p.ID_StateLocalTax_hc) * u.e18400_capped.max(0.0))
        .min(p.ID_StateLocalTax_c[m])
        .min(p.ID_StateLocalTax_crt * agi_floor);
    let c18500 = ((1.0 - p.ID_RealEstate_hc) * u.e18500_capped)
        .min(p.ID_RealEstate_c[m])
        .min(p.ID_RealEstate_crt * agi_floor);
    u.c18300 = ((c18400 + c18500) * (1.0 - p.ID_AllTaxes_hc)).min(p.ID_AllTaxes_c[m]);

    // interest paid
    u.c19200 = (u.e19200_capped * (1.0 - p.ID_InterestPaid_hc)).min(p.ID_InterestPaid_c[m]);

    // charity: the floor is absorbed by noncash gifts first
    let floor = (p.ID_Charity_frt * posagi).max(p.ID_Charity_f[m]);
    let noncash_ded = (u.e20100_capped - floor).max(0.0);
    let charity_noncash = (p.ID_Charity_crt_noncash * posagi).min(noncash_ded);
    let remaining_floor = (floor - u.e20100_capped).max(0.0);
    let charity_cash = (u.e19800_capped - remaining_floor).max(0.0);
    u.c19700 = ((charity_noncash + charity_cash).min(p.ID_Charity_crt_all * posagi)
        * (1.0 - p.ID_Charity_hc))
        .min(p.ID_Charity_c[m]);

    // casualty
    u.c20500 = ((u.g20500_capped - p.ID_Casualty_frt * posagi).max(0.0)
        * (1.0 - p.ID_Casualty_hc))
        .min(p.ID_Casualty_c[m]);

    // miscellaneous
    let c20750 = p.ID_Miscellaneous_frt * posagi;
    u.c20800 = ((u.e20400_capped - c20750).max(0.0) * (1.0 - p.ID_Miscellaneous_hc))
        .min(p.ID_Miscellaneous_c[m]);

    u.c21060 = u.c17000 + u.c18300 + u.c19200 + u.c19700 + u.c20500 + u.c20800;
    let nonlimited = u.c17000 + u.c20500;
    let limitstart = p.ID_ps[m];
    if u.c21060 > nonlimited && u.c00100 > limitstart {
        let dedmin = p.ID_crt * (u.c21060 - nonlimited);
        let dedpho = p.ID_prt * (posagi - limitstart).max(0.0);
        u.c21040 = dedmin.min(dedpho);
    } else {
        u.c21040 = 0.0;
    }
    u.c04470 = u.c21060 - u.c21040;
    if u.c04470 > p.ID_c[m] {
        // keep gross minus disallowed equal to allowed under the overall cap
        u.c21040 = u.c21060 - p.ID_c[m];
        u.c04470 = p.ID_c[m];
    }
}

/// Standard deduction including the dependent floor, aged and blind extras
/// and the optional charity deduction for non-itemizers
pub fn std_ded(p: &TaxParams, u: &mut TaxUnit) {
    let m = u.mars_idx();
    let basic = if u.DSI == 1.0 {
        let c15100 = (350.0 + u.earned).max(p.STD_Dep);
        p.STD[m].min(c15100)
    } else if u.MIDR == 1.0 {
        0.0
    } else {
        p.STD[m]
    };
    let mut num_extra = u.blind_head + u.blind_spouse;
    if u.age_head >= 65.0 {
        num_extra += 1.0;
    }
    if u.MARS == 2.0 && u.age_spouse >= 65.0 {
        num_extra += 1.0;
    }
    u.standard = basic + num_extra * p.STD_Aged[m];
    if u.MARS == 3.0 && u.MIDR == 1.0 {
        u.standard = 0.0;
    }
    if p.STD_allow_charity_ded_nonitemizers {
        let capped = u.e19800.min(p.ID_Charity_crt_all * u.c00100);
        u.standard += capped.min(p.STD_charity_ded_nonitemizers_max[m]);
    }
}

/// Taxable income after the qualified business income deduction
pub fn tax_inc(p: &TaxParams, u: &mut TaxUnit) {
    let m = u.mars_idx();
    let pre_qbid_taxinc = (u.c00100 - u.c04470.max(u.standard) - u.c04600).max(0.0);
    let qbinc = (u.e00900 - u.c03260 + u.e26270 + u.e02100 + u.e27200).max(0.0);
    let qbid_before_limits = qbinc * p.PT_qbid_rt;

    u.qbided = if p.PT_qbid_limited {
        let lower_thd = p.PT_qbid_taxinc_thd[m];
        let mut qbided = if pre_qbid_taxinc <= lower_thd {
            qbid_before_limits
        } else {
            let gap = p.PT_qbid_taxinc_gap[m];
            let upper_thd = lower_thd + gap;
            let sstb = u.PT_SSTB_income == 1.0;
            if sstb && pre_qbid_taxinc >= upper_thd {
                0.0
            } else {
                let wage_cap = u.PT_binc_w2_wages * p.PT_qbid_w2_wages_rt;
                let alt_cap = u.PT_binc_w2_wages * p.PT_qbid_alt_w2_wages_rt
                    + u.PT_ubia_property * p.PT_qbid_alt_property_rt;
                let full_cap = wage_cap.max(alt_cap);
                let prt = (pre_qbid_taxinc - lower_thd) / gap;
                if !sstb && pre_qbid_taxinc >= upper_thd {
                    full_cap.min(qbid_before_limits)
                } else if !sstb {
                    qbid_before_limits - prt * (qbid_before_limits - full_cap)
                } else {
                    // specified service income is phased out over the gap
                    let prti = (upper_thd - pre_qbid_taxinc) / gap;
                    let qbid_adjusted = prti * qbid_before_limits;
                    let cap_adjusted = prti * full_cap;
                    qbid_adjusted - prt * (qbid_adjusted - cap_adjusted)
                }
            }
        };
        let net_cg = u.e00650 + u.c01000;
        let taxinc_cap = p.PT_qbid_rt * (pre_qbid_taxinc - net_cg).max(0.0);
        qbided = qbided.min(taxinc_cap);
        if qbided > 0.0 && pre_qbid_taxinc > p.PT_qbid_ps[m] {
            let excess = pre_qbid_taxinc - p.PT_qbid_ps[m];
            qbided = (qbided - p.PT_qbid_prt * excess).max(0.0);
        }
        qbided
    } else {
        qbid_before_limits
    };
    if qbinc >= p.PT_qbid_min_qbi && u.qbided < p.PT_qbid_min_ded {
        u.qbided = p.PT_qbid_min_ded;
    }
    u.c04800 = (pre_qbid_taxinc - u.qbided).max(0.0);
}
