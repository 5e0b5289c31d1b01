//! Alternative minimum tax and the net investment income tax

use super::TaxParams;
use crate::records::TaxUnit;

/// Two-rate AMT on ordinary AMTI
fn amt_rate_tax(p: &TaxParams, amti: f64, sep: f64) -> f64 {
    p.AMT_rt1 * amti + p.AMT_rt2 * (amti - p.AMT_brk1 / sep).max(0.0)
}

/// Form 6251
///
/// AMTI starts from AGI (less itemized deductions not allowed for AMT when
/// itemizing) plus preference items. The exemption phases out above
/// `AMT_em_ps`, separate filers add back part of it, and young filers are
/// limited to earned income plus `AMT_child_em`. Gains keep their
/// preferential rates through Part III. `c09600` is the excess of tentative
/// minimum tax over regular tax.
pub fn amt(p: &TaxParams, u: &mut TaxUnit) {
    let m = u.mars_idx();
    u.c62100 = if u.standard == 0.0 {
        u.c00100 - u.e00700 - u.qbided - u.c04470
            + u.c17000.min(0.025 * u.c00100).max(0.0)
            + u.c18300
            + u.c20800
            - u.c21040
    } else {
        u.c00100 - u.e00700 - u.qbided
    };
    u.c62100 += u.cmbtp;
    if u.MARS == 3.0 {
        let amtsepadd = p.AMT_em[m].min(p.AMT_prt * (u.c62100 - p.AMT_em_pe)).max(0.0);
        u.c62100 += amtsepadd;
    }

    let mut line29 =
        (p.AMT_em[m] - p.AMT_prt * (u.c62100 - p.AMT_em_ps[m]).max(0.0)).max(0.0);
    let young_head = u.age_head != 0.0 && u.age_head < p.AMT_child_em_c_age;
    let no_or_young_spouse = u.age_spouse < p.AMT_child_em_c_age;
    if young_head && no_or_young_spouse {
        line29 = line29.min(u.earned + p.AMT_child_em);
    }
    let line30 = (u.c62100 - line29).max(0.0);
    let line3163 = amt_rate_tax(p, line30, u.sep);

    let has_gains = u.dwks10 > 0.0
        || u.dwks13 > 0.0
        || u.dwks14 > 0.0
        || u.dwks19 > 0.0
        || u.e24515 > 0.0;
    let line31 = if has_gains {
        let line37 = u.dwks13;
        let line38 = u.e24515;
        let line39 = (line37 + line38).min(u.dwks10);
        let line40 = line30.min(line39);
        let line41 = (line30 - line40).max(0.0);
        let line42 = amt_rate_tax(p, line41, u.sep);
        let line44 = u.dwks14;
        let line45 = (p.AMT_CG_brk1[m] - line44).max(0.0);
        let line46 = line30.min(line37);
        let line47 = line45.min(line46);
        let cgtax1 = line47 * p.AMT_CG_rt1;
        let line48 = line46 - line47;
        let line52 = line45 + u.dwks19;
        let line53 = (p.AMT_CG_brk2[m] - line52).max(0.0);
        let line54 = line48.min(line53);
        let cgtax2 = line54 * p.AMT_CG_rt2;
        let line56 = line47 + line54;
        let (line57, linex2) = if line41 == line56 {
            (0.0, 0.0)
        } else {
            let linex1 = line48.min((p.AMT_CG_brk3[m] - line44 - line45).max(0.0));
            (line46 - line56, (line54 - linex1).max(0.0))
        };
        let cgtax3 = line57 * p.AMT_CG_rt3;
        let cgtax4 = linex2 * p.AMT_CG_rt4;
        let line61 = if line38 == 0.0 {
            0.0
        } else {
            0.25 * (line30 - line41 - line56 - line57 - linex2).max(0.0)
        };
        let line62 = line42 + cgtax1 + cgtax2 + cgtax3 + cgtax4 + line61;
        line3163.min(line62)
    } else {
        line3163
    };

    let line32 = if u.f6251 == 1.0 { u.e62900 } else { u.e07300 };
    let line33 = line31 - line32;
    u.c09600 = (line33 - (u.taxbc - u.e07300 - u.c05700).max(0.0)).max(0.0);
    u.c05800 = u.taxbc + u.c09600;
}

/// Tax on the lesser of net investment income and AGI above `NIIT_thd`
pub fn net_inv_inc_tax(p: &TaxParams, u: &mut TaxUnit) {
    let mut nii = u.e00300 + u.e00600 + u.c01000 + u.e02000;
    if !p.NIIT_PT_taxed {
        nii -= u.e26270;
    }
    let nii = nii.max(0.0);
    u.niit = p.NIIT_rt * nii.min((u.c00100 - p.NIIT_thd[u.mars_idx()]).max(0.0));
}
