//! Liability totals and the post-pipeline income measures

use super::TaxParams;
use crate::records::TaxUnit;

fn unless(flag: bool, amount: f64) -> f64 {
    if flag {
        0.0
    } else {
        amount
    }
}

/// Form 1040 totals: nonrefundable credits used, other taxes and income tax
/// before refundable credits
pub fn c1040(p: &TaxParams, u: &mut TaxUnit) {
    u.c07100 = u.c07180
        + u.c07200
        + u.c07600
        + u.c07300
        + u.c07400
        + unless(p.CTC_is_refundable, u.c07220)
        + u.c08000
        + u.c07230
        + u.c07240
        + u.c07260
        + unless(p.ODC_is_refundable, u.odc)
        + u.charity_credit
        + u.personal_nonrefundable_credit;
    let tax_net_nonrefundable_credits = (u.c05800 - u.c07100).max(0.0);
    u.othertaxes = u.e09700 + u.e09800 + u.e09900 + u.niit + u.setax + u.ptax_amc;
    u.c09200 = u.othertaxes + tax_net_nonrefundable_credits;
}

/// Income tax after refundable credits, and combined income and payroll tax
pub fn iitax(p: &TaxParams, u: &mut TaxUnit) {
    u.eitc = u.c59660;
    let ctc_refund = if p.CTC_is_refundable { u.c07220 } else { 0.0 };
    let odc_refund = if p.ODC_is_refundable { u.odc } else { 0.0 };
    u.refund = u.eitc
        + u.c11070
        + u.c10960
        + u.CDCC_refund
        + u.personal_refundable_credit
        + u.ctc_new
        + u.rptc
        + ctc_refund
        + odc_refund;
    u.ctc_total = u.c07220 + u.c11070 + u.odc + u.ctc_new;
    u.ctc_refundable = ctc_refund + u.c11070 + odc_refund + u.ctc_new;
    u.ctc_nonrefundable = (u.ctc_total - u.ctc_refundable).max(0.0);
    u.iitax = u.c09200 - u.refund;
    u.combined = u.iitax + u.payrolltax;
}

/// Minimum tax on AGI net of income tax and the employee share of payroll
/// tax, phased in between the low and high thresholds
pub fn fair_share_tax(p: &TaxParams, u: &mut TaxUnit) {
    let m = u.mars_idx();
    if p.FST_AGI_trt <= 0.0 || u.c00100 < p.FST_AGI_thd_lo[m] {
        u.fstax = 0.0;
        return;
    }
    let employee_share = 0.5 * u.ptax_was + 0.5 * u.setax + u.ptax_amc;
    u.fstax = (u.c00100 * p.FST_AGI_trt - u.iitax - employee_share).max(0.0);
    let thd_gap = (p.FST_AGI_thd_hi[m] - p.FST_AGI_thd_lo[m]).max(0.0);
    if thd_gap > 0.0 && u.c00100 < p.FST_AGI_thd_hi[m] {
        u.fstax *= (u.c00100 - p.FST_AGI_thd_lo[m]) / thd_gap;
    }
    u.iitax += u.fstax;
    u.combined += u.fstax;
    u.surtax += u.fstax;
}

/// Per-person lump-sum tax on filing units that are not dependents
pub fn lump_sum_tax(p: &TaxParams, u: &mut TaxUnit) {
    u.lumpsum_tax = if p.LST == 0.0 || u.DSI == 1.0 {
        0.0
    } else {
        p.LST * u.num.max(u.XTOT)
    };
    u.combined += u.lumpsum_tax;
}

/// Expanded income: market income, the employer share of payroll tax and
/// the consumption value of benefits
pub fn expand_income(_p: &TaxParams, u: &mut TaxUnit) {
    u.expanded_income = u.e00200
        + u.pencon_p
        + u.pencon_s
        + u.e00300
        + u.e00400
        + u.e00600
        + u.e00700
        + u.e00800
        + u.e00900
        + u.e01100
        + u.e01200
        + u.e01400
        + u.e01500
        + u.e02000
        + u.e02100
        + u.p22250
        + u.p23250
        + u.cmbtp
        + 0.5 * u.ptax_was
        + u.benefit_value_total;
}

pub fn aftertax_income(_p: &TaxParams, u: &mut TaxUnit) {
    u.aftertax_income = u.expanded_income - u.combined;
}
