//! Payroll taxes on wages and self-employment income

use super::TaxParams;
use crate::records::TaxUnit;

/// FICA on wages, SECA on self-employment income, earned income
///
/// Both taxes include the employer share. `payrolltax` also carries the
/// OASDI tax on earnings above `SS_Earnings_thd`, which is zero under
/// current law because the threshold is effectively infinite.
pub fn ei_payroll_tax(p: &TaxParams, u: &mut TaxUnit) {
    let ss_rate = p.fica_ss_rate();
    let mc_rate = p.fica_mc_rate();

    let sey_p = u.e00900p + u.e02100p + u.k1bx14p;
    let sey_s = u.e00900s + u.e02100s + u.k1bx14s;
    u.sey = sey_p + sey_s;

    let gross_ws_p = u.e00200p + u.pencon_p;
    let gross_ws_s = u.e00200s + u.pencon_s;
    let txearn_was_p = p.SS_Earnings_c.min(gross_ws_p);
    let txearn_was_s = p.SS_Earnings_c.min(gross_ws_s);

    let ptax_ss_ws_p = ss_rate * txearn_was_p;
    let ptax_ss_ws_s = ss_rate * txearn_was_s;
    let ptax_mc_ws_p = mc_rate * gross_ws_p;
    let ptax_mc_ws_s = mc_rate * gross_ws_s;
    u.ptax_oasdi_wage = ptax_ss_ws_p + ptax_ss_ws_s;
    u.ptax_hi_wage = ptax_mc_ws_p + ptax_mc_ws_s;
    u.ptax_was = u.ptax_oasdi_wage + u.ptax_hi_wage;

    // net earnings from self-employment exclude the employer-equivalent half
    let sey_frac = 1.0 - 0.5 * (ss_rate + mc_rate);
    let net_sey_p = (sey_p * sey_frac).max(0.0);
    let net_sey_s = (sey_s * sey_frac).max(0.0);
    let txearn_sey_p = net_sey_p.min(p.SS_Earnings_c - txearn_was_p);
    let txearn_sey_s = net_sey_s.min(p.SS_Earnings_c - txearn_was_s);
    let setax_ss_p = ss_rate * txearn_sey_p;
    let setax_ss_s = ss_rate * txearn_sey_s;
    let setax_p = setax_ss_p + mc_rate * net_sey_p;
    let setax_s = setax_ss_s + mc_rate * net_sey_s;
    u.setax = if u.sey * sey_frac > p.SECA_Earnings_thd {
        setax_p + setax_s
    } else {
        0.0
    };

    let oasdi_frac = 1.0 - 0.5 * ss_rate;
    u.was_plus_sey_p = gross_ws_p + (sey_p * oasdi_frac).max(0.0);
    u.was_plus_sey_s = gross_ws_s + (sey_s * oasdi_frac).max(0.0);
    let extra_p = (u.was_plus_sey_p - p.SS_Earnings_thd).max(0.0);
    let extra_s = (u.was_plus_sey_s - p.SS_Earnings_thd).max(0.0);
    let extra_payrolltax = ss_rate * (extra_p + extra_s);

    u.payrolltax = u.ptax_was + extra_payrolltax;
    u.ptax_oasdi = u.ptax_oasdi_wage + setax_ss_p + setax_ss_s + extra_payrolltax;

    let deductible = 1.0 - p.ALD_SelfEmploymentTax_hc;
    u.c03260 = deductible * 0.5 * u.setax;
    u.earned = (u.e00200p + u.e00200s + u.sey - u.c03260).max(0.0);
    u.earned_p = (u.e00200p + sey_p - deductible * 0.5 * setax_p).max(0.0);
    u.earned_s = (u.e00200s + sey_s - deductible * 0.5 * setax_s).max(0.0);
}

/// Form 8959 Additional Medicare Tax on wages and self-employment income
/// above the filing-status threshold
pub fn additional_medicare_tax(p: &TaxParams, u: &mut TaxUnit) {
    let m = u.mars_idx();
    let sey_frac = 1.0 - 0.5 * (p.fica_mc_rate() + p.fica_ss_rate());
    let line8 = u.sey.max(0.0) * sey_frac;
    let line11 = (p.AMEDT_ec[m] - u.e00200).max(0.0);
    u.ptax_amc =
        p.AMEDT_rt * ((u.e00200 - p.AMEDT_ec[m]).max(0.0) + (line8 - line11).max(0.0));
}
