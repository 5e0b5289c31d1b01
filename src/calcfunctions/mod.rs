//! The tax pipeline
//!
//! Each stage is a function over one [`TaxUnit`] that reads input and earlier
//! calculated variables, reads policy through a [`TaxParams`] view of the
//! current year, and writes its own calculated variables. The Calculator runs
//! the stages across the whole table in a fixed order.

pub mod amt;
pub mod benefits;
pub mod credits;
pub mod deductions;
pub mod income;
pub mod payroll;
pub mod schedules;
pub mod totals;

use crate::error::Result;
use crate::parameters::Parameters;
use crate::records::TaxUnit;

/// A pipeline stage over one filing unit
pub type Stage = fn(&TaxParams, &mut TaxUnit);

/// Declares [`TaxParams`] with one field per policy parameter, typed by the
/// parameter's shape, and the constructor that resolves them for a year
macro_rules! tax_params {
    (
        scalars { $($s:ident),* $(,)? }
        flags { $($f:ident),* $(,)? }
        mars { $($m:ident),* $(,)? }
        eic { $($e:ident),* $(,)? }
        ideds { $($i:ident),* $(,)? }
    ) => {
        /// Policy values for one year in the shape the stages index them
        ///
        /// MARS-labelled parameters are indexed with [`TaxUnit::mars_idx`],
        /// EIC-labelled ones with the unit's `EIC` count and deduction-type
        /// switches in the order med, sltx, retx, cas, misc, int, char.
        #[allow(non_snake_case)]
        #[derive(Debug, Clone, PartialEq)]
        pub struct TaxParams {
            $(pub $s: f64,)*
            $(pub $f: bool,)*
            $(pub $m: [f64; 5],)*
            $(pub $e: [f64; 4],)*
            $(pub $i: [bool; 7],)*
        }

        impl TaxParams {
            /// Resolve every parameter at the policy's current year
            pub fn from_policy(policy: &Parameters) -> Result<Self> {
                Ok(Self {
                    $($s: policy.scalar(stringify!($s))?,)*
                    $($f: policy.flag(stringify!($f))?,)*
                    $($m: policy.array(stringify!($m))?,)*
                    $($e: policy.array(stringify!($e))?,)*
                    $($i: policy.array::<7>(stringify!($i))?.map(|v| v != 0.0),)*
                })
            }
        }
    };
}

tax_params! {
    scalars {
        FICA_ss_trt_employee, FICA_ss_trt_employer, FICA_mc_trt_employee,
        FICA_mc_trt_employer, SS_Earnings_c, SS_Earnings_thd, SECA_Earnings_thd, AMEDT_rt,
        ALD_StudentLoan_hc, ALD_SelfEmploymentTax_hc, ALD_SelfEmp_HealthIns_hc,
        ALD_KEOGH_SEP_hc, ALD_EarlyWithdraw_hc, ALD_AlimonyPaid_hc, ALD_AlimonyReceived_hc,
        ALD_EducatorExpenses_hc, ALD_HSADeduction_hc, ALD_IRAContributions_hc,
        ALD_DomesticProduction_hc, ALD_Tuition_hc, ALD_Dependents_hc,
        ALD_Dependents_Child_c, ALD_Dependents_Elder_c, ALD_InvInc_ec_rt, CG_ec,
        CG_reinvest_ec_rt, CG_rt1, CG_rt2, CG_rt3, CG_rt4, AMT_CG_rt1, AMT_CG_rt2,
        AMT_CG_rt3, AMT_CG_rt4, SS_percentage1, SS_percentage2, UBI_u18, UBI_1820, UBI_21,
        UBI_ecrt, UI_em, II_em, II_prt, II_credit_prt, II_credit_nr_prt, II_rt1, II_rt2,
        II_rt3, II_rt4, II_rt5, II_rt6, II_rt7, II_rt8, PT_rt1, PT_rt2, PT_rt3, PT_rt4,
        PT_rt5, PT_rt6, PT_rt7, PT_rt8, PT_EligibleRate_active, PT_EligibleRate_passive,
        PT_qbid_rt, PT_qbid_w2_wages_rt, PT_qbid_alt_w2_wages_rt, PT_qbid_alt_property_rt,
        PT_qbid_prt, PT_qbid_min_ded, PT_qbid_min_qbi, STD_Dep, ID_prt, ID_crt,
        ID_Medical_frt, ID_Medical_frt_add4aged, ID_Medical_hc, ID_StateLocalTax_hc,
        ID_RealEstate_hc, ID_InterestPaid_hc, ID_Charity_hc, ID_Casualty_hc,
        ID_Miscellaneous_hc, ID_StateLocalTax_crt, ID_RealEstate_crt, ID_AllTaxes_hc,
        ID_Charity_crt_all, ID_Charity_crt_noncash, ID_Charity_frt, ID_Casualty_frt,
        ID_Miscellaneous_frt, ID_AmountCap_rt, ID_BenefitSurtax_crt, ID_BenefitSurtax_trt,
        ID_BenefitCap_rt, AGI_surtax_trt, AMT_em_pe, AMT_prt, AMT_rt1, AMT_rt2, AMT_brk1,
        AMT_child_em, AMT_child_em_c_age, NIIT_rt, CDCC_c, CDCC_ps1, CDCC_po1_rate_max,
        CDCC_po1_rate_min, CDCC_po2_rate_min, CDCC_po1_step_size, CDCC_po_rate_per_step,
        EITC_basic_frac, EITC_InvestIncome_c, EITC_excess_InvestIncome_rt, EITC_MinEligAge,
        EITC_MaxEligAge, RPTC_c, RPTC_rt, CTC_c, CTC_c_under6_bonus, CTC_prt, ODC_c, ACTC_c,
        ACTC_rt, ACTC_rt_bonus_under6family, ACTC_Income_thd, ACTC_ChildNum, CTC_new_c,
        CTC_new_c_under6_bonus, CTC_new_rt, CTC_new_prt, CTC_new_refund_limit_payroll_rt,
        LLC_Expense_c, ETC_pe_Single, ETC_pe_Married, CR_ForeignTax_hc,
        CR_ResidentialEnergy_hc, CR_GeneralBusiness_hc, CR_MinimumTax_hc,
        CR_AmOppRefundable_hc, CR_AmOppNonRefundable_hc, CR_SchR_hc, CR_OtherCredits_hc,
        CR_Education_hc, CR_RetirementSavings_hc, CR_Charity_rt, CR_Charity_frt,
        FST_AGI_trt, LST,
    }
    flags {
        CG_nodiff, SS_all_in_agi, II_no_em_nu18, PT_wages_active_income, PT_top_stacking,
        PT_qbid_limited, STD_allow_charity_ded_nonitemizers, NIIT_PT_taxed, CDCC_refundable,
        EITC_indiv, EITC_sep_filers_elig, CTC_include17, CTC_is_refundable,
        ODC_is_refundable, CTC_new_for_all, CTC_new_refund_limited,
        CTC_new_refund_limited_all_payroll, BEN_housing_repeal, BEN_ssi_repeal,
        BEN_snap_repeal, BEN_tanf_repeal, BEN_vet_repeal, BEN_wic_repeal, BEN_mcare_repeal,
        BEN_mcaid_repeal, BEN_oasdi_repeal, BEN_ui_repeal, BEN_other_repeal,
    }
    mars {
        AMEDT_ec, ALD_Dependents_thd, ALD_BusinessLosses_c, Capital_loss_limitation,
        CG_brk1, CG_brk2, CG_brk3, AMT_CG_brk1, AMT_CG_brk2, AMT_CG_brk3, SS_thd1, SS_thd2,
        UI_thd, II_em_ps, II_credit, II_credit_ps, II_credit_nr, II_credit_nr_ps, II_brk1,
        II_brk2, II_brk3, II_brk4, II_brk5, II_brk6, II_brk7, PT_brk1, PT_brk2, PT_brk3,
        PT_brk4, PT_brk5, PT_brk6, PT_brk7, PT_qbid_taxinc_thd, PT_qbid_taxinc_gap,
        PT_qbid_ps, STD, STD_Aged, STD_charity_ded_nonitemizers_max, ID_ps, ID_c,
        ID_Medical_c, ID_StateLocalTax_c, ID_RealEstate_c, ID_InterestPaid_c, ID_Charity_c,
        ID_Casualty_c, ID_Miscellaneous_c, ID_AllTaxes_c, ID_Charity_f, ID_BenefitSurtax_em,
        AGI_surtax_thd, AMT_em, AMT_em_ps, NIIT_thd, CDCC_ps2, CDCC_po2_step_size, CTC_ps,
        CTC_new_ps, CR_Charity_f, FST_AGI_thd_lo, FST_AGI_thd_hi,
    }
    eic {
        EITC_c, EITC_ps, EITC_ps_MarriedJ, EITC_rt, EITC_prt,
    }
    ideds {
        ID_AmountCap_Switch, ID_BenefitSurtax_Switch, ID_BenefitCap_Switch,
    }}

impl TaxParams {
    /// Combined employee and employer OASDI rate
    pub fn fica_ss_rate(&self) -> f64 {
        self.FICA_ss_trt_employer + self.FICA_ss_trt_employee
    }

    /// Combined employee and employer HI rate
    pub fn fica_mc_rate(&self) -> f64 {
        self.FICA_mc_trt_employer + self.FICA_mc_trt_employee
    }

    pub fn ordinary_schedule(&self) -> Schedule {
        Schedule {
            rates: [
                self.II_rt1, self.II_rt2, self.II_rt3, self.II_rt4, self.II_rt5, self.II_rt6,
                self.II_rt7, self.II_rt8,
            ],
            brackets: [
                self.II_brk1, self.II_brk2, self.II_brk3, self.II_brk4, self.II_brk5,
                self.II_brk6, self.II_brk7,
            ],
        }
    }

    pub fn pass_through_schedule(&self) -> Schedule {
        Schedule {
            rates: [
                self.PT_rt1, self.PT_rt2, self.PT_rt3, self.PT_rt4, self.PT_rt5, self.PT_rt6,
                self.PT_rt7, self.PT_rt8,
            ],
            brackets: [
                self.PT_brk1, self.PT_brk2, self.PT_brk3, self.PT_brk4, self.PT_brk5,
                self.PT_brk6, self.PT_brk7,
            ],
        }
    }
}

/// Eight marginal rates over seven MARS-labelled bracket tops
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    pub rates: [f64; 8],
    pub brackets: [[f64; 5]; 7],
}

/// Number of children counted for the child tax credits
pub(crate) fn ctc_child_count(p: &TaxParams, u: &TaxUnit) -> f64 {
    if p.CTC_include17 {
        let head_under18 = if u.age_head < 18.0 { 1.0 } else { 0.0 };
        let spouse_under18 = if u.MARS == 2.0 && u.age_spouse < 18.0 {
            1.0
        } else {
            0.0
        };
        u.n24 + (u.nu18 - head_under18 - spouse_under18 - u.n24).max(0.0)
    } else {
        u.n24
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Policy;

    #[test]
    fn test_params_resolve_for_current_year() {
        let mut pol = Policy::new().unwrap();
        pol.set_year(2023).unwrap();
        let p = TaxParams::from_policy(&pol).unwrap();
        assert_eq!(p.STD[0], 13850.0);
        assert_eq!(p.EITC_c[3], 7430.0);
        assert!(!p.CTC_is_refundable);
        assert_eq!(p.ID_AmountCap_Switch.len(), 7);
        let sched = p.ordinary_schedule();
        assert_eq!(sched.rates[6], 0.37);
        assert_eq!(sched.brackets[0], p.II_brk1);
    }

    #[test]
    fn test_ctc_child_count_include17() {
        let mut pol = Policy::new().unwrap();
        pol.set_year(2023).unwrap();
        let mut p = TaxParams::from_policy(&pol).unwrap();
        let u = TaxUnit {
            MARS: 2.0,
            age_head: 40.0,
            age_spouse: 40.0,
            n24: 1.0,
            nu18: 2.0,
            ..Default::default()
        };
        p.CTC_include17 = false;
        assert_eq!(ctc_child_count(&p, &u), 1.0);
        p.CTC_include17 = true;
        assert_eq!(ctc_child_count(&p, &u), 2.0);
    }
}
