//! The filing-unit row type
//!
//! Every input and calculated variable is stored as `f64`, integer-typed
//! variables included, so the pipeline reads typed fields while name-based
//! access still serves column views, aging and finite-difference perturbation.

/// Declares [`TaxUnit`] with one `f64` field per variable and the by-name
/// accessors generated from the same list
macro_rules! tax_unit {
    (
        read { $($read:ident),* $(,)? }
        calc { $($calc:ident),* $(,)? }
    ) => {
        /// One filing unit
        #[allow(non_snake_case)]
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct TaxUnit {
            $(pub $read: f64,)*
            $(pub $calc: f64,)*
        }

        impl TaxUnit {
            /// Variables that may appear in an input table
            pub const READ_FIELDS: &'static [&'static str] = &[$(stringify!($read)),*];

            /// Variables set by the tax pipeline
            pub const CALC_FIELDS: &'static [&'static str] = &[$(stringify!($calc)),*];

            pub fn get(&self, name: &str) -> Option<f64> {
                match name {
                    $(stringify!($read) => Some(self.$read),)*
                    $(stringify!($calc) => Some(self.$calc),)*
                    _ => None,
                }
            }

            pub fn get_mut(&mut self, name: &str) -> Option<&mut f64> {
                match name {
                    $(stringify!($read) => Some(&mut self.$read),)*
                    $(stringify!($calc) => Some(&mut self.$calc),)*
                    _ => None,
                }
            }
        }
    };
}

tax_unit! {
    read {
        RECID, MARS, FLPDYR, XTOT, EIC, DSI, MIDR, age_head, age_spouse, blind_head,
        blind_spouse, nu06, nu13, nu18, n1820, n21, n24, elderly_dependents, f2441, f6251,
        exact, PT_SSTB_income, s006, e00200, e00200p, e00200s, pencon_p, pencon_s, e00300,
        e00400, e00600, e00650, e00700, e00800, e00900, e00900p, e00900s, e01100, e01200,
        e01400, e01500, e01700, e02000, e02100, e02100p, e02100s, e02300, e02400, e03150,
        e03210, e03220, e03230, e03240, e03270, e03290, e03300, e03400, e03500, e07240,
        e07260, e07300, e07400, e07600, p08000, e09700, e09800, e09900, e11200, e17500,
        e18400, e18500, e19200, e19800, e20100, e20400, g20500, e24515, e24518, e26270,
        e27200, e32800, e58990, e62900, e87521, e87530, k1bx14p, k1bx14s, p22250, p23250,
        cmbtp, PT_binc_w2_wages, PT_ubia_property, housing_ben, ssi_ben, snap_ben, tanf_ben,
        vet_ben, wic_ben, mcare_ben, mcaid_ben, other_ben,
    }
    calc {
        sep, num, sey, payrolltax, ptax_was, ptax_oasdi_wage, ptax_hi_wage, setax, c03260,
        ptax_oasdi, earned, earned_p, earned_s, was_plus_sey_p, was_plus_sey_s, ptax_amc,
        care_deduction, c02900, invinc_ec_base, c01000, c23650, ymod, ymod1, invinc_agi_ec,
        c02500, ubi, taxable_ubi, nontaxable_ubi, c00100, pre_c04600, c04600, e17500_capped,
        e18400_capped, e18500_capped, e19200_capped, e19800_capped, e20100_capped,
        e20400_capped, g20500_capped, c17000, c18300, c19200, c19700, c20500, c20800,
        c21040, c21060, c04470, standard, c04800, qbided, c05200, dwks10, dwks13, dwks14,
        dwks19, dwks43, c05700, taxbc, surtax, c62100, c09600, c05800, niit, c32800, c07180,
        CDCC_refund, c59660, rptc_p, rptc_s, rptc, c07220, odc, codtc_limited,
        personal_refundable_credit, personal_nonrefundable_credit, c10960, c87668, c07200,
        c07230, charity_credit, c07240, c07260, c07300, c07400, c07600, c08000, c11070,
        c07100, othertaxes, c09200, ctc_new, eitc, refund, ctc_total, ctc_refundable,
        ctc_nonrefundable, iitax, combined, fstax, lumpsum_tax, benefit_cost_total,
        benefit_value_total, expanded_income, aftertax_income,
    }
}

impl TaxUnit {
    /// True for any read or calculated variable name
    pub fn has_field(name: &str) -> bool {
        Self::READ_FIELDS.contains(&name) || Self::CALC_FIELDS.contains(&name)
    }

    /// Zero-based filing status index into MARS-labelled parameters
    pub fn mars_idx(&self) -> usize {
        (self.MARS as usize).clamp(1, 5) - 1
    }

    /// Set `sep` and `num` from the filing status
    pub(crate) fn set_filing_counts(&mut self) {
        self.sep = if self.MARS == 3.0 { 2.0 } else { 1.0 };
        self.num = if self.MARS == 2.0 { 2.0 } else { 1.0 };
    }
}
