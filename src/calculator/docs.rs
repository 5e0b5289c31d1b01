//! Plain-text documentation of a reform and its assumptions
//!
//! For each year in which a reform or growth-difference revision takes
//! effect, every parameter whose value differs from the baseline is listed
//! with its new value, title, description and baseline value.

use crate::error::Result;
use crate::growth::{GrowDiff, GrowFactors};
use crate::parameters::{ParamInputs, ParamType, Parameters, Policy, Reform};
use std::collections::BTreeSet;

const MAX_LINE_LENGTH: usize = 77;

/// Where the baseline value line comes from
enum Baseline<'a> {
    Policy(&'a Parameters),
    /// Growth differences default to zero
    Zero,
}

/// Wrap `text` at word boundaries; continuation lines get `indent` spaces
fn wrap(text: &str, indent: usize) -> Vec<String> {
    if text.len() < MAX_LINE_LENGTH {
        return vec![text.to_string()];
    }
    let mut lines = Vec::new();
    let mut words = text.split_whitespace().peekable();
    let mut first = true;
    while words.peek().is_some() {
        let mut line = if first {
            String::new()
        } else {
            " ".repeat(indent)
        };
        first = false;
        let mut placed = false;
        while let Some(word) = words.peek() {
            if placed && word.len() + line.len() >= MAX_LINE_LENGTH {
                break;
            }
            line.push_str(word);
            line.push(' ');
            placed = true;
            words.next();
        }
        line.pop();
        lines.push(line);
    }
    lines
}

fn format_number(v: f64, ptype: ParamType) -> String {
    match ptype {
        ParamType::Bool => (v != 0.0).to_string(),
        ParamType::Int => format!("{}", v as i64),
        _ => format!("{:?}", v),
    }
}

fn format_values(values: &[f64], ptype: ParamType, is_vector: bool) -> String {
    let items: Vec<String> = values.iter().map(|v| format_number(*v, ptype)).collect();
    if is_vector {
        format!("[{}]", items.join(", "))
    } else {
        items.join("")
    }
}

fn param_doc(
    years: &BTreeSet<i32>,
    updated: &Parameters,
    baseline: &Parameters,
    base_line: Baseline<'_>,
) -> Result<String> {
    let mut doc = String::new();
    for &year in years {
        let mut changed: Vec<&str> = Vec::new();
        for name in baseline.names() {
            let meta = baseline.param(name)?;
            if meta.is_text() {
                continue;
            }
            if updated.values_at(name, year)? != baseline.values_at(name, year)? {
                changed.push(name);
            }
        }
        if changed.is_empty() {
            continue;
        }
        changed.sort_unstable();
        doc.push_str(&format!("{}:\n", year));
        for name in changed {
            let meta = baseline.param(name)?;
            let is_vector = meta.dim.is_some();
            let value = format_values(updated.values_at(name, year)?, meta.param_type, is_vector);
            doc.push_str(&format!(" {} : {}\n", name, value));
            if let Some(dim) = meta.dim {
                let labels: Vec<String> = dim.labels().iter().map(|l| format!("'{}'", l)).collect();
                doc.push_str(&format!("{}[{}]\n", " ".repeat(4 + name.len()), labels.join(", ")));
            }
            for line in wrap(&format!("name: {}", meta.title), 6) {
                doc.push_str(&format!("  {}\n", line));
            }
            for line in wrap(&format!("desc: {}", meta.description), 6) {
                doc.push_str(&format!("  {}\n", line));
            }
            match base_line {
                Baseline::Policy(base) => {
                    let bval = format_values(base.values_at(name, year)?, meta.param_type, is_vector);
                    doc.push_str(&format!("  baseline_value: {}\n", bval));
                }
                Baseline::Zero => doc.push_str("  baseline_value: 0.0\n"),
            }
        }
    }
    Ok(doc)
}

fn revision_years(revision: &Reform) -> BTreeSet<i32> {
    revision.keys().copied().collect()
}

/// Document a (possibly compound) reform against current-law policy
///
/// `compound` holds the second and later policy revisions of a compound
/// reform, applied in order after `params.policy`.
pub fn reform_documentation(params: &ParamInputs, compound: Option<&[Reform]>) -> Result<String> {
    let mut gdiff_base = GrowDiff::new()?;
    gdiff_base.update_growdiff(&params.growdiff_baseline)?;
    let mut gf_clp = GrowFactors::new()?;
    gdiff_base.apply_to(&mut gf_clp)?;
    let clp = Policy::with_growfactors(&gf_clp)?;

    let mut gdiff_resp = GrowDiff::new()?;
    gdiff_resp.update_growdiff(&params.growdiff_response)?;
    let mut gf_ref = GrowFactors::new()?;
    gdiff_base.apply_to(&mut gf_ref)?;
    gdiff_resp.apply_to(&mut gf_ref)?;
    let mut reformed = Policy::with_growfactors(&gf_ref)?;
    reformed.implement_reform(&params.policy)?;
    let mut reform_years = revision_years(&params.policy);
    if let Some(revisions) = compound {
        for revision in revisions {
            reformed.implement_reform(revision)?;
            reform_years.extend(revision_years(revision));
        }
    }

    let default_gdiff = GrowDiff::new()?;
    let mut doc = String::from("REFORM DOCUMENTATION\n");
    doc.push_str("Baseline Growth-Difference Assumption Values by Year:\n");
    let years = revision_years(&params.growdiff_baseline);
    if years.is_empty() {
        doc.push_str("none: no baseline GrowDiff assumptions specified\n");
    } else {
        doc.push_str(&param_doc(
            &years,
            gdiff_base.parameters(),
            default_gdiff.parameters(),
            Baseline::Zero,
        )?);
    }
    doc.push_str("Response Growth-Difference Assumption Values by Year:\n");
    let years = revision_years(&params.growdiff_response);
    if years.is_empty() {
        doc.push_str("none: no response GrowDiff assumptions specified\n");
    } else {
        doc.push_str(&param_doc(
            &years,
            gdiff_resp.parameters(),
            default_gdiff.parameters(),
            Baseline::Zero,
        )?);
    }
    if compound.is_some() {
        doc.push_str("Compound Policy Reform Parameter Values by Year:\n");
    } else {
        doc.push_str("Policy Reform Parameter Values by Year:\n");
    }
    if reform_years.is_empty() {
        doc.push_str("none: using current-law policy parameters\n");
    } else {
        doc.push_str(&param_doc(
            &reform_years,
            &reformed,
            &clp,
            Baseline::Policy(&clp),
        )?);
    }
    Ok(doc)
}
