//! Tax microsimulation CLI
//!
//! Reads a filing-unit table, applies an optional reform and assumption
//! set, computes taxes for one year and writes the results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use tax_microsim::{
    calculator::{reform_documentation, Calculator, MtrOptions, MTR_VALID_VARIABLES},
    growth::{GrowDiff, GrowFactors},
    parameters::{read_json_param_objects, Consumption, Policy},
    records::{Records, Weights, DEFAULT_DATA_PATH, DEFAULT_WEIGHTS_PATH},
};

#[derive(Debug, Parser)]
#[command(name = "tax_microsim", version, about = "Federal income and payroll tax microsimulation")]
struct Args {
    /// Filing-unit CSV table
    #[arg(default_value = DEFAULT_DATA_PATH)]
    input: PathBuf,

    /// Calendar year to compute taxes for
    #[arg(short, long)]
    year: i32,

    /// Year the input table describes
    #[arg(long, default_value_t = 2021)]
    data_year: i32,

    /// Weights CSV with WT<year> columns
    #[arg(long, default_value = DEFAULT_WEIGHTS_PATH)]
    weights: PathBuf,

    /// Policy reform JSON file or text
    #[arg(short, long)]
    reform: Option<String>,

    /// Economic assumptions JSON file or text
    #[arg(short, long)]
    assump: Option<String>,

    /// Write every variable instead of the distribution variables
    #[arg(long)]
    dump: bool,

    /// Output CSV path
    #[arg(short, long, default_value = "tax_output.csv")]
    output: PathBuf,

    /// Also compute marginal tax rates with respect to this variable
    #[arg(long)]
    mtr: Option<String>,

    /// Print a diagnostic table covering this many years
    #[arg(long)]
    diagnostics: Option<usize>,

    /// Print reform documentation and exit
    #[arg(long)]
    docs: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let inputs = read_json_param_objects(args.reform.as_deref(), args.assump.as_deref())
        .context("reading reform and assumptions")?;

    if args.docs {
        print!("{}", reform_documentation(&inputs, None)?);
        return Ok(());
    }

    let mut growfactors = GrowFactors::new()?;
    let mut gdiff_base = GrowDiff::new()?;
    gdiff_base.update_growdiff(&inputs.growdiff_baseline)?;
    gdiff_base.apply_to(&mut growfactors)?;
    let mut gdiff_resp = GrowDiff::new()?;
    gdiff_resp.update_growdiff(&inputs.growdiff_response)?;
    gdiff_resp.apply_to(&mut growfactors)?;

    let mut policy = Policy::with_growfactors(&growfactors)?;
    policy.implement_reform(&inputs.policy)?;
    for w in policy.parameter_warnings() {
        warn!("{}", w);
    }
    let mut consumption = Consumption::new()?;
    consumption.implement_reform(&inputs.consumption)?;

    let weights = Weights::from_csv_path(&args.weights)
        .with_context(|| format!("reading weights from {}", args.weights.display()))?;
    let records = Records::from_csv_path(&args.input, args.data_year, growfactors, Some(weights))
        .with_context(|| format!("reading records from {}", args.input.display()))?;
    info!(
        "Loaded {} filing units for {}",
        records.array_length(),
        args.data_year
    );

    let mut calc = Calculator::new(policy, records, Some(consumption))?;
    calc.advance_to_year(args.year)?;
    calc.calc_all(false)?;

    println!("Tax year {}", calc.current_year());
    println!("  Filing units (weighted):  {:>16.0}", calc.total_weight());
    for (label, var) in [
        ("Income tax ($b)", "iitax"),
        ("Payroll tax ($b)", "payrolltax"),
        ("Combined ($b)", "combined"),
    ] {
        println!("  {:<25} {:>16.3}", label, calc.weighted_total(var)? * 1e-9);
    }

    let mut frame = if args.dump {
        calc.dataframe_all()?
    } else {
        calc.distribution_frame()?
    };

    if let Some(var) = &args.mtr {
        if !MTR_VALID_VARIABLES.contains(&var.as_str()) {
            bail!(
                "--mtr must be one of: {}",
                MTR_VALID_VARIABLES.join(", ")
            );
        }
        let rates = calc.mtr(
            var,
            MtrOptions {
                calc_all_already_called: true,
                ..Default::default()
            },
        )?;
        frame.push("mtr_ptax", rates.payrolltax);
        frame.push("mtr_itax", rates.incometax);
        frame.push("mtr_combined", rates.combined);
    }

    frame
        .to_csv_path(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("Wrote {} rows to {}", frame.num_rows(), args.output.display());

    if let Some(years) = args.diagnostics {
        let rows = calc.diagnostic_table(years)?;
        println!("{}", serde_json::to_string_pretty(&rows)?);
    }
    Ok(())
}
