use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use ldi_core::hedging::{self, HedgeInput};

use crate::input;

/// Arguments for hedge sizing
#[derive(Args)]
pub struct HedgeArgs {
    /// Path to JSON input file with liabilities, bond and discount rate
    #[arg(long)]
    pub input: Option<String>,

    /// Override the target hedge percentage (e.g. 0.5 for 50%)
    #[arg(long)]
    pub hedge_percentage: Option<Decimal>,
}

pub fn run_hedge(args: HedgeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut hedge_input: HedgeInput = input::load(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for hedge sizing")?;
    if args.hedge_percentage.is_some() {
        hedge_input.hedge_percentage = args.hedge_percentage;
    }

    let result = hedging::design_hedge(&hedge_input)?;
    Ok(serde_json::to_value(result)?)
}
