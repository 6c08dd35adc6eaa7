use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use ldi_core::funding::{self, FundingInput, GrowthRange};

use crate::input;

/// Arguments for funding projection
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct FundingArgs {
    /// Current assets / liabilities (e.g. 0.8)
    #[arg(long)]
    pub initial_funding_ratio: Option<Decimal>,

    /// Base nominal asset growth rate
    #[arg(long)]
    pub nominal_rate: Option<Decimal>,

    /// Additional growth on top of the nominal rate
    #[arg(long)]
    pub additional_rate: Option<Decimal>,

    /// Sweep additional growth over the default range (-1% to 5% in 0.1% steps)
    #[arg(long)]
    pub sweep: bool,

    /// Sweep start (implies --sweep)
    #[arg(long)]
    pub sweep_start: Option<Decimal>,

    /// Sweep end (implies --sweep)
    #[arg(long)]
    pub sweep_end: Option<Decimal>,

    /// Sweep step (implies --sweep)
    #[arg(long)]
    pub sweep_step: Option<Decimal>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

fn sweep_from_args(args: &FundingArgs) -> Option<GrowthRange> {
    let custom = args.sweep_start.is_some() || args.sweep_end.is_some() || args.sweep_step.is_some();
    if !args.sweep && !custom {
        return None;
    }
    let default = GrowthRange::default();
    Some(GrowthRange {
        start: args.sweep_start.unwrap_or(default.start),
        end: args.sweep_end.unwrap_or(default.end),
        step: args.sweep_step.unwrap_or(default.step),
    })
}

pub fn run_funding(args: FundingArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let funding_input: FundingInput = match input::load(args.input.as_deref())? {
        Some(data) => data,
        None => FundingInput {
            initial_funding_ratio: args
                .initial_funding_ratio
                .ok_or("--initial-funding-ratio is required (or provide --input)")?,
            nominal_rate: args
                .nominal_rate
                .ok_or("--nominal-rate is required (or provide --input)")?,
            additional_rate: args.additional_rate,
            sweep: sweep_from_args(&args),
        },
    };

    let result = funding::project_funding(&funding_input)?;
    Ok(serde_json::to_value(result)?)
}
