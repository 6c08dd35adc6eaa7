use clap::Args;
use serde_json::Value;

use ldi_core::analysis::{self, LdiAnalysisInput};

use crate::input;

/// Arguments for the full liability hedging analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON input file with liabilities, bonds, rate path and funding assumptions
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let analysis_input: LdiAnalysisInput = input::load(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for analysis")?;

    let result = analysis::run_ldi_analysis(&analysis_input)?;
    Ok(serde_json::to_value(result)?)
}
