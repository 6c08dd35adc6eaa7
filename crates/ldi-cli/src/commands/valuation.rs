use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use ldi_core::bonds::{self, Bond, BondValuationInput};
use ldi_core::valuation::schedule::{self, ScheduleValuationInput};
use ldi_core::CashFlowSchedule;

use crate::input;

/// Arguments for cash-flow schedule valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ValueArgs {
    /// Annual cash flows paid at years 1, 2, ... (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub amounts: Vec<Decimal>,

    /// Flat annual discount rate (e.g. 0.02 for 2%)
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Rate bump for DV01 in basis points
    #[arg(long)]
    pub bump_bps: Option<Decimal>,

    /// Label for the schedule
    #[arg(long, default_value = "liabilities")]
    pub name: String,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for bond valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct BondArgs {
    /// Annual coupon rate (e.g. 0.015 for 1.5%)
    #[arg(long)]
    pub coupon_rate: Option<Decimal>,

    /// Whole years to maturity
    #[arg(long)]
    pub maturity_years: Option<u32>,

    /// Face value
    #[arg(long, default_value = "1")]
    pub face_value: Decimal,

    /// Flat annual discount rate
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Rate bump for DV01 in basis points
    #[arg(long)]
    pub bump_bps: Option<Decimal>,

    /// Bond label
    #[arg(long, default_value = "bond")]
    pub name: String,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_value(args: ValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let value_input: ScheduleValuationInput = match input::load(args.input.as_deref())? {
        Some(data) => data,
        None => {
            if args.amounts.is_empty() {
                return Err("--amounts is required (or provide --input)".into());
            }
            ScheduleValuationInput {
                name: args.name,
                schedule: CashFlowSchedule::annual(&args.amounts),
                discount_rate: args
                    .discount_rate
                    .ok_or("--discount-rate is required (or provide --input)")?,
                bump_bps: args.bump_bps,
            }
        }
    };

    let result = schedule::value_cash_flows(&value_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_bond(args: BondArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let bond_input: BondValuationInput = match input::load(args.input.as_deref())? {
        Some(data) => data,
        None => BondValuationInput {
            bond: Bond::new(
                args.name,
                args.coupon_rate
                    .ok_or("--coupon-rate is required (or provide --input)")?,
                args.maturity_years
                    .ok_or("--maturity-years is required (or provide --input)")?,
                args.face_value,
            )?,
            discount_rate: args
                .discount_rate
                .ok_or("--discount-rate is required (or provide --input)")?,
            bump_bps: args.bump_bps,
        },
    };

    let result = bonds::analyze_bond(&bond_input)?;
    Ok(serde_json::to_value(result)?)
}
