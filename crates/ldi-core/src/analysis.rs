use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::bonds::{value_bond, Bond, BondValuation};
use crate::error::LdiError;
use crate::funding::{project_funding, FundingInput, FundingOutput};
use crate::hedging::{hedge_ratio_path, max_drift, size_hedge, HedgeRatioPoint, HedgeResult};
use crate::types::{
    validate_rate_path, with_metadata, CashFlowSchedule, ComputationOutput, Rate,
    RateObservation, DEFAULT_HEDGE_PERCENTAGE,
};
use crate::valuation::schedule::bump_from_bps;
use crate::valuation::sensitivity::{value_schedule, ValuationResult};
use crate::LdiResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Full liability-hedging analysis for one plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdiAnalysisInput {
    pub plan_name: String,
    /// Projected liability cash flows.
    pub liabilities: CashFlowSchedule,
    /// Flat discount rate. Falls back to the first rate of `rate_path`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<Rate>,
    /// Candidate hedging bonds.
    pub bonds: Vec<Bond>,
    /// Observed or scenario rates, one per day from now.
    #[serde(default)]
    pub rate_path: Vec<RateObservation>,
    /// Fraction of liability DV01 to hedge (default 0.5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hedge_percentage: Option<Rate>,
    /// Rate bump for DV01 in basis points (default 1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bump_bps: Option<Decimal>,
    /// Optional funding-ratio projection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding: Option<FundingInput>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Where the flat discount rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Input,
    RatePath,
}

/// Valuation and hedge sizing for one candidate bond.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondHedgeAnalysis {
    pub bond: BondValuation,
    pub hedge: HedgeResult,
    /// Liability modified duration minus bond modified duration
    pub duration_gap: Decimal,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hedge_ratio_path: Vec<HedgeRatioPoint>,
    /// Largest distance of the path hedge ratio from the target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_hedge_ratio_drift: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdiAnalysisOutput {
    pub plan_name: String,
    pub discount_rate: Rate,
    pub discount_rate_source: RateSource,
    pub hedge_percentage: Rate,
    pub liabilities: ValuationResult,
    pub bonds: Vec<BondHedgeAnalysis>,
    /// Bond whose modified duration is closest to the liabilities'
    pub closest_duration_match: String,
    /// Bond whose hedge ratio moves least along the rate path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_stable_hedge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding: Option<FundingOutput>,
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

fn resolve_discount_rate(input: &LdiAnalysisInput) -> LdiResult<(Rate, RateSource)> {
    match (input.discount_rate, input.rate_path.first()) {
        (Some(rate), _) => Ok((rate, RateSource::Input)),
        (None, Some(obs)) => Ok((obs.rate, RateSource::RatePath)),
        (None, None) => Err(LdiError::InsufficientData(
            "discount_rate or a non-empty rate_path is required".into(),
        )),
    }
}

/// Value the liabilities, value and size a hedge with every candidate bond,
/// track each hedge along the rate path, and project funding.
pub fn run_ldi_analysis(input: &LdiAnalysisInput) -> LdiResult<ComputationOutput<LdiAnalysisOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // -- Validation ----------------------------------------------------------
    if input.liabilities.is_empty() {
        return Err(LdiError::InsufficientData(
            "Liability schedule has no cash flows".into(),
        ));
    }
    if input.bonds.is_empty() {
        return Err(LdiError::InsufficientData(
            "At least one candidate bond is required".into(),
        ));
    }
    validate_rate_path(&input.rate_path)?;
    let bump = bump_from_bps(input.bump_bps)?;
    let hedge_percentage = input.hedge_percentage.unwrap_or(DEFAULT_HEDGE_PERCENTAGE);
    let (discount_rate, discount_rate_source) = resolve_discount_rate(input)?;

    // -- Liabilities ---------------------------------------------------------
    let liabilities = value_schedule(&input.liabilities, discount_rate, bump)?;
    tracing::debug!(
        plan = %input.plan_name,
        pv = %liabilities.present_value,
        dv01 = %liabilities.dv01,
        modified_duration = %liabilities.modified_duration,
        "valued liabilities"
    );

    // -- Bonds and hedges ----------------------------------------------------
    let mut bonds = Vec::with_capacity(input.bonds.len());
    for bond in &input.bonds {
        let valuation = value_bond(bond, discount_rate, bump)?;
        let hedge = size_hedge(liabilities.dv01, &valuation, hedge_percentage)?;
        let path = hedge_ratio_path(
            &input.liabilities,
            bond,
            hedge.notional,
            &input.rate_path,
            bump,
        )?;
        let drift = max_drift(&path, hedge_percentage);
        let duration_gap = liabilities.modified_duration - valuation.valuation.modified_duration;

        tracing::debug!(
            bond = %bond.name,
            notional = %hedge.notional,
            duration_gap = %duration_gap,
            "sized hedge"
        );

        bonds.push(BondHedgeAnalysis {
            bond: valuation,
            hedge,
            duration_gap,
            hedge_ratio_path: path,
            max_hedge_ratio_drift: drift,
        });
    }

    let closest_duration_match = bonds
        .iter()
        .min_by_key(|b| b.duration_gap.abs())
        .map(|b| b.bond.name.clone())
        .unwrap_or_default();

    let most_stable_hedge = bonds
        .iter()
        .filter_map(|b| b.max_hedge_ratio_drift.map(|d| (d, &b.bond.name)))
        .min_by_key(|(d, _)| *d)
        .map(|(_, name)| name.clone());

    // -- Funding -------------------------------------------------------------
    let funding = match &input.funding {
        Some(f) => {
            let projection = project_funding(f)?;
            warnings.extend(projection.warnings);
            Some(projection.result)
        }
        None => None,
    };

    // -- Warnings ------------------------------------------------------------
    if hedge_percentage > Decimal::ONE {
        warnings.push(format!(
            "Hedge percentage {} exceeds 100%; positions over-hedge liability DV01",
            hedge_percentage
        ));
    }
    if bonds.iter().all(|b| b.duration_gap > Decimal::ZERO) {
        warnings.push(
            "Every candidate bond is shorter than the liabilities; notionals exceed a duration-matched hedge"
                .into(),
        );
    }
    if input.rate_path.is_empty() {
        warnings.push("No rate path supplied; hedge ratio drift not assessed".into());
    }

    tracing::info!(
        plan = %input.plan_name,
        bonds = bonds.len(),
        closest = %closest_duration_match,
        "LDI analysis complete"
    );

    let output = LdiAnalysisOutput {
        plan_name: input.plan_name.clone(),
        discount_rate,
        discount_rate_source,
        hedge_percentage,
        liabilities,
        bonds,
        closest_duration_match,
        most_stable_hedge,
        funding,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Liability DV01 hedging with single government bonds (flat curve, central difference)",
        &serde_json::json!({
            "discount_rate": discount_rate.to_string(),
            "discount_rate_source": discount_rate_source,
            "bump": bump.to_string(),
            "hedge_percentage": hedge_percentage.to_string(),
            "term_structure": "flat",
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
