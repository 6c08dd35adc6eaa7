use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::bonds::{value_bond, Bond, BondValuation};
use crate::error::LdiError;
use crate::types::{
    validate_rate_path, with_metadata, CashFlowSchedule, ComputationOutput, Money, Rate,
    RateObservation, DEFAULT_HEDGE_PERCENTAGE,
};
use crate::valuation::schedule::bump_from_bps;
use crate::valuation::sensitivity::{dv01, value_schedule, ValuationResult};
use crate::LdiResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Size a single-bond hedge of a liability schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeInput {
    pub liabilities: CashFlowSchedule,
    pub bond: Bond,
    pub discount_rate: Rate,
    /// Fraction of liability DV01 to offset (default 0.5). Values above 1 over-hedge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hedge_percentage: Option<Rate>,
    /// Rate bump for DV01 in basis points (default 1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bump_bps: Option<Decimal>,
    /// Optional rate path along which to track the hedge ratio of the sized notional.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rate_path: Vec<RateObservation>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeResult {
    /// Liability DV01 / bond DV01 per unit of face
    pub hedge_ratio: Decimal,
    pub target_hedge_percentage: Rate,
    /// Face value of the bond to hold
    pub notional: Money,
    /// DV01 delivered by `notional` of the bond
    pub hedged_dv01: Money,
    /// Liability DV01 left unhedged
    pub residual_dv01: Money,
}

/// Hedge ratio of a fixed notional at one point of a rate path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeRatioPoint {
    pub day: u32,
    pub rate: Rate,
    pub liability_dv01: Money,
    pub bond_dv01: Money,
    pub hedge_ratio: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeOutput {
    pub liabilities: ValuationResult,
    pub bond: BondValuation,
    pub hedge: HedgeResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hedge_ratio_path: Vec<HedgeRatioPoint>,
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Units of the hedging asset needed to match one unit of liability sensitivity:
/// `liability_dv01 / asset_dv01`.
pub fn hedge_ratio(liability_dv01: Money, asset_dv01: Money) -> LdiResult<Decimal> {
    if asset_dv01.is_zero() {
        return Err(LdiError::ZeroSensitivity {
            instrument: "hedging asset".into(),
        });
    }
    liability_dv01
        .checked_div(asset_dv01)
        .ok_or_else(|| LdiError::overflow("hedge ratio: asset DV01 too small"))
}

/// Face value of the bond that offsets `hedge_percentage` of the liability DV01:
/// `h · liability_dv01 / bond_dv01`.
pub fn notional(hedge_percentage: Rate, liability_dv01: Money, bond_dv01: Money) -> LdiResult<Money> {
    if hedge_percentage <= Decimal::ZERO {
        return Err(LdiError::InvalidInput {
            field: "hedge_percentage".into(),
            reason: "Must be positive".into(),
        });
    }
    hedge_ratio(liability_dv01, bond_dv01)?
        .checked_mul(hedge_percentage)
        .ok_or_else(|| LdiError::overflow("hedge notional"))
}

/// Fraction of liability DV01 covered by holding `notional` of the bond:
/// `notional · bond_dv01 / liability_dv01`.
pub fn hedge_percentage_for_notional(
    notional: Money,
    bond_dv01: Money,
    liability_dv01: Money,
) -> LdiResult<Rate> {
    if liability_dv01.is_zero() {
        return Err(LdiError::ZeroSensitivity {
            instrument: "liabilities".into(),
        });
    }
    notional
        .checked_mul(bond_dv01)
        .and_then(|covered| covered.checked_div(liability_dv01))
        .ok_or_else(|| LdiError::overflow("implied hedge percentage"))
}

/// Hedge ratio and notional for one liability / bond pair.
pub fn size_hedge(
    liability_dv01: Money,
    bond: &BondValuation,
    hedge_percentage: Rate,
) -> LdiResult<HedgeResult> {
    if bond.dv01_per_unit.is_zero() {
        return Err(LdiError::ZeroSensitivity {
            instrument: bond.name.clone(),
        });
    }
    let ratio = hedge_ratio(liability_dv01, bond.dv01_per_unit)?;
    let notional = notional(hedge_percentage, liability_dv01, bond.dv01_per_unit)?;
    let hedged_dv01 = notional
        .checked_mul(bond.dv01_per_unit)
        .ok_or_else(|| LdiError::overflow("hedged DV01"))?;
    let residual_dv01 = liability_dv01
        .checked_sub(hedged_dv01)
        .ok_or_else(|| LdiError::overflow("residual DV01"))?;

    Ok(HedgeResult {
        hedge_ratio: ratio,
        target_hedge_percentage: hedge_percentage,
        notional,
        hedged_dv01,
        residual_dv01,
    })
}

// ---------------------------------------------------------------------------
// Hedge ratio along a rate path
// ---------------------------------------------------------------------------

fn hedge_ratio_point(
    liabilities: &CashFlowSchedule,
    bond_flows: &CashFlowSchedule,
    face_value: Money,
    notional: Money,
    obs: &RateObservation,
    bump: Rate,
) -> LdiResult<HedgeRatioPoint> {
    let liability_dv01 = dv01(liabilities, obs.rate, bump)?;
    let bond_dv01 = dv01(bond_flows, obs.rate, bump)?
        .checked_div(face_value)
        .ok_or_else(|| LdiError::overflow("bond DV01 per unit of face"))?;
    let hedge_ratio = hedge_percentage_for_notional(notional, bond_dv01, liability_dv01)?;
    Ok(HedgeRatioPoint {
        day: obs.day,
        rate: obs.rate,
        liability_dv01,
        bond_dv01,
        hedge_ratio,
    })
}

/// Re-price both legs at every observed rate and report how much of the
/// liability DV01 a fixed `notional` of `bond` covers.
///
/// Points are returned in input order. With the `parallel` feature the
/// observations are evaluated on the rayon pool.
pub fn hedge_ratio_path(
    liabilities: &CashFlowSchedule,
    bond: &Bond,
    notional: Money,
    rate_path: &[RateObservation],
    bump: Rate,
) -> LdiResult<Vec<HedgeRatioPoint>> {
    liabilities.validate()?;
    bond.validate()?;
    validate_rate_path(rate_path)?;
    let bond_flows = bond.cash_flows();
    collect_points(rate_path, |obs| {
        hedge_ratio_point(liabilities, &bond_flows, bond.face_value, notional, obs, bump)
    })
}

#[cfg(feature = "parallel")]
fn collect_points<F>(rate_path: &[RateObservation], f: F) -> LdiResult<Vec<HedgeRatioPoint>>
where
    F: Fn(&RateObservation) -> LdiResult<HedgeRatioPoint> + Sync + Send,
{
    use rayon::prelude::*;
    rate_path.par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn collect_points<F>(rate_path: &[RateObservation], f: F) -> LdiResult<Vec<HedgeRatioPoint>>
where
    F: Fn(&RateObservation) -> LdiResult<HedgeRatioPoint>,
{
    rate_path.iter().map(f).collect()
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Value the liabilities and the bond, size the hedge, and optionally track
/// the hedge ratio of the resulting notional along a rate path.
pub fn design_hedge(input: &HedgeInput) -> LdiResult<ComputationOutput<HedgeOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let bump = bump_from_bps(input.bump_bps)?;
    let hedge_percentage = input.hedge_percentage.unwrap_or(DEFAULT_HEDGE_PERCENTAGE);
    if input.liabilities.is_empty() {
        return Err(LdiError::InsufficientData(
            "Liability schedule has no cash flows".into(),
        ));
    }

    let liabilities = value_schedule(&input.liabilities, input.discount_rate, bump)?;
    let bond = value_bond(&input.bond, input.discount_rate, bump)?;
    let hedge = size_hedge(liabilities.dv01, &bond, hedge_percentage)?;

    let hedge_ratio_path = hedge_ratio_path(
        &input.liabilities,
        &input.bond,
        hedge.notional,
        &input.rate_path,
        bump,
    )?;

    if hedge_percentage > Decimal::ONE {
        warnings.push(format!(
            "Hedge percentage {} exceeds 100%; position over-hedges liability DV01",
            hedge_percentage
        ));
    }
    if hedge.notional > liabilities.present_value {
        warnings.push(format!(
            "Notional {:.2} of '{}' exceeds liability PV {:.2}; consider a longer bond",
            hedge.notional, bond.name, liabilities.present_value
        ));
    }
    if let Some(drift) = max_drift(&hedge_ratio_path, hedge_percentage) {
        if drift > dec!(0.05) {
            warnings.push(format!(
                "Hedge ratio drifts up to {:.4} from target along the rate path",
                drift
            ));
        }
    }

    tracing::debug!(
        bond = %bond.name,
        notional = %hedge.notional,
        hedge_ratio = %hedge.hedge_ratio,
        "sized hedge"
    );

    let output = HedgeOutput {
        liabilities,
        bond,
        hedge,
        hedge_ratio_path,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "DV01-matched single-bond hedge",
        &serde_json::json!({
            "discount_rate": input.discount_rate.to_string(),
            "bump": bump.to_string(),
            "hedge_percentage": hedge_percentage.to_string(),
            "rate_path_points": input.rate_path.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Largest absolute gap between the path hedge ratio and the target.
pub fn max_drift(path: &[HedgeRatioPoint], target: Rate) -> Option<Decimal> {
    path.iter().map(|p| (p.hedge_ratio - target).abs()).max()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
