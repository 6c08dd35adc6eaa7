use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::LdiError;
use crate::time_value::{discount, discount_factor};
use crate::types::{with_metadata, CashFlowSchedule, ComputationOutput, Money, Rate, Years, BASIS_POINT};
use crate::valuation::sensitivity::{value_schedule, ValuationResult};
use crate::LdiResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Valuation request for a liability (or any other) cash-flow schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleValuationInput {
    pub name: String,
    pub schedule: CashFlowSchedule,
    /// Flat annual discount rate as a decimal.
    pub discount_rate: Rate,
    /// Rate bump for DV01 in basis points (default 1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bump_bps: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Contribution of a single flow to the schedule's present value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountedFlow {
    pub time: Years,
    pub amount: Money,
    pub discount_factor: Decimal,
    pub present_value: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleValuationOutput {
    pub name: String,
    pub flow_count: usize,
    pub undiscounted_total: Money,
    pub valuation: ValuationResult,
    pub discounted_flows: Vec<DiscountedFlow>,
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Convert an optional bump in basis points to a decimal rate bump.
pub fn bump_from_bps(bump_bps: Option<Decimal>) -> LdiResult<Rate> {
    let bps = bump_bps.unwrap_or(dec!(1));
    let bump = bps * BASIS_POINT;
    if bump <= Decimal::ZERO {
        return Err(LdiError::InvalidRate {
            rate: bump,
            reason: "bump_bps must be positive".into(),
        });
    }
    Ok(bump)
}

/// Value a cash-flow schedule: PV, central-difference DV01, modified duration
/// and a per-flow discounting breakdown.
pub fn value_cash_flows(
    input: &ScheduleValuationInput,
) -> LdiResult<ComputationOutput<ScheduleValuationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let bump = bump_from_bps(input.bump_bps)?;
    if input.schedule.is_empty() {
        return Err(LdiError::InsufficientData(format!(
            "Schedule '{}' has no cash flows",
            input.name
        )));
    }

    let valuation = value_schedule(&input.schedule, input.discount_rate, bump)?;

    let mut discounted_flows = Vec::with_capacity(input.schedule.len());
    for flow in input.schedule.iter() {
        let factor = discount_factor(input.discount_rate, flow.time)?;
        discounted_flows.push(DiscountedFlow {
            time: flow.time,
            amount: flow.amount,
            discount_factor: discount(Decimal::ONE, factor, flow.time)?,
            present_value: discount(flow.amount, factor, flow.time)?,
        });
    }

    if input.schedule.iter().any(|f| f.amount < Decimal::ZERO) {
        warnings.push(
            "Schedule contains negative cash flows; DV01 sign may not reflect a pure liability"
                .into(),
        );
    }
    if bump > dec!(0.005) {
        warnings.push(format!(
            "Bump of {} is large; central difference may misstate first-order sensitivity",
            bump
        ));
    }

    tracing::debug!(
        name = %input.name,
        pv = %valuation.present_value,
        dv01 = %valuation.dv01,
        "valued cash-flow schedule"
    );

    let output = ScheduleValuationOutput {
        name: input.name.clone(),
        flow_count: input.schedule.len(),
        undiscounted_total: input.schedule.total(),
        valuation,
        discounted_flows,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Discrete annual compounding PV with central-difference DV01",
        &serde_json::json!({
            "discount_rate": input.discount_rate.to_string(),
            "bump": bump.to_string(),
            "compounding": "annual, (1 + r)^t",
            "dv01_sign": "positive when PV falls as rates rise",
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn liability_input() -> ScheduleValuationInput {
        ScheduleValuationInput {
            name: "Pension liabilities".into(),
            schedule: CashFlowSchedule::annual(&[dec!(300000); 30]),
            discount_rate: dec!(0.03),
            bump_bps: None,
        }
    }

    #[test]
    fn test_value_cash_flows_defaults_to_one_bp() {
        let out = value_cash_flows(&liability_input()).unwrap();
        assert_eq!(out.result.valuation.bump, dec!(0.0001));
        assert_eq!(out.result.flow_count, 30);
        assert_eq!(out.result.undiscounted_total, dec!(9000000));
    }

    #[test]
    fn test_discounted_flows_sum_to_pv() {
        let out = value_cash_flows(&liability_input()).unwrap();
        let sum: Money = out
            .result
            .discounted_flows
            .iter()
            .map(|f| f.present_value)
            .sum();
        assert!((sum - out.result.valuation.present_value).abs() < dec!(0.000001));
    }

    #[test]
    fn test_discount_factors_decline() {
        let out = value_cash_flows(&liability_input()).unwrap();
        let dfs: Vec<Decimal> = out
            .result
            .discounted_flows
            .iter()
            .map(|f| f.discount_factor)
            .collect();
        assert!(dfs.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_empty_schedule_rejected() {
        let mut input = liability_input();
        input.schedule = CashFlowSchedule::default();
        let err = value_cash_flows(&input).unwrap_err();
        assert!(matches!(err, LdiError::InsufficientData(_)));
    }

    #[test]
    fn test_negative_bump_rejected() {
        let mut input = liability_input();
        input.bump_bps = Some(dec!(-1));
        match value_cash_flows(&input).unwrap_err() {
            LdiError::InvalidRate { rate, .. } => assert_eq!(rate, dec!(-0.0001)),
            other => panic!("Expected InvalidRate, got {other:?}"),
        }
    }

    #[test]
    fn test_warning_on_large_bump() {
        let mut input = liability_input();
        input.bump_bps = Some(dec!(100));
        let out = value_cash_flows(&input).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("large")));
    }

    #[test]
    fn test_overflowing_discount_is_typed() {
        let input = ScheduleValuationInput {
            name: "Deep discount".into(),
            schedule: CashFlowSchedule::from_pairs(&[(dec!(20), dec!(10000000000))]).unwrap(),
            discount_rate: dec!(-0.9),
            bump_bps: None,
        };
        let err = value_cash_flows(&input).unwrap_err();
        assert!(matches!(err, LdiError::MathOverflow { .. }), "got {err:?}");
    }
}
