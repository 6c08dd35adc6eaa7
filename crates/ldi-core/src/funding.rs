use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::LdiError;
use crate::types::{with_metadata, ComputationOutput, Rate, Years};
use crate::LdiResult;

const MAX_SWEEP_POINTS: usize = 10_000;

/// Longest year-by-year funding ratio path that will be built.
pub const MAX_PATH_YEARS: u32 = 1_000;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Inclusive range of additional asset growth rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthRange {
    pub start: Rate,
    pub end: Rate,
    pub step: Rate,
}

impl Default for GrowthRange {
    /// -1% to +5% in 0.1% steps.
    fn default() -> Self {
        Self {
            start: dec!(-0.01),
            end: dec!(0.05),
            step: dec!(0.001),
        }
    }
}

/// Funding-ratio projection with liabilities held constant and assets
/// compounding at `1 + nominal_rate + additional_rate` per year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingInput {
    /// Assets / liabilities today.
    pub initial_funding_ratio: Rate,
    /// Nominal asset growth rate.
    pub nominal_rate: Rate,
    /// Single additional growth rate to project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_rate: Option<Rate>,
    /// Range of additional growth rates to sweep.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep: Option<GrowthRange>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingSweepPoint {
    pub additional_rate: Rate,
    /// `None` where full funding is never reached.
    pub years_to_full_funding: Option<Years>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingSweep {
    pub points: Vec<FundingSweepPoint>,
    /// Years to full funding at zero additional growth, linearly interpolated
    /// between attainable sweep points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_at_zero_additional: Option<Years>,
    pub unattainable_count: usize,
}

/// Funding ratio at the end of a projection year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingRatioStep {
    pub year: u32,
    pub funding_ratio: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingOutput {
    pub initial_funding_ratio: Rate,
    pub nominal_rate: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_rate: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_to_full_funding: Option<Years>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub funding_ratio_path: Vec<FundingRatioStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep: Option<FundingSweep>,
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

fn validate_funding_ratio(initial_funding_ratio: Rate) -> LdiResult<()> {
    if initial_funding_ratio <= Decimal::ZERO {
        return Err(LdiError::InvalidInput {
            field: "initial_funding_ratio".into(),
            reason: "Must be positive".into(),
        });
    }
    Ok(())
}

fn ln(value: Decimal, context: &str) -> LdiResult<Decimal> {
    value.checked_ln().ok_or_else(|| LdiError::MathOverflow {
        context: format!("ln({value}) in {context}"),
    })
}

/// Years until assets growing at `1 + n + x` catch constant liabilities:
/// `t = ln(1 / F0) / ln(1 + n + x)`.
///
/// A plan that is already fully funded (`F0 >= 1`) needs zero years. An
/// underfunded plan whose assets do not grow has no finite answer.
pub fn time_to_full_funding(
    initial_funding_ratio: Rate,
    nominal_rate: Rate,
    additional_rate: Rate,
) -> LdiResult<Years> {
    validate_funding_ratio(initial_funding_ratio)?;
    if initial_funding_ratio >= Decimal::ONE {
        return Ok(Decimal::ZERO);
    }

    let growth_rate = nominal_rate + additional_rate;
    if growth_rate <= Decimal::ZERO {
        return Err(LdiError::NoFiniteFundingSolution { growth_rate });
    }

    let gap = ln(Decimal::ONE / initial_funding_ratio, "funding gap")?;
    let growth = ln(Decimal::ONE + growth_rate, "asset growth")?;
    if growth.is_zero() {
        return Err(LdiError::NoFiniteFundingSolution { growth_rate });
    }
    Ok(gap / growth)
}

/// Funding ratio `F0 · (1 + g)^t` at each whole year up to and including `years`.
pub fn funding_ratio_path(
    initial_funding_ratio: Rate,
    growth_rate: Rate,
    years: u32,
) -> LdiResult<Vec<FundingRatioStep>> {
    validate_funding_ratio(initial_funding_ratio)?;
    if years > MAX_PATH_YEARS {
        return Err(LdiError::InvalidInput {
            field: "years".into(),
            reason: format!("Path is limited to {MAX_PATH_YEARS} years"),
        });
    }
    if growth_rate <= dec!(-1) {
        return Err(LdiError::InvalidRate {
            rate: growth_rate,
            reason: "Growth rate must be greater than -100%".into(),
        });
    }
    let one_plus_g = Decimal::ONE + growth_rate;
    let mut ratio = initial_funding_ratio;
    let mut steps = Vec::with_capacity(years as usize + 1);
    for year in 0..=years {
        if year > 0 {
            ratio = ratio
                .checked_mul(one_plus_g)
                .ok_or_else(|| LdiError::MathOverflow {
                    context: format!("funding ratio path at year {year}"),
                })?;
        }
        steps.push(FundingRatioStep {
            year,
            funding_ratio: ratio,
        });
    }
    Ok(steps)
}

/// Evaluate [`time_to_full_funding`] over an inclusive range of additional rates.
pub fn funding_sweep(
    initial_funding_ratio: Rate,
    nominal_rate: Rate,
    range: &GrowthRange,
) -> LdiResult<FundingSweep> {
    validate_funding_ratio(initial_funding_ratio)?;
    if range.step <= Decimal::ZERO {
        return Err(LdiError::InvalidInput {
            field: "sweep.step".into(),
            reason: "Must be positive".into(),
        });
    }
    if range.end < range.start {
        return Err(LdiError::InvalidInput {
            field: "sweep.end".into(),
            reason: "Must not be below sweep.start".into(),
        });
    }
    let too_many = || LdiError::InvalidInput {
        field: "sweep.step".into(),
        reason: format!("Sweep would produce more than {MAX_SWEEP_POINTS} points"),
    };
    let span = range
        .end
        .checked_sub(range.start)
        .and_then(|width| width.checked_div(range.step))
        .ok_or_else(too_many)?
        .floor();
    let count = span.to_usize().map(|n| n + 1).unwrap_or(usize::MAX);
    if count > MAX_SWEEP_POINTS {
        return Err(LdiError::InvalidInput {
            field: "sweep.step".into(),
            reason: format!("Sweep would produce more than {MAX_SWEEP_POINTS} points"),
        });
    }

    let mut points = Vec::with_capacity(count);
    for i in 0..count {
        let x = range.start + Decimal::from(i as u64) * range.step;
        let years = match time_to_full_funding(initial_funding_ratio, nominal_rate, x) {
            Ok(t) => Some(t),
            Err(LdiError::NoFiniteFundingSolution { .. }) => None,
            Err(e) => return Err(e),
        };
        points.push(FundingSweepPoint {
            additional_rate: x,
            years_to_full_funding: years,
        });
    }

    let unattainable_count = points
        .iter()
        .filter(|p| p.years_to_full_funding.is_none())
        .count();
    let years_at_zero_additional = interpolate_at_zero(&points);

    Ok(FundingSweep {
        points,
        years_at_zero_additional,
        unattainable_count,
    })
}

/// Linear interpolation of years-to-funding at `additional_rate = 0`, using
/// only attainable points. `None` when zero lies outside their range.
fn interpolate_at_zero(points: &[FundingSweepPoint]) -> Option<Years> {
    let attainable: Vec<(Rate, Years)> = points
        .iter()
        .filter_map(|p| p.years_to_full_funding.map(|t| (p.additional_rate, t)))
        .collect();

    for pair in attainable.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x0 <= Decimal::ZERO && Decimal::ZERO <= x1 {
            if x1 == x0 {
                return Some(y0);
            }
            return Some(y0 + (y1 - y0) * (Decimal::ZERO - x0) / (x1 - x0));
        }
    }
    match attainable.as_slice() {
        [(x, y)] if x.is_zero() => Some(*y),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Project time to full funding for a single growth assumption and/or a sweep.
pub fn project_funding(input: &FundingInput) -> LdiResult<ComputationOutput<FundingOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_funding_ratio(input.initial_funding_ratio)?;
    if input.additional_rate.is_none() && input.sweep.is_none() {
        return Err(LdiError::InsufficientData(
            "Provide additional_rate, sweep, or both".into(),
        ));
    }

    if input.initial_funding_ratio >= Decimal::ONE {
        warnings.push("Plan is already fully funded".into());
    }

    let mut years_to_full_funding = None;
    let mut funding_ratio_path_out = Vec::new();
    if let Some(x) = input.additional_rate {
        let t = time_to_full_funding(input.initial_funding_ratio, input.nominal_rate, x)?;
        let within_cap = t.ceil().to_u32().filter(|&y| y <= MAX_PATH_YEARS);
        let horizon = within_cap.unwrap_or(MAX_PATH_YEARS);
        if within_cap.is_none() {
            warnings.push(format!(
                "Funding ratio path truncated at {MAX_PATH_YEARS} years; full funding takes {:.1} years",
                t
            ));
        }
        funding_ratio_path_out =
            funding_ratio_path(input.initial_funding_ratio, input.nominal_rate + x, horizon)?;
        if t > dec!(30) {
            warnings.push(format!(
                "Full funding takes {:.1} years at {} additional growth",
                t, x
            ));
        }
        years_to_full_funding = Some(t);
    }

    let sweep = match &input.sweep {
        Some(range) => {
            let s = funding_sweep(input.initial_funding_ratio, input.nominal_rate, range)?;
            if s.unattainable_count > 0 {
                warnings.push(format!(
                    "{} sweep point(s) never reach full funding (total growth <= 0)",
                    s.unattainable_count
                ));
            }
            Some(s)
        }
        None => None,
    };

    tracing::debug!(
        initial_funding_ratio = %input.initial_funding_ratio,
        years = ?years_to_full_funding,
        "projected funding"
    );

    let output = FundingOutput {
        initial_funding_ratio: input.initial_funding_ratio,
        nominal_rate: input.nominal_rate,
        additional_rate: input.additional_rate,
        years_to_full_funding,
        funding_ratio_path: funding_ratio_path_out,
        sweep,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Closed-form time to full funding: ln(1/F0) / ln(1 + n + x)",
        &serde_json::json!({
            "liabilities": "held constant",
            "asset_growth": "annual compounding at 1 + nominal + additional",
            "initial_funding_ratio": input.initial_funding_ratio.to_string(),
            "nominal_rate": input.nominal_rate.to_string(),
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

    #[test]
    fn test_half_funded_at_five_percent() {
        let t = time_to_full_funding(dec!(0.5), dec!(0.05), Decimal::ZERO).unwrap();
        // ln 2 / ln 1.05 = 14.2067
        assert!((t - dec!(14.2067)).abs() < dec!(0.0001), "t={t}");
    }

    #[test]
    fn test_split_between_nominal_and_additional() {
        let a = time_to_full_funding(dec!(0.5), dec!(0.05), Decimal::ZERO).unwrap();
        let b = time_to_full_funding(dec!(0.5), dec!(0.015), dec!(0.035)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_eighty_percent_funded_reference() {
        // ln(1.25) / ln(1.015) = 14.99
        let t = time_to_full_funding(dec!(0.8), dec!(0.015), Decimal::ZERO).unwrap();
        assert!((t - dec!(14.99)).abs() < dec!(0.01), "t={t}");
    }

    #[test]
    fn test_already_funded_is_zero_years() {
        let t = time_to_full_funding(dec!(1.1), dec!(0.015), Decimal::ZERO).unwrap();
        assert_eq!(t, Decimal::ZERO);
        let t = time_to_full_funding(dec!(1), dec!(-0.5), Decimal::ZERO).unwrap();
        assert_eq!(t, Decimal::ZERO);
    }

    #[test]
    fn test_no_growth_has_no_solution() {
        let err = time_to_full_funding(dec!(0.8), dec!(0.015), dec!(-0.015)).unwrap_err();
        assert!(matches!(err, LdiError::NoFiniteFundingSolution { .. }));
        let err = time_to_full_funding(dec!(0.8), dec!(0.015), dec!(-0.02)).unwrap_err();
        assert!(matches!(err, LdiError::NoFiniteFundingSolution { .. }));
    }

    #[test]
    fn test_non_positive_funding_ratio_rejected() {
        match time_to_full_funding(Decimal::ZERO, dec!(0.02), Decimal::ZERO).unwrap_err() {
            LdiError::InvalidInput { field, .. } => assert_eq!(field, "initial_funding_ratio"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_more_growth_funds_sooner() {
        let slow = time_to_full_funding(dec!(0.8), dec!(0.015), dec!(0.005)).unwrap();
        let fast = time_to_full_funding(dec!(0.8), dec!(0.015), dec!(0.03)).unwrap();
        assert!(fast < slow);
    }

    #[test]
    fn test_default_sweep_shape() {
        let sweep = funding_sweep(dec!(0.8), dec!(0.015), &GrowthRange::default()).unwrap();
        assert_eq!(sweep.points.len(), 61);
        assert_eq!(sweep.points[0].additional_rate, dec!(-0.01));
        assert_eq!(sweep.points[60].additional_rate, dec!(0.05));
        // lowest total growth in the default range is 0.5%
        assert_eq!(sweep.unattainable_count, 0);
        let at_zero = sweep.years_at_zero_additional.unwrap();
        assert!((at_zero - dec!(14.99)).abs() < dec!(0.01), "at_zero={at_zero}");
    }

    #[test]
    fn test_sweep_marks_unattainable_points() {
        let range = GrowthRange {
            start: dec!(-0.03),
            end: dec!(0.01),
            step: dec!(0.005),
        };
        let sweep = funding_sweep(dec!(0.8), dec!(0.015), &range).unwrap();
        // -3.0, -2.5, -2.0, -1.5 give total growth <= 0
        assert_eq!(sweep.unattainable_count, 4);
        assert!(sweep.points[0].years_to_full_funding.is_none());
        assert!(sweep.points[4].years_to_full_funding.is_some());
        assert!(sweep.years_at_zero_additional.is_some());
    }

    #[test]
    fn test_sweep_without_zero_has_no_interpolation() {
        let range = GrowthRange {
            start: dec!(0.01),
            end: dec!(0.02),
            step: dec!(0.005),
        };
        let sweep = funding_sweep(dec!(0.8), dec!(0.015), &range).unwrap();
        assert!(sweep.years_at_zero_additional.is_none());
    }

    #[test]
    fn test_sweep_rejects_zero_step() {
        let range = GrowthRange {
            start: dec!(0),
            end: dec!(0.05),
            step: dec!(0),
        };
        assert!(funding_sweep(dec!(0.8), dec!(0.015), &range).is_err());
    }

    #[test]
    fn test_funding_ratio_path_crosses_one_at_projected_year() {
        let t = time_to_full_funding(dec!(0.8), dec!(0.015), dec!(0.02)).unwrap();
        let horizon = t.ceil().to_u32().unwrap();
        let path = funding_ratio_path(dec!(0.8), dec!(0.035), horizon).unwrap();
        assert_eq!(path.len(), horizon as usize + 1);
        assert!(path[path.len() - 2].funding_ratio < Decimal::ONE);
        assert!(path[path.len() - 1].funding_ratio >= Decimal::ONE);
    }

    #[test]
    fn test_project_funding_requires_rate_or_sweep() {
        let input = FundingInput {
            initial_funding_ratio: dec!(0.8),
            nominal_rate: dec!(0.015),
            additional_rate: None,
            sweep: None,
        };
        assert!(matches!(
            project_funding(&input).unwrap_err(),
            LdiError::InsufficientData(_)
        ));
    }

    #[test]
    fn test_project_funding_warns_on_long_horizon() {
        let input = FundingInput {
            initial_funding_ratio: dec!(0.6),
            nominal_rate: dec!(0.01),
            additional_rate: Some(Decimal::ZERO),
            sweep: None,
        };
        let out = project_funding(&input).unwrap();
        assert!(out.result.years_to_full_funding.unwrap() > dec!(30));
        assert!(out.warnings.iter().any(|w| w.contains("years")));
    }

    #[test]
    fn test_sweep_step_too_fine_for_decimal_rejected() {
        let range = GrowthRange {
            start: dec!(-10),
            end: dec!(10),
            step: dec!(0.0000000000000000000000000001),
        };
        match funding_sweep(dec!(0.8), dec!(0.015), &range).unwrap_err() {
            LdiError::InvalidInput { field, .. } => assert_eq!(field, "sweep.step"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_slow_growth_path_is_capped() {
        let input = FundingInput {
            initial_funding_ratio: dec!(0.5),
            nominal_rate: dec!(0.000001),
            additional_rate: Some(Decimal::ZERO),
            sweep: None,
        };
        let out = project_funding(&input).unwrap();
        // ln 2 / ln 1.000001 is roughly 693,147 years
        assert!(out.result.years_to_full_funding.unwrap() > dec!(693000));
        assert_eq!(out.result.funding_ratio_path.len(), MAX_PATH_YEARS as usize + 1);
        assert!(out.warnings.iter().any(|w| w.contains("truncated")));
    }

    #[test]
    fn test_funding_ratio_path_rejects_horizon_over_cap() {
        match funding_ratio_path(dec!(0.5), dec!(0.01), MAX_PATH_YEARS + 1).unwrap_err() {
            LdiError::InvalidInput { field, .. } => assert_eq!(field, "years"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }
}
