use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LdiError;
use crate::time_value::{present_value, validate_rate};
use crate::types::{CashFlowSchedule, Money, Rate};
use crate::LdiResult;

/// Below this absolute PV a schedule is treated as worthless for duration purposes.
pub const PV_EPSILON: Decimal = dec!(0.000000000001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Present value and first-order rate sensitivity of one schedule at one rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    /// Rate the schedule was discounted at
    pub rate: Rate,
    /// Bump used for the central difference
    pub bump: Rate,
    pub present_value: Money,
    /// PV at `rate - bump`
    pub pv_down: Money,
    /// PV at `rate + bump`
    pub pv_up: Money,
    /// (pv_down - pv_up) / 2; positive when PV falls as rates rise
    pub dv01: Money,
    /// dv01 / (present_value * bump)
    pub modified_duration: Decimal,
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

fn validate_bump(bump: Rate) -> LdiResult<()> {
    if bump <= Decimal::ZERO {
        return Err(LdiError::InvalidRate {
            rate: bump,
            reason: "Rate bump must be positive".into(),
        });
    }
    Ok(())
}

/// Present values at `rate - bump` and `rate + bump`.
fn bumped_values(schedule: &CashFlowSchedule, rate: Rate, bump: Rate) -> LdiResult<(Money, Money)> {
    validate_bump(bump)?;
    validate_rate(rate)?;
    let pv_down = present_value(schedule, rate - bump)?;
    let pv_up = present_value(schedule, rate + bump)?;
    Ok((pv_down, pv_up))
}

/// Central-difference DV01: `(PV(r - Δr) - PV(r + Δr)) / 2`.
pub fn dv01(schedule: &CashFlowSchedule, rate: Rate, bump: Rate) -> LdiResult<Money> {
    let (pv_down, pv_up) = bumped_values(schedule, rate, bump)?;
    central_difference(pv_down, pv_up)
}

fn central_difference(pv_down: Money, pv_up: Money) -> LdiResult<Money> {
    pv_down
        .checked_sub(pv_up)
        .map(|diff| diff / dec!(2))
        .ok_or_else(|| LdiError::overflow("DV01 central difference"))
}

/// Modified duration: `DV01 / (PV(r) · Δr)`.
///
/// Fails with [`LdiError::DegenerateValuation`] when the schedule is worth
/// (approximately) nothing at `rate`.
pub fn modified_duration(schedule: &CashFlowSchedule, rate: Rate, bump: Rate) -> LdiResult<Decimal> {
    let d = dv01(schedule, rate, bump)?;
    let pv = present_value(schedule, rate)?;
    duration_from_parts(d, pv, bump)
}

fn duration_from_parts(dv01: Money, pv: Money, bump: Rate) -> LdiResult<Decimal> {
    if pv.abs() < PV_EPSILON {
        return Err(LdiError::DegenerateValuation {
            context: "modified duration".into(),
        });
    }
    pv.checked_mul(bump)
        .and_then(|scaled| dv01.checked_div(scaled))
        .ok_or_else(|| LdiError::overflow("modified duration"))
}

/// PV, DV01 and modified duration in one pass (three PV evaluations).
pub fn value_schedule(schedule: &CashFlowSchedule, rate: Rate, bump: Rate) -> LdiResult<ValuationResult> {
    schedule.validate()?;
    let (pv_down, pv_up) = bumped_values(schedule, rate, bump)?;
    let pv = present_value(schedule, rate)?;
    let dv01 = central_difference(pv_down, pv_up)?;
    let modified_duration = duration_from_parts(dv01, pv, bump)?;

    Ok(ValuationResult {
        rate,
        bump,
        present_value: pv,
        pv_down,
        pv_up,
        dv01,
        modified_duration,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_value::present_value_derivative;
    use crate::types::BASIS_POINT;
    use rust_decimal_macros::dec;

    fn coupon_schedule() -> CashFlowSchedule {
        CashFlowSchedule::annual(&[dec!(100), dec!(100), dec!(1100)])
    }

    fn zero_coupon(t: u32) -> CashFlowSchedule {
        CashFlowSchedule::from_pairs(&[(Decimal::from(t), dec!(1000))]).unwrap()
    }

    #[test]
    fn test_dv01_positive_for_long_position() {
        let d = dv01(&coupon_schedule(), dec!(0.05), BASIS_POINT).unwrap();
        assert!(d > Decimal::ZERO);
    }

    #[test]
    fn test_dv01_matches_analytic_derivative() {
        let liabilities = CashFlowSchedule::annual(&[dec!(250000); 40]);
        let rate = dec!(0.025);
        let numeric = dv01(&liabilities, rate, BASIS_POINT).unwrap();
        let analytic = -present_value_derivative(&liabilities, rate).unwrap() * BASIS_POINT;
        let rel_err = ((numeric - analytic) / analytic).abs();
        assert!(rel_err < dec!(0.01), "relative error {rel_err}");
        // Central difference is second-order accurate
        assert!(rel_err < dec!(0.0001), "relative error {rel_err}");
    }

    #[test]
    fn test_dv01_rejects_zero_bump() {
        let err = dv01(&coupon_schedule(), dec!(0.05), Decimal::ZERO).unwrap_err();
        assert!(matches!(err, LdiError::InvalidRate { .. }));
    }

    #[test]
    fn test_dv01_rejects_bump_crossing_minus_one() {
        let err = dv01(&coupon_schedule(), dec!(-0.99995), BASIS_POINT).unwrap_err();
        assert!(matches!(err, LdiError::InvalidRate { .. }));
    }

    #[test]
    fn test_zero_coupon_modified_duration() {
        let rate = dec!(0.04);
        let md = modified_duration(&zero_coupon(10), rate, BASIS_POINT).unwrap();
        let expected = dec!(10) / (Decimal::ONE + rate);
        assert!((md - expected).abs() < dec!(0.0001), "md={md}");
    }

    #[test]
    fn test_zero_coupon_duration_approaches_maturity_at_low_rates() {
        let md = modified_duration(&zero_coupon(20), dec!(0.0001), BASIS_POINT).unwrap();
        assert!((md - dec!(20)).abs() < dec!(0.01), "md={md}");
    }

    #[test]
    fn test_modified_duration_degenerate_schedule() {
        let worthless = CashFlowSchedule::annual(&[dec!(0), dec!(0)]);
        let err = modified_duration(&worthless, dec!(0.03), BASIS_POINT).unwrap_err();
        assert!(matches!(err, LdiError::DegenerateValuation { .. }));
    }

    #[test]
    fn test_value_schedule_consistent_with_primitives() {
        let s = coupon_schedule();
        let v = value_schedule(&s, dec!(0.05), BASIS_POINT).unwrap();
        assert_eq!(v.present_value, present_value(&s, dec!(0.05)).unwrap());
        assert_eq!(v.dv01, dv01(&s, dec!(0.05), BASIS_POINT).unwrap());
        assert_eq!(
            v.modified_duration,
            modified_duration(&s, dec!(0.05), BASIS_POINT).unwrap()
        );
        assert!(v.pv_down > v.present_value && v.present_value > v.pv_up);
    }

    #[test]
    fn test_value_schedule_rejects_unordered_schedule() {
        let s = CashFlowSchedule {
            flows: vec![
                crate::types::CashFlow::new(dec!(2), dec!(1)),
                crate::types::CashFlow::new(dec!(1), dec!(1)),
            ],
        };
        assert!(value_schedule(&s, dec!(0.05), BASIS_POINT).is_err());
    }

    #[test]
    fn test_value_schedule_overflow_is_typed() {
        let s = CashFlowSchedule::from_pairs(&[(dec!(20), dec!(10000000000))]).unwrap();
        let err = value_schedule(&s, dec!(-0.9), BASIS_POINT).unwrap_err();
        assert!(matches!(err, LdiError::MathOverflow { .. }), "got {err:?}");
    }
}
