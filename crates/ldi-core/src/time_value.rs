use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::LdiError;
use crate::types::{CashFlowSchedule, Money, Rate, Years};
use crate::LdiResult;

/// Reject rates at or below -100%, where `1 + r` stops being a usable base.
pub fn validate_rate(rate: Rate) -> LdiResult<()> {
    if rate <= dec!(-1) {
        return Err(LdiError::InvalidRate {
            rate,
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    Ok(())
}

/// Discount factor denominator `(1 + r)^t`.
///
/// Whole-year offsets go through `powi` (exact repeated multiplication);
/// fractional offsets fall back to `powd`.
pub fn discount_factor(rate: Rate, time: Years) -> LdiResult<Decimal> {
    validate_rate(rate)?;
    let one_plus_r = Decimal::ONE + rate;

    let factor = if time.fract().is_zero() {
        time.to_i64().and_then(|n| one_plus_r.checked_powi(n))
    } else {
        one_plus_r.checked_powd(time)
    };

    match factor {
        Some(f) if !f.is_zero() => Ok(f),
        Some(_) => Err(LdiError::MathOverflow {
            context: format!("discount factor underflowed to zero at t={time}"),
        }),
        None => Err(LdiError::MathOverflow {
            context: format!("discount factor (1 + {rate})^{time}"),
        }),
    }
}

/// Present value of a cash-flow schedule under annual discrete compounding.
///
/// An empty schedule is worth zero.
pub fn present_value(schedule: &CashFlowSchedule, rate: Rate) -> LdiResult<Money> {
    validate_rate(rate)?;

    let mut pv = Decimal::ZERO;
    for flow in schedule.iter() {
        let factor = discount_factor(rate, flow.time)?;
        let discounted = discount(flow.amount, factor, flow.time)?;
        pv = pv
            .checked_add(discounted)
            .ok_or_else(|| LdiError::overflow("present value sum"))?;
    }
    Ok(pv)
}

/// `amount / factor`, failing with `MathOverflow` when the quotient does not fit.
pub fn discount(amount: Money, factor: Decimal, time: Years) -> LdiResult<Money> {
    amount
        .checked_div(factor)
        .ok_or_else(|| LdiError::overflow(format!("discounting {amount} at t={time}")))
}

/// Analytic first derivative of PV with respect to the rate:
/// `-Σ t · CF_t / (1 + r)^(t + 1)`.
pub fn present_value_derivative(schedule: &CashFlowSchedule, rate: Rate) -> LdiResult<Decimal> {
    validate_rate(rate)?;
    let one_plus_r = Decimal::ONE + rate;

    let mut d = Decimal::ZERO;
    for flow in schedule.iter() {
        let factor = discount_factor(rate, flow.time)?;
        let num = flow.time.checked_mul(flow.amount);
        let den = factor.checked_mul(one_plus_r);
        d = num
            .zip(den)
            .and_then(|(n, den)| n.checked_div(den))
            .and_then(|term| d.checked_sub(term))
            .ok_or_else(|| LdiError::overflow(format!("PV derivative at t={}", flow.time)))?;
    }
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn three_year_bond() -> CashFlowSchedule {
        CashFlowSchedule::annual(&[dec!(100), dec!(100), dec!(1100)])
    }

    #[test]
    fn test_pv_single_flow_closed_form() {
        let s = CashFlowSchedule::from_pairs(&[(dec!(10), dec!(1000))]).unwrap();
        let pv = present_value(&s, dec!(0.05)).unwrap();
        let expected = dec!(1000) / dec!(1.05).powi(10);
        assert!((pv - expected).abs() < dec!(0.0000001), "pv={pv}");
    }

    #[test]
    fn test_pv_three_year_bond() {
        let pv = present_value(&three_year_bond(), dec!(0.05)).unwrap();
        // 100/1.05 + 100/1.1025 + 1100/1.157625 = 1136.16
        assert!((pv - dec!(1136.16)).abs() < dec!(0.01), "pv={pv}");
    }

    #[test]
    fn test_pv_empty_schedule_is_zero() {
        let pv = present_value(&CashFlowSchedule::default(), dec!(0.03)).unwrap();
        assert_eq!(pv, Decimal::ZERO);
    }

    #[test]
    fn test_pv_zero_rate_is_undiscounted_total() {
        let s = three_year_bond();
        assert_eq!(present_value(&s, Decimal::ZERO).unwrap(), s.total());
    }

    #[test]
    fn test_pv_fractional_time() {
        let s = CashFlowSchedule::from_pairs(&[(dec!(0.5), dec!(100))]).unwrap();
        let pv = present_value(&s, dec!(0.21)).unwrap();
        // sqrt(1.21) = 1.1
        assert!((pv - dec!(100) / dec!(1.1)).abs() < dec!(0.000001), "pv={pv}");
    }

    #[test]
    fn test_pv_rejects_rate_at_minus_one() {
        let err = present_value(&three_year_bond(), dec!(-1)).unwrap_err();
        assert!(matches!(err, LdiError::InvalidRate { .. }));
    }

    #[test]
    fn test_pv_decreasing_in_rate() {
        let s = three_year_bond();
        let mut last = present_value(&s, dec!(-0.02)).unwrap();
        for bps in 0..20 {
            let r = Decimal::from(bps) * dec!(0.005);
            let pv = present_value(&s, r).unwrap();
            assert!(pv < last, "PV should fall as rate rises (r={r})");
            last = pv;
        }
    }

    #[test]
    fn test_pv_overflow_near_minus_one_is_typed() {
        // 1e10 / 0.1^20 = 1e30, beyond Decimal range
        let s = CashFlowSchedule::from_pairs(&[(dec!(20), dec!(10000000000))]).unwrap();
        let err = present_value(&s, dec!(-0.9)).unwrap_err();
        assert!(matches!(err, LdiError::MathOverflow { .. }), "got {err:?}");
        let err = present_value_derivative(&s, dec!(-0.9)).unwrap_err();
        assert!(matches!(err, LdiError::MathOverflow { .. }), "got {err:?}");
    }

    #[test]
    fn test_derivative_negative_for_positive_flows() {
        let d = present_value_derivative(&three_year_bond(), dec!(0.04)).unwrap();
        assert!(d < Decimal::ZERO);
    }
}
