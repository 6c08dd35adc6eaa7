use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::LdiError;
use crate::types::{with_metadata, CashFlow, CashFlowSchedule, ComputationOutput, Money, Rate};
use crate::valuation::schedule::bump_from_bps;
use crate::valuation::sensitivity::{value_schedule, ValuationResult};
use crate::LdiResult;

fn default_face_value() -> Money {
    Decimal::ONE
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A fixed-rate bullet government bond paying annual coupons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    pub name: String,
    /// Annual coupon rate as a decimal (0.015 = 1.5%)
    pub coupon_rate: Rate,
    /// Whole years to maturity
    pub maturity_years: u32,
    /// Principal repaid at maturity (default 1)
    #[serde(default = "default_face_value")]
    pub face_value: Money,
}

/// Bond valuation at a flat rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondValuation {
    pub name: String,
    pub coupon_rate: Rate,
    pub maturity_years: u32,
    pub face_value: Money,
    /// Price as a percentage of face
    pub price_pct_of_face: Decimal,
    pub valuation: ValuationResult,
    /// DV01 for one unit of face value; this is what hedge sizing divides by
    pub dv01_per_unit: Money,
}

/// Input for a single bond valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondValuationInput {
    pub bond: Bond,
    pub discount_rate: Rate,
    /// Rate bump for DV01 in basis points (default 1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bump_bps: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Bond
// ---------------------------------------------------------------------------

impl Bond {
    pub fn new(
        name: impl Into<String>,
        coupon_rate: Rate,
        maturity_years: u32,
        face_value: Money,
    ) -> LdiResult<Self> {
        let bond = Self {
            name: name.into(),
            coupon_rate,
            maturity_years,
            face_value,
        };
        bond.validate()?;
        Ok(bond)
    }

    pub fn validate(&self) -> LdiResult<()> {
        if self.maturity_years == 0 {
            return Err(LdiError::InvalidInput {
                field: "maturity_years".into(),
                reason: format!("Bond '{}' must mature at least one year out", self.name),
            });
        }
        if self.coupon_rate < Decimal::ZERO || self.coupon_rate > Decimal::ONE {
            return Err(LdiError::InvalidInput {
                field: "coupon_rate".into(),
                reason: format!("Bond '{}' coupon must be in [0, 1]", self.name),
            });
        }
        if self.face_value <= Decimal::ZERO {
            return Err(LdiError::InvalidInput {
                field: "face_value".into(),
                reason: format!("Bond '{}' face value must be positive", self.name),
            });
        }
        Ok(())
    }

    /// Annual coupons at years 1..=maturity with principal added to the last.
    pub fn cash_flows(&self) -> CashFlowSchedule {
        let coupon = self.coupon_rate * self.face_value;
        let flows = (1..=self.maturity_years)
            .map(|year| {
                let amount = if year == self.maturity_years {
                    coupon + self.face_value
                } else {
                    coupon
                };
                CashFlow::new(Decimal::from(year), amount)
            })
            .collect();
        CashFlowSchedule { flows }
    }

    /// Same bond terms with a different face value.
    pub fn with_face_value(&self, face_value: Money) -> LdiResult<Self> {
        Self::new(self.name.clone(), self.coupon_rate, self.maturity_years, face_value)
    }
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// Price, DV01 and modified duration of a bond at a flat rate.
pub fn value_bond(bond: &Bond, rate: Rate, bump: Rate) -> LdiResult<BondValuation> {
    bond.validate()?;
    let valuation = value_schedule(&bond.cash_flows(), rate, bump)?;
    let dv01_per_unit = valuation
        .dv01
        .checked_div(bond.face_value)
        .ok_or_else(|| LdiError::overflow("bond DV01 per unit of face"))?;
    let price_pct_of_face = valuation
        .present_value
        .checked_div(bond.face_value)
        .and_then(|p| p.checked_mul(dec!(100)))
        .ok_or_else(|| LdiError::overflow("bond price as % of face"))?;

    Ok(BondValuation {
        name: bond.name.clone(),
        coupon_rate: bond.coupon_rate,
        maturity_years: bond.maturity_years,
        face_value: bond.face_value,
        price_pct_of_face,
        valuation,
        dv01_per_unit,
    })
}

/// Value a single bond and wrap the result in the standard envelope.
pub fn analyze_bond(input: &BondValuationInput) -> LdiResult<ComputationOutput<BondValuation>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let bump = bump_from_bps(input.bump_bps)?;
    let result = value_bond(&input.bond, input.discount_rate, bump)?;

    if input.bond.coupon_rate.is_zero() {
        warnings.push(format!(
            "Bond '{}' is a zero-coupon bond; modified duration ≈ maturity / (1 + r)",
            input.bond.name
        ));
    }
    if input.discount_rate > input.bond.coupon_rate {
        warnings.push(format!(
            "Bond '{}' trades below par at this rate ({:.4}% of face)",
            input.bond.name, result.price_pct_of_face
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Annual-coupon bullet bond, discrete compounding, central-difference DV01",
        &serde_json::json!({
            "discount_rate": input.discount_rate.to_string(),
            "bump": bump.to_string(),
            "coupon_frequency": 1,
        }),
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BASIS_POINT;
    use rust_decimal_macros::dec;

    fn bond_b() -> Bond {
        Bond::new("bond_b", dec!(0.015), 20, dec!(1)).unwrap()
    }

    #[test]
    fn test_cash_flows_coupons_then_principal() {
        let bond = Bond::new("b", dec!(0.05), 3, dec!(100)).unwrap();
        let s = bond.cash_flows();
        let amounts: Vec<Money> = s.iter().map(|f| f.amount).collect();
        assert_eq!(amounts, vec![dec!(5.00), dec!(5.00), dec!(105.00)]);
        assert_eq!(s.final_time(), dec!(3));
    }

    #[test]
    fn test_par_bond_prices_at_face() {
        let bond = Bond::new("par", dec!(0.03), 10, dec!(1000)).unwrap();
        let v = value_bond(&bond, dec!(0.03), BASIS_POINT).unwrap();
        assert!((v.valuation.present_value - dec!(1000)).abs() < dec!(0.000001));
        assert!((v.price_pct_of_face - dec!(100)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_dv01_per_unit_independent_of_face() {
        let small = value_bond(&bond_b(), dec!(0.02), BASIS_POINT).unwrap();
        let large = value_bond(&bond_b().with_face_value(dec!(1000000)).unwrap(), dec!(0.02), BASIS_POINT)
            .unwrap();
        assert!((small.dv01_per_unit - large.dv01_per_unit).abs() < dec!(0.0000000001));
        assert!((large.valuation.dv01 - small.valuation.dv01 * dec!(1000000)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_longer_bond_has_longer_duration() {
        let short = Bond::new("a", dec!(0.015), 5, dec!(1)).unwrap();
        let long = Bond::new("c", dec!(0.015), 30, dec!(1)).unwrap();
        let ds = value_bond(&short, dec!(0.02), BASIS_POINT).unwrap();
        let dl = value_bond(&long, dec!(0.02), BASIS_POINT).unwrap();
        assert!(dl.valuation.modified_duration > ds.valuation.modified_duration);
    }

    #[test]
    fn test_validation_zero_maturity() {
        match Bond::new("x", dec!(0.01), 0, dec!(1)).unwrap_err() {
            LdiError::InvalidInput { field, .. } => assert_eq!(field, "maturity_years"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_coupon_out_of_range() {
        match Bond::new("x", dec!(1.5), 5, dec!(1)).unwrap_err() {
            LdiError::InvalidInput { field, .. } => assert_eq!(field, "coupon_rate"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_face_value_defaults_to_one() {
        let bond: Bond =
            serde_json::from_str(r#"{"name":"bond_a","coupon_rate":"0.01","maturity_years":10}"#)
                .unwrap();
        assert_eq!(bond.face_value, Decimal::ONE);
    }

    #[test]
    fn test_analyze_bond_discount_warning() {
        let input = BondValuationInput {
            bond: bond_b(),
            discount_rate: dec!(0.03),
            bump_bps: None,
        };
        let out = analyze_bond(&input).unwrap();
        assert!(out.result.price_pct_of_face < dec!(100));
        assert!(out.warnings.iter().any(|w| w.contains("below par")));
    }
}
