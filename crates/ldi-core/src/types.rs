use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LdiError;
use crate::LdiResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Year fractions or counts
pub type Years = Decimal;

/// One basis point in decimal rate terms.
pub const BASIS_POINT: Rate = dec!(0.0001);

/// Rate bump used for DV01 and modified duration when none is supplied.
pub const DEFAULT_BUMP: Rate = BASIS_POINT;

/// Fraction of liability DV01 hedged when none is supplied.
pub const DEFAULT_HEDGE_PERCENTAGE: Rate = dec!(0.5);

/// A single cash flow at a time offset (in years) from the valuation date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    pub time: Years,
    pub amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CashFlow {
    pub fn new(time: Years, amount: Money) -> Self {
        Self {
            time,
            amount,
            label: None,
        }
    }
}

/// An ordered cash-flow schedule.
///
/// Time offsets are non-negative and strictly increasing. Schedules built
/// through [`CashFlowSchedule::new`] are checked on construction; schedules
/// that arrive through serde are checked by [`CashFlowSchedule::validate`]
/// before any valuation runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSchedule {
    pub flows: Vec<CashFlow>,
}

impl CashFlowSchedule {
    pub fn new(flows: Vec<CashFlow>) -> LdiResult<Self> {
        let schedule = Self { flows };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Build a schedule from `(time, amount)` pairs.
    pub fn from_pairs(pairs: &[(Years, Money)]) -> LdiResult<Self> {
        Self::new(
            pairs
                .iter()
                .map(|&(time, amount)| CashFlow::new(time, amount))
                .collect(),
        )
    }

    /// Build a schedule of one flow per whole year, starting at year 1.
    pub fn annual(amounts: &[Money]) -> Self {
        Self {
            flows: amounts
                .iter()
                .enumerate()
                .map(|(i, amount)| CashFlow::new(Decimal::from(i as u64 + 1), *amount))
                .collect(),
        }
    }

    pub fn validate(&self) -> LdiResult<()> {
        let mut previous: Option<Years> = None;
        for (i, flow) in self.flows.iter().enumerate() {
            if flow.time < Decimal::ZERO {
                return Err(LdiError::InvalidInput {
                    field: format!("flows[{i}].time"),
                    reason: "Time offset cannot be negative".into(),
                });
            }
            if let Some(prev) = previous {
                if flow.time <= prev {
                    return Err(LdiError::InvalidInput {
                        field: format!("flows[{i}].time"),
                        reason: format!(
                            "Time offsets must be strictly increasing ({} follows {})",
                            flow.time, prev
                        ),
                    });
                }
            }
            previous = Some(flow.time);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CashFlow> {
        self.flows.iter()
    }

    /// Undiscounted sum of all amounts.
    pub fn total(&self) -> Money {
        self.flows.iter().map(|f| f.amount).sum()
    }

    /// Time offset of the last flow, zero for an empty schedule.
    pub fn final_time(&self) -> Years {
        self.flows.last().map(|f| f.time).unwrap_or(Decimal::ZERO)
    }

    /// A copy with every amount multiplied by `factor`.
    pub fn scaled(&self, factor: Decimal) -> Self {
        Self {
            flows: self
                .flows
                .iter()
                .map(|f| CashFlow {
                    time: f.time,
                    amount: f.amount * factor,
                    label: f.label.clone(),
                })
                .collect(),
        }
    }
}

/// One point of a rate path: the flat discount rate observed `day` days from now.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateObservation {
    pub day: u32,
    pub rate: Rate,
}

/// Check that rate-path day offsets are strictly increasing.
pub fn validate_rate_path(path: &[RateObservation]) -> LdiResult<()> {
    for (i, pair) in path.windows(2).enumerate() {
        if pair[1].day <= pair[0].day {
            return Err(LdiError::InvalidInput {
                field: format!("rate_path[{}].day", i + 1),
                reason: format!(
                    "Day offsets must be strictly increasing ({} follows {})",
                    pair[1].day, pair[0].day
                ),
            });
        }
    }
    Ok(())
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
