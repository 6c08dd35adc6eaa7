use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LdiError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid rate {rate}: {reason}")]
    InvalidRate { rate: Decimal, reason: String },

    #[error("Degenerate valuation in {context}: present value is zero")]
    DegenerateValuation { context: String },

    #[error("Zero sensitivity: {instrument} has a DV01 of zero and cannot be used for hedging")]
    ZeroSensitivity { instrument: String },

    #[error("No finite funding solution: total asset growth rate {growth_rate} must be positive")]
    NoFiniteFundingSolution { growth_rate: Decimal },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Decimal overflow in {context}")]
    MathOverflow { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LdiError {
    pub(crate) fn overflow(context: impl Into<String>) -> Self {
        LdiError::MathOverflow {
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for LdiError {
    fn from(e: serde_json::Error) -> Self {
        LdiError::SerializationError(e.to_string())
    }
}
