pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "bonds")]
pub mod bonds;

#[cfg(feature = "hedging")]
pub mod hedging;

#[cfg(feature = "funding")]
pub mod funding;

#[cfg(feature = "analysis")]
pub mod analysis;

pub use error::LdiError;
pub use types::*;

/// Standard result type for all LDI operations
pub type LdiResult<T> = Result<T, LdiError>;
