pub mod analysis;
pub mod funding;
pub mod hedging;
pub mod valuation;
