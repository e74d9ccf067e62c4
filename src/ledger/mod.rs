//! Turning records into balances: aggregation, net positions and spend totals.

pub mod aggregator;
pub mod balance;
pub mod summary;
