//! Foundational types: money, members, records, periods and configuration.

pub mod config;
pub mod member;
pub mod money;
pub mod period;
pub mod record;
