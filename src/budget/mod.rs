//! Budget threshold alerting.

pub mod monitor;
