//! # ledger-settlement
//!
//! Balance and settlement engine for groups that share expenses.
//!
//! Given a member roster and the group's expenses, incomes and utility
//! bills, this engine computes every member's net balance, a short list of
//! "who pays whom how much" transfers, and one-shot budget alerts.
//!
//! ## Architecture
//!
//! - **core** — Foundational types: money, members, records, periods, configuration
//! - **ledger** — Aggregation into paid/owed tallies, net balances, spend summaries
//! - **settlement** — Greedy debtor/creditor matching
//! - **budget** — Stateful threshold latches per period
//! - **engine** — The pipeline wired together under one configuration
//! - **simulation** — Random group generation for testing and benchmarks
//!
//! The engine performs no I/O. Everything except the budget monitor is a
//! pure function of its input.

pub mod budget;
pub mod core;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod settlement;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::budget::monitor::{BudgetAlertEvent, BudgetLimit, BudgetMonitor};
    pub use crate::core::config::EngineConfig;
    pub use crate::core::member::{Member, MemberId, Roster};
    pub use crate::core::money::Money;
    pub use crate::core::period::PeriodKey;
    pub use crate::core::record::{Expense, Income, RecordSet, UtilityBill};
    pub use crate::engine::{LedgerEngine, LedgerReport};
    pub use crate::error::LedgerError;
    pub use crate::ledger::balance::{Balance, BalanceSheet, BalanceStatus};
    pub use crate::settlement::solver::{SettlementPlan, SettlementTransaction};
}
