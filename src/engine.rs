use crate::budget::monitor::BudgetMonitor;
use crate::core::config::EngineConfig;
use crate::core::member::Roster;
use crate::core::record::RecordSet;
use crate::error::Result;
use crate::ledger::aggregator::{Aggregation, LedgerAggregator};
use crate::ledger::balance::{BalanceCalculator, BalanceSheet};
use crate::ledger::summary::SpendSummary;
use crate::settlement::solver::{SettlementPlan, SettlementSolver};
use log::info;
use serde::{Deserialize, Serialize};

/// Everything one pipeline run produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReport {
    pub aggregation: Aggregation,
    pub balances: BalanceSheet,
    pub settlement: SettlementPlan,
}

impl LedgerReport {
    /// Whether applying the settlement leaves every member settled.
    pub fn is_valid(&self) -> bool {
        self.balances.is_conserved()
            && self
                .settlement
                .settles(self.balances.balances(), self.balances.tolerance())
    }
}

impl std::fmt::Display for LedgerReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.balances)?;
        write!(f, "{}", self.settlement)
    }
}

/// Aggregator, balance calculator and settlement solver wired together
/// under one configuration.
///
/// The engine holds no state between calls; it is safe to share and to
/// re-run on every data refresh.
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    config: EngineConfig,
    aggregator: LedgerAggregator,
    calculator: BalanceCalculator,
    solver: SettlementSolver,
}

impl LedgerEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config))
    }

    fn assemble(config: EngineConfig) -> Self {
        let tolerance = config.tolerance();
        Self {
            aggregator: LedgerAggregator::from_config(&config),
            calculator: BalanceCalculator::new(tolerance),
            solver: SettlementSolver::new(tolerance),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn aggregate(&self, roster: &Roster, records: &RecordSet) -> Result<Aggregation> {
        self.aggregator.aggregate(roster, records)
    }

    pub fn balances(&self, roster: &Roster, records: &RecordSet) -> Result<BalanceSheet> {
        let aggregation = self.aggregate(roster, records)?;
        Ok(self.calculator.calculate(&aggregation))
    }

    /// Run the full pipeline: records → tallies → balances → settlement.
    pub fn compute(&self, roster: &Roster, records: &RecordSet) -> Result<LedgerReport> {
        let aggregation = self.aggregate(roster, records)?;
        let balances = self.calculator.calculate(&aggregation);
        let settlement = self.solver.solve(&balances);

        info!(
            "settled {} members with {} transfers ({} moved)",
            roster.len(),
            settlement.transfer_count(),
            settlement.total_transferred()
        );

        Ok(LedgerReport {
            aggregation,
            balances,
            settlement,
        })
    }

    /// The subset of `records` the aggregator accepts. Under
    /// [`RecordPolicy::Reject`](crate::core::config::RecordPolicy::Reject)
    /// any bad record fails the whole call instead.
    pub fn accepted_records(&self, roster: &Roster, records: &RecordSet) -> Result<RecordSet> {
        let aggregation = self.aggregate(roster, records)?;
        Ok(records.excluding(&aggregation.excluded_ids()))
    }

    /// Spend summary over the accepted records only, so `total_spent`
    /// always equals the aggregation's expenses plus realized bills.
    pub fn spend_summary(&self, roster: &Roster, records: &RecordSet) -> Result<SpendSummary> {
        let accepted = self.accepted_records(roster, records)?;
        Ok(SpendSummary::from_records(&accepted))
    }

    /// A fresh monitor using the configured thresholds.
    pub fn budget_monitor(&self) -> BudgetMonitor {
        BudgetMonitor::from_config(&self.config)
    }
}

impl Default for LedgerEngine {
    fn default() -> Self {
        Self::assemble(EngineConfig::default())
    }
}
