use crate::core::member::MemberId;
use crate::core::money::{Money, Tolerance};
use crate::ledger::aggregator::Aggregation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the settlement a member is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceStatus {
    /// Is owed money.
    Creditor,
    /// Owes money.
    Debtor,
    Settled,
}

impl fmt::Display for BalanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BalanceStatus::Creditor => "CREDITOR",
            BalanceStatus::Debtor => "DEBTOR",
            BalanceStatus::Settled => "SETTLED",
        };
        write!(f, "{label}")
    }
}

/// Net position of one member.
///
/// A positive `net` means the member is owed (net creditor).
/// A negative `net` means the member owes (net debtor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub member: MemberId,
    pub paid: Money,
    pub owed: Money,
    pub net: Money,
    pub status: BalanceStatus,
}

impl Balance {
    pub fn new(member: MemberId, paid: Money, owed: Money, tolerance: Tolerance) -> Self {
        let net = paid - owed;
        Self {
            member,
            paid,
            owed,
            net,
            status: classify(net, tolerance),
        }
    }
}

pub fn classify(net: Money, tolerance: Tolerance) -> BalanceStatus {
    if tolerance.is_positive(net) {
        BalanceStatus::Creditor
    } else if tolerance.is_negative(net) {
        BalanceStatus::Debtor
    } else {
        BalanceStatus::Settled
    }
}

/// Every member's balance, ordered by member id.
///
/// `common_fund` carries the realized bills paid by the group pool; the
/// sheet is conserved when `Σ net + common_fund` is within tolerance of
/// zero. With no realized bills that is plain `Σ net == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheet {
    balances: Vec<Balance>,
    common_fund: Money,
    tolerance: Tolerance,
}

impl BalanceSheet {
    pub fn new(balances: Vec<Balance>, common_fund: Money, tolerance: Tolerance) -> Self {
        Self {
            balances,
            common_fund,
            tolerance,
        }
    }

    pub fn balances(&self) -> &[Balance] {
        &self.balances
    }

    pub fn balance_of(&self, member: &MemberId) -> Option<&Balance> {
        self.balances.iter().find(|b| &b.member == member)
    }

    pub fn common_fund(&self) -> Money {
        self.common_fund
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    pub fn net_sum(&self) -> Money {
        self.balances.iter().map(|b| b.net).sum()
    }

    /// Verify conservation: whatever members paid is owed by the group.
    pub fn is_conserved(&self) -> bool {
        self.tolerance.is_zero(self.net_sum() + self.common_fund)
    }

    pub fn debtors(&self) -> impl Iterator<Item = &Balance> {
        self.balances
            .iter()
            .filter(|b| b.status == BalanceStatus::Debtor)
    }

    pub fn creditors(&self) -> impl Iterator<Item = &Balance> {
        self.balances
            .iter()
            .filter(|b| b.status == BalanceStatus::Creditor)
    }

    pub fn is_settled(&self) -> bool {
        self.balances
            .iter()
            .all(|b| b.status == BalanceStatus::Settled)
    }
}

impl fmt::Display for BalanceSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Balances ===")?;
        for b in &self.balances {
            writeln!(
                f,
                "  {:<16} paid {:>12}  owed {:>12}  net {:>12}  {}",
                b.member, b.paid, b.owed, b.net, b.status
            )?;
        }
        if !self.common_fund.is_zero() {
            writeln!(f, "  Common fund:     {}", self.common_fund)?;
        }
        writeln!(f, "  Conserved:       {}", self.is_conserved())
    }
}

/// Projects aggregator output into classified balances.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceCalculator {
    tolerance: Tolerance,
}

impl BalanceCalculator {
    pub fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    /// `net = paid - owed` for every member, O(n).
    pub fn calculate(&self, aggregation: &Aggregation) -> BalanceSheet {
        let balances = aggregation
            .tallies()
            .iter()
            .map(|(member, tally)| {
                Balance::new(member.clone(), tally.paid, tally.owed, self.tolerance)
            })
            .collect();
        BalanceSheet::new(balances, aggregation.common_fund(), self.tolerance)
    }
}
