use crate::core::member::{MemberId, Roster};
use crate::core::money::{Money, Tolerance};
use crate::ledger::balance::{Balance, BalanceSheet};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A suggested point-to-point transfer. `amount` is always positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementTransaction {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Money,
}

/// A transfer between one member and the group's common fund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundTransfer {
    pub member: MemberId,
    pub amount: Money,
}

/// Result of [`SettlementSolver::solve`].
///
/// When the balances are zero-sum (no realized bills) both fund lists are
/// empty and `transactions` alone zeroes every member. Realized bills leave
/// debt with no member creditor; that remainder is reported as
/// `fund_contributions` (member pays the common fund). `fund_payouts` is
/// the mirror case and only shows up for hand-built, non-conserved input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub transactions: Vec<SettlementTransaction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fund_contributions: Vec<FundTransfer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fund_payouts: Vec<FundTransfer>,
}

impl SettlementPlan {
    pub fn transfer_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn total_transferred(&self) -> Money {
        self.transactions.iter().map(|t| t.amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
            && self.fund_contributions.is_empty()
            && self.fund_payouts.is_empty()
    }

    /// Net balances left after every transfer in the plan is carried out:
    /// the payer's net rises, the receiver's falls.
    pub fn apply(&self, balances: &[Balance]) -> BTreeMap<MemberId, Money> {
        let mut residual: BTreeMap<MemberId, Money> = balances
            .iter()
            .map(|b| (b.member.clone(), b.net))
            .collect();

        for tx in &self.transactions {
            *residual.entry(tx.from.clone()).or_default() += tx.amount;
            *residual.entry(tx.to.clone()).or_default() -= tx.amount;
        }
        for c in &self.fund_contributions {
            *residual.entry(c.member.clone()).or_default() += c.amount;
        }
        for p in &self.fund_payouts {
            *residual.entry(p.member.clone()).or_default() -= p.amount;
        }
        residual
    }

    /// Whether applying the plan leaves everyone within `tolerance` of zero.
    pub fn settles(&self, balances: &[Balance], tolerance: Tolerance) -> bool {
        self.apply(balances)
            .values()
            .all(|net| tolerance.is_zero(*net))
    }

    /// Render the plan using display names from `roster`.
    pub fn describe(&self, roster: &Roster) -> String {
        let mut lines = Vec::new();
        for tx in &self.transactions {
            lines.push(format!(
                "{} pays {} {}",
                roster.name_of(&tx.from),
                roster.name_of(&tx.to),
                tx.amount
            ));
        }
        for c in &self.fund_contributions {
            lines.push(format!(
                "{} pays the common fund {}",
                roster.name_of(&c.member),
                c.amount
            ));
        }
        for p in &self.fund_payouts {
            lines.push(format!(
                "the common fund pays {} {}",
                roster.name_of(&p.member),
                p.amount
            ));
        }
        lines.join("\n")
    }
}

impl fmt::Display for SettlementPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Settlement Plan ===")?;
        writeln!(f, "Transfers:       {}", self.transfer_count())?;
        writeln!(f, "Total moved:     {}", self.total_transferred())?;
        for tx in &self.transactions {
            writeln!(f, "  {} → {}: {}", tx.from, tx.to, tx.amount)?;
        }
        for c in &self.fund_contributions {
            writeln!(f, "  {} → common fund: {}", c.member, c.amount)?;
        }
        for p in &self.fund_payouts {
            writeln!(f, "  common fund → {}: {}", p.member, p.amount)?;
        }
        Ok(())
    }
}

/// Greedy debtor/creditor matching.
///
/// This is a practical heuristic, not a minimal-transaction solver: finding
/// the true minimum is a subset-sum style problem and NP-hard in general.
/// The greedy walk does guarantee at most `debtors + creditors - 1`
/// transfers, hence at most `members - 1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementSolver {
    tolerance: Tolerance,
}

impl SettlementSolver {
    pub fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    pub fn solve(&self, sheet: &BalanceSheet) -> SettlementPlan {
        self.solve_balances(sheet.balances())
    }

    /// # Algorithm
    ///
    /// 1. Split members into debtors (net < -tolerance) and creditors
    ///    (net > tolerance); settled members are ignored.
    /// 2. Debtors ascending by net (most negative first), creditors
    ///    descending; equal nets fall back to member id.
    /// 3. Walk both lists, moving `min(|debt|, credit)` each step and
    ///    advancing whichever side reached zero.
    ///
    /// O(n log n) for the sort, O(n) for the walk.
    pub fn solve_balances(&self, balances: &[Balance]) -> SettlementPlan {
        let tol = self.tolerance;

        let mut debtors: Vec<(&MemberId, Money)> = balances
            .iter()
            .filter(|b| tol.is_negative(b.net))
            .map(|b| (&b.member, b.net))
            .collect();
        debtors.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

        let mut creditors: Vec<(&MemberId, Money)> = balances
            .iter()
            .filter(|b| tol.is_positive(b.net))
            .map(|b| (&b.member, b.net))
            .collect();
        creditors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        // Work with owed amounts as positives on both sides.
        for d in &mut debtors {
            d.1 = -d.1;
        }

        let mut transactions = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < debtors.len() && j < creditors.len() {
            let amount = debtors[i].1.min(creditors[j].1);
            if !tol.is_zero(amount) {
                debug!("settle {} → {}: {}", debtors[i].0, creditors[j].0, amount);
                transactions.push(SettlementTransaction {
                    from: debtors[i].0.clone(),
                    to: creditors[j].0.clone(),
                    amount,
                });
            }
            debtors[i].1 -= amount;
            creditors[j].1 -= amount;

            if tol.is_zero(debtors[i].1) {
                i += 1;
            }
            if tol.is_zero(creditors[j].1) {
                j += 1;
            }
        }

        let fund_contributions = leftovers(&debtors[i..], tol);
        let fund_payouts = leftovers(&creditors[j..], tol);

        SettlementPlan {
            transactions,
            fund_contributions,
            fund_payouts,
        }
    }
}

fn leftovers(side: &[(&MemberId, Money)], tol: Tolerance) -> Vec<FundTransfer> {
    side.iter()
        .filter(|(_, remaining)| !tol.is_zero(*remaining))
        .map(|(member, remaining)| FundTransfer {
            member: (*member).clone(),
            amount: *remaining,
        })
        .collect()
}
