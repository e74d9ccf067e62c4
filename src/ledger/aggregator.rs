use crate::core::config::{EngineConfig, RecordPolicy};
use crate::core::member::{MemberId, Roster};
use crate::core::money::{Money, RemainderPolicy};
use crate::core::record::{Expense, MonetaryRecord, RecordId, RecordSet, UtilityBill};
use crate::error::{InvalidReason, LedgerError, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// What one member put in and what they are responsible for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberTally {
    /// Sum of expenses this member paid for.
    pub paid: Money,
    /// Sum of this member's shares across expenses and realized bills.
    pub owed: Money,
}

/// A record dropped under [`RecordPolicy::Exclude`], with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedRecord {
    pub record: RecordId,
    pub error: LedgerError,
}

impl fmt::Display for ExcludedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

/// Output of [`LedgerAggregator::aggregate`].
///
/// `common_fund` is the total of realized utility bills. Bills are paid by
/// the group's shared pool rather than a member, so they appear on the
/// `owed` side of every member with no matching `paid` entry. Across the
/// whole group `Σ owed == Σ paid + common_fund` holds exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    tallies: BTreeMap<MemberId, MemberTally>,
    expense_total: Money,
    common_fund: Money,
    income_total: Money,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    excluded: Vec<ExcludedRecord>,
}

impl Aggregation {
    pub fn tallies(&self) -> &BTreeMap<MemberId, MemberTally> {
        &self.tallies
    }

    pub fn tally(&self, member: &MemberId) -> MemberTally {
        self.tallies.get(member).copied().unwrap_or_default()
    }

    pub fn expense_total(&self) -> Money {
        self.expense_total
    }

    pub fn common_fund(&self) -> Money {
        self.common_fund
    }

    pub fn income_total(&self) -> Money {
        self.income_total
    }

    /// Realized spend: accepted expenses plus paid bills.
    pub fn total_spent(&self) -> Money {
        self.expense_total + self.common_fund
    }

    pub fn excluded(&self) -> &[ExcludedRecord] {
        &self.excluded
    }

    pub fn excluded_ids(&self) -> BTreeSet<RecordId> {
        self.excluded.iter().map(|e| e.record).collect()
    }

    pub fn total_paid(&self) -> Money {
        self.tallies.values().map(|t| t.paid).sum()
    }

    pub fn total_owed(&self) -> Money {
        self.tallies.values().map(|t| t.owed).sum()
    }
}

/// Folds expenses and realized bills into per-member paid/owed tallies.
///
/// Aggregation is a pure function of the roster and records: re-running it
/// on the same input yields the same output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerAggregator {
    remainder_policy: RemainderPolicy,
    record_policy: RecordPolicy,
}

type Shares = Vec<(MemberId, Money)>;

impl LedgerAggregator {
    pub fn new(remainder_policy: RemainderPolicy, record_policy: RecordPolicy) -> Self {
        Self {
            remainder_policy,
            record_policy,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.remainder_policy, config.record_policy)
    }

    /// Aggregate `records` over the members of `roster`.
    ///
    /// # Algorithm
    ///
    /// 1. Every roster member starts at `paid = owed = 0`.
    /// 2. Each expense credits its payer and splits its amount over the
    ///    participants (or the whole roster when none are given).
    /// 3. Each paid bill splits over the whole roster and is credited to
    ///    the common fund, never to a member. Pending bills are validated
    ///    only.
    /// 4. Incomes are validated and totalled; they do not touch tallies.
    ///
    /// Every posting is computed with checked arithmetic before anything is
    /// committed, so a bad record never leaves a partial footprint and an
    /// amount that would overflow a total fails as
    /// [`InvalidReason::AmountOverflow`].
    pub fn aggregate(&self, roster: &Roster, records: &RecordSet) -> Result<Aggregation> {
        let mut totals = Totals::new(roster);
        let mut failures: Vec<ExcludedRecord> = Vec::new();
        let mut fail = |record: RecordId, error: LedgerError| {
            failures.push(ExcludedRecord { record, error })
        };

        for expense in &records.expenses {
            let posted = self
                .expense_shares(roster, expense)
                .and_then(|shares| totals.post_expense(expense, shares));
            if let Err(e) = posted {
                fail(expense.id(), e);
            }
        }

        for bill in &records.bills {
            let posted = if bill.is_paid() {
                bill_shares(roster, bill).and_then(|shares| totals.post_bill(bill, shares))
            } else {
                check_positive(bill).and_then(|()| totals.track_pending(bill))
            };
            if let Err(e) = posted {
                fail(bill.id(), e);
            }
        }

        for income in &records.incomes {
            if let Err(e) = check_positive(income).and_then(|()| totals.post_income(income)) {
                fail(income.id(), e);
            }
        }

        if !failures.is_empty() {
            match self.record_policy {
                RecordPolicy::Reject => {
                    return Err(LedgerError::Rejected(
                        failures.into_iter().map(|f| f.error).collect(),
                    ))
                }
                RecordPolicy::Exclude => {
                    for failure in &failures {
                        warn!("excluding record from aggregation: {failure}");
                    }
                }
            }
        }

        debug!(
            "aggregated {} expenses and {} paid bills across {} members ({} excluded)",
            records.expenses.len(),
            records.paid_bills().count(),
            roster.len(),
            failures.len()
        );

        Ok(Aggregation {
            tallies: totals.tallies,
            expense_total: totals.expense_total,
            common_fund: totals.common_fund,
            income_total: totals.income_total,
            excluded: failures,
        })
    }

    fn expense_shares(&self, roster: &Roster, expense: &Expense) -> Result<Shares> {
        check_positive(expense)?;
        if !roster.contains(expense.paid_by()) {
            return Err(LedgerError::UnknownParticipant {
                record: expense.id(),
                member: expense.paid_by().clone(),
            });
        }

        let group: Vec<&MemberId> = match expense.participants() {
            Some(explicit) if explicit.is_empty() => {
                return Err(LedgerError::InvalidRecord {
                    record: expense.id(),
                    reason: InvalidReason::EmptyParticipants,
                });
            }
            Some(explicit) => {
                if let Some(unknown) = explicit.iter().find(|id| !roster.contains(id)) {
                    return Err(LedgerError::UnknownParticipant {
                        record: expense.id(),
                        member: unknown.clone(),
                    });
                }
                explicit.iter().collect()
            }
            None => roster.ids().collect(),
        };

        let ordered = match self.remainder_policy {
            RemainderPolicy::Payer => payer_first(group, expense.paid_by()),
            RemainderPolicy::MemberOrder => group,
        };
        split(expense.amount(), ordered)
    }
}

/// Running totals of one aggregation.
///
/// `expense_total + common_fund` is kept within `i64`; every member's
/// `paid` and `owed` is bounded by it, and so is every partial sum of nets.
struct Totals {
    tallies: BTreeMap<MemberId, MemberTally>,
    expense_total: Money,
    common_fund: Money,
    income_total: Money,
    pending_total: Money,
}

impl Totals {
    fn new(roster: &Roster) -> Self {
        Self {
            tallies: roster
                .ids()
                .map(|id| (id.clone(), MemberTally::default()))
                .collect(),
            expense_total: Money::ZERO,
            common_fund: Money::ZERO,
            income_total: Money::ZERO,
            pending_total: Money::ZERO,
        }
    }

    fn post_expense(&mut self, expense: &Expense, shares: Shares) -> Result<()> {
        let expense_total = add(self.expense_total, expense.amount(), expense)?;
        add(expense_total, self.common_fund, expense)?;
        let payer = expense.paid_by();
        let paid = add(self.tally(payer).paid, expense.amount(), expense)?;
        let owed = self.staged_owed(shares, expense)?;

        self.expense_total = expense_total;
        self.tallies.entry(payer.clone()).or_default().paid = paid;
        self.commit_owed(owed);
        Ok(())
    }

    fn post_bill(&mut self, bill: &UtilityBill, shares: Shares) -> Result<()> {
        let common_fund = add(self.common_fund, bill.amount(), bill)?;
        add(self.expense_total, common_fund, bill)?;
        let owed = self.staged_owed(shares, bill)?;

        self.common_fund = common_fund;
        self.commit_owed(owed);
        Ok(())
    }

    fn track_pending(&mut self, bill: &UtilityBill) -> Result<()> {
        self.pending_total = add(self.pending_total, bill.amount(), bill)?;
        Ok(())
    }

    fn post_income<R: MonetaryRecord>(&mut self, income: &R) -> Result<()> {
        self.income_total = add(self.income_total, income.amount(), income)?;
        Ok(())
    }

    fn tally(&self, member: &MemberId) -> MemberTally {
        self.tallies.get(member).copied().unwrap_or_default()
    }

    fn staged_owed<R: MonetaryRecord>(&self, shares: Shares, record: &R) -> Result<Shares> {
        shares
            .into_iter()
            .map(|(member, share)| {
                let owed = add(self.tally(&member).owed, share, record)?;
                Ok((member, owed))
            })
            .collect()
    }

    fn commit_owed(&mut self, owed: Shares) {
        for (member, total) in owed {
            self.tallies.entry(member).or_default().owed = total;
        }
    }
}

fn add<R: MonetaryRecord>(total: Money, amount: Money, record: &R) -> Result<Money> {
    total
        .checked_add(amount)
        .ok_or_else(|| LedgerError::InvalidRecord {
            record: record.id(),
            reason: InvalidReason::AmountOverflow,
        })
}

fn bill_shares(roster: &Roster, bill: &UtilityBill) -> Result<Shares> {
    check_positive(bill)?;
    split(bill.amount(), roster.ids().collect())
}

fn check_positive<R: MonetaryRecord>(record: &R) -> Result<()> {
    if record.amount().is_positive() {
        Ok(())
    } else {
        Err(LedgerError::InvalidRecord {
            record: record.id(),
            reason: InvalidReason::NonPositiveAmount,
        })
    }
}

fn payer_first<'a>(mut group: Vec<&'a MemberId>, payer: &MemberId) -> Vec<&'a MemberId> {
    if let Some(pos) = group.iter().position(|id| *id == payer) {
        let payer = group.remove(pos);
        group.insert(0, payer);
    }
    group
}

fn split(amount: Money, group: Vec<&MemberId>) -> Result<Shares> {
    let shares = amount.allocate(group.len())?;
    Ok(group.into_iter().cloned().zip(shares).collect())
}
