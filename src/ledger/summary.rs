use crate::core::money::Money;
use crate::core::record::{MonetaryRecord, RecordSet, UTILITIES_CATEGORY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Spend totals for one scope and period, the input to monthly summaries,
/// exports and the budget monitor.
///
/// Every record given is counted. Build it through
/// [`LedgerEngine::spend_summary`](crate::engine::LedgerEngine::spend_summary)
/// when records may be invalid; totals saturate rather than wrap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendSummary {
    pub expense_total: Money,
    /// Paid bills, counted as spend.
    pub realized_bills: Money,
    /// Unpaid bills, tracked only.
    pub pending_bills: Money,
    pub income_total: Money,
    pub by_category: BTreeMap<String, Money>,
    pub record_count: usize,
}

impl SpendSummary {
    pub fn from_records(records: &RecordSet) -> Self {
        let mut summary = SpendSummary {
            record_count: records.len(),
            ..Default::default()
        };

        for expense in &records.expenses {
            summary.expense_total = summary.expense_total.saturating_add(expense.amount());
            let category = summary
                .by_category
                .entry(expense.category().to_string())
                .or_default();
            *category = category.saturating_add(expense.amount());
        }

        for bill in &records.bills {
            if bill.is_paid() {
                summary.realized_bills = summary.realized_bills.saturating_add(bill.amount());
                let utilities = summary
                    .by_category
                    .entry(UTILITIES_CATEGORY.to_string())
                    .or_default();
                *utilities = utilities.saturating_add(bill.amount());
            } else {
                summary.pending_bills = summary.pending_bills.saturating_add(bill.amount());
            }
        }

        summary.income_total = records
            .incomes
            .iter()
            .fold(Money::ZERO, |total, i| total.saturating_add(i.amount()));
        summary
    }

    /// Realized spend: expenses plus paid bills.
    pub fn total_spent(&self) -> Money {
        self.expense_total.saturating_add(self.realized_bills)
    }
}

impl std::fmt::Display for SpendSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Spend Summary ===")?;
        writeln!(f, "Expenses:        {}", self.expense_total)?;
        writeln!(f, "Bills (paid):    {}", self.realized_bills)?;
        writeln!(f, "Bills (pending): {}", self.pending_bills)?;
        writeln!(f, "Total spent:     {}", self.total_spent())?;
        writeln!(f, "Income:          {}", self.income_total)?;

        writeln!(f, "\nBy Category:")?;
        for (category, amount) in &self.by_category {
            writeln!(f, "  {}: {}", category, amount)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::{Expense, Income, UtilityBill};

    #[test]
    fn test_summary_totals() {
        let mut records = RecordSet::new();
        records.add_expense(Expense::new("a", Money::from_major(120)).with_category("food"));
        records.add_expense(Expense::new("b", Money::from_major(80)).with_category("food"));
        records.add_expense(Expense::new("b", Money::from_major(40)).with_category("travel"));
        records.add_bill(UtilityBill::new("power", Money::from_major(300)).mark_paid());
        records.add_bill(UtilityBill::new("water", Money::from_major(50)));
        records.add_income(Income::new(Money::from_major(200)));

        let summary = SpendSummary::from_records(&records);
        assert_eq!(summary.expense_total, Money::from_major(240));
        assert_eq!(summary.realized_bills, Money::from_major(300));
        assert_eq!(summary.pending_bills, Money::from_major(50));
        assert_eq!(summary.total_spent(), Money::from_major(540));
        assert_eq!(summary.income_total, Money::from_major(200));
        assert_eq!(summary.by_category["food"], Money::from_major(200));
        assert_eq!(summary.by_category[UTILITIES_CATEGORY], Money::from_major(300));
        assert_eq!(summary.record_count, 6);
    }

    #[test]
    fn test_empty_summary() {
        let summary = SpendSummary::from_records(&RecordSet::new());
        assert_eq!(summary.total_spent(), Money::ZERO);
        assert!(summary.by_category.is_empty());
    }
}
