//! One month in a shared hostel room.
//!
//! Four roommates log expenses and bills, the engine works out who owes
//! whom, and the budget monitor fires its alerts as spend builds up.

use chrono::{TimeZone, Utc};
use ledger_settlement::prelude::*;
use rust_decimal_macros::dec;

fn money(amount: rust_decimal::Decimal) -> Money {
    Money::try_from(amount).unwrap_or(Money::ZERO)
}

fn main() {
    println!("╔═══════════════════════════════════════════╗");
    println!("║  ledger-settlement: A Month in Room B-12  ║");
    println!("╚═══════════════════════════════════════════╝\n");

    let roster = Roster::new(vec![
        Member::new("asha", "Asha").with_room("B-12"),
        Member::new("bala", "Bala").with_room("B-12"),
        Member::new("chitra", "Chitra").with_room("B-12"),
        Member::new("dev", "Dev").with_room("B-12"),
    ]);
    let june = PeriodKey::new(2025, 6).unwrap_or_else(PeriodKey::current);
    let day = |d: u32| Utc.with_ymd_and_hms(2025, 6, d, 19, 0, 0).single().unwrap_or_else(Utc::now);

    let mut records = RecordSet::new();
    records.add_expense(
        Expense::new("asha", money(dec!(1200.00)))
            .with_category("groceries")
            .with_timestamp(day(2)),
    );
    records.add_expense(
        Expense::new("bala", money(dec!(450.50)))
            .with_participants(["bala", "chitra", "dev"])
            .with_category("food")
            .with_timestamp(day(9)),
    );
    records.add_expense(
        Expense::new("dev", money(dec!(100.00)))
            .with_participants(["asha", "bala", "chitra"])
            .with_category("outing")
            .with_timestamp(day(14)),
    );
    records.add_bill(
        UtilityBill::new("electricity", money(dec!(860.00)))
            .mark_paid()
            .with_timestamp(day(20)),
    );
    records.add_bill(UtilityBill::new("internet", money(dec!(499.00))).with_timestamp(day(28)));
    records.add_income(
        Income::new(money(dec!(500.00)))
            .with_source("deposit refund")
            .with_timestamp(day(15)),
    );

    // --- Balances and settlement ---
    println!("━━━ Balances ━━━\n");

    let engine = LedgerEngine::default();
    let report = match engine.compute(&roster, &records) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("cannot settle: {}", e);
            return;
        }
    };

    for balance in report.balances.balances() {
        println!(
            "  {:<8} paid {:>10}  owes {:>10}  net {:>10}  [{}]",
            roster.name_of(&balance.member),
            balance.paid,
            balance.owed,
            balance.net,
            balance.status
        );
    }
    println!("  {:<8} {:>10}\n", "fund", report.balances.common_fund());

    println!("━━━ Who Pays Whom ━━━\n");
    println!("{}\n", report.settlement.describe(&roster));
    println!("Settles everyone: {}\n", report.is_valid());

    // --- Budget alerts as the month fills up ---
    println!("━━━ Budget ━━━\n");

    let summary = match engine.spend_summary(&roster, &records.in_period(&june)) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("cannot summarize: {}", e);
            return;
        }
    };
    println!("{}", summary);

    let monitor = engine.budget_monitor();
    let limit = BudgetLimit::for_period(money(dec!(2500)), &records.incomes, &june);
    for spent in [dec!(1650.50), dec!(2300.00), dec!(2100.00), summary.total_spent().to_decimal()] {
        let evaluation = monitor.evaluate(june, money(spent), limit);
        let pct = evaluation.percentage_used.unwrap_or_default();
        match evaluation.alert {
            Some(alert) => println!(
                "  spent {:>9} of {} ({:>5.1}%)  ALERT {}%",
                evaluation.spent, evaluation.limit, pct, alert.threshold
            ),
            None => println!(
                "  spent {:>9} of {} ({:>5.1}%)  [{}]",
                evaluation.spent, evaluation.limit, pct, evaluation.level
            ),
        }
    }
}
