use chrono::{TimeZone, Utc};
use ledger_settlement::budget::monitor::{BudgetLevel, BudgetLimit, BudgetMonitor};
use ledger_settlement::core::config::{EngineConfig, RecordPolicy};
use ledger_settlement::core::member::{Member, MemberId, Roster};
use ledger_settlement::core::money::{Money, RemainderPolicy};
use ledger_settlement::core::period::PeriodKey;
use ledger_settlement::core::record::{Expense, Income, MonetaryRecord, RecordSet, UtilityBill};
use ledger_settlement::engine::{LedgerEngine, LedgerReport};
use ledger_settlement::error::{InvalidReason, LedgerError};
use ledger_settlement::ledger::balance::BalanceStatus;
use ledger_settlement::ledger::summary::SpendSummary;
use rust_decimal_macros::dec;

fn abc() -> Roster {
    Roster::new(vec![
        Member::new("A", "Asha").with_room("B-12"),
        Member::new("B", "Bala").with_room("B-12"),
        Member::new("C", "Chitra").with_room("B-14"),
    ])
}

fn money(amount: rust_decimal::Decimal) -> Money {
    Money::try_from(amount).unwrap()
}

/// One expense of 300.00 paid by A and split among everyone.
#[test]
fn equal_split_settles_to_payer() {
    let mut records = RecordSet::new();
    records.add_expense(Expense::new("A", money(dec!(300))));

    let engine = LedgerEngine::default();
    let aggregation = engine.aggregate(&abc(), &records).unwrap();
    assert_eq!(aggregation.tally(&"A".into()).paid, money(dec!(300)));
    for id in ["A", "B", "C"] {
        assert_eq!(aggregation.tally(&id.into()).owed, money(dec!(100)));
    }

    let report = engine.compute(&abc(), &records).unwrap();
    let a = report.balances.balance_of(&"A".into()).unwrap();
    assert_eq!(a.net, money(dec!(200)));
    assert_eq!(a.status, BalanceStatus::Creditor);
    for id in ["B", "C"] {
        let b = report.balances.balance_of(&id.into()).unwrap();
        assert_eq!(b.net, money(dec!(-100)));
        assert_eq!(b.status, BalanceStatus::Debtor);
    }

    let transfers: Vec<(&str, &str, Money)> = report
        .settlement
        .transactions
        .iter()
        .map(|t| (t.from.as_str(), t.to.as_str(), t.amount))
        .collect();
    assert_eq!(
        transfers,
        vec![("B", "A", money(dec!(100))), ("C", "A", money(dec!(100)))]
    );
    assert!(report.is_valid());
}

/// 100.00 split three ways: the odd paisa lands on the payer.
#[test]
fn three_way_split_has_no_rounding_loss() {
    let mut records = RecordSet::new();
    records.add_expense(
        Expense::new("A", money(dec!(100))).with_participants(["A", "B", "C"]),
    );

    let aggregation = LedgerEngine::default().aggregate(&abc(), &records).unwrap();
    assert_eq!(aggregation.tally(&"A".into()).owed, money(dec!(33.34)));
    assert_eq!(aggregation.tally(&"B".into()).owed, money(dec!(33.33)));
    assert_eq!(aggregation.tally(&"C".into()).owed, money(dec!(33.33)));
    assert_eq!(aggregation.total_owed(), money(dec!(100)));
}

#[test]
fn member_order_policy_gives_remainder_to_lowest_id() {
    let config = EngineConfig {
        remainder_policy: RemainderPolicy::MemberOrder,
        ..EngineConfig::default()
    };
    let mut records = RecordSet::new();
    records.add_expense(
        Expense::new("C", money(dec!(100))).with_participants(["A", "B", "C"]),
    );

    let aggregation = LedgerEngine::new(config)
        .unwrap()
        .aggregate(&abc(), &records)
        .unwrap();
    assert_eq!(aggregation.tally(&"A".into()).owed, money(dec!(33.34)));
    assert_eq!(aggregation.tally(&"C".into()).owed, money(dec!(33.33)));
}

#[test]
fn balanced_group_needs_no_transfers() {
    let roster = Roster::new(vec![Member::new("A", "Asha"), Member::new("B", "Bala")]);
    let mut records = RecordSet::new();
    records.add_expense(Expense::new("A", money(dec!(50))));
    records.add_expense(Expense::new("B", money(dec!(50))));

    let report = LedgerEngine::default().compute(&roster, &records).unwrap();
    assert!(report.balances.is_settled());
    assert!(report.settlement.is_empty());
    assert_eq!(report.settlement.total_transferred(), Money::ZERO);
}

#[test]
fn budget_latches_survive_a_dip() {
    let monitor = BudgetMonitor::default();
    let june = PeriodKey::new(2025, 6).unwrap();
    let limit = BudgetLimit::new(money(dec!(1000)));

    let fired: Vec<Option<u32>> = [dec!(760), dec!(700), dec!(910)]
        .into_iter()
        .map(|spent| {
            monitor
                .evaluate(june, money(spent), limit)
                .alert
                .map(|a| a.threshold)
        })
        .collect();

    assert_eq!(fired, vec![Some(75), None, Some(90)]);
    assert_eq!(monitor.level(&june), BudgetLevel::Critical(90));
}

#[test]
fn unknown_participant_rejects_whole_batch() {
    let mut records = RecordSet::new();
    records.add_expense(Expense::new("A", money(dec!(300))));
    records.add_expense(
        Expense::new("A", money(dec!(60))).with_participants(["A", "Z"]),
    );

    let err = LedgerEngine::default().compute(&abc(), &records).unwrap_err();
    let failures = err.failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0],
        LedgerError::UnknownParticipant { member, .. } if member == &MemberId::new("Z")
    ));
}

#[test]
fn unknown_participant_excluded_when_configured() {
    let config = EngineConfig {
        record_policy: RecordPolicy::Exclude,
        ..EngineConfig::default()
    };
    let mut records = RecordSet::new();
    records.add_expense(Expense::new("A", money(dec!(300))));
    let bad = Expense::new("A", money(dec!(60))).with_participants(["A", "Z"]);
    let bad_id = bad.id();
    records.add_expense(bad);

    let report = LedgerEngine::new(config)
        .unwrap()
        .compute(&abc(), &records)
        .unwrap();
    assert_eq!(report.aggregation.excluded().len(), 1);
    assert_eq!(report.aggregation.excluded()[0].record, bad_id);
    assert_eq!(report.aggregation.expense_total(), money(dec!(300)));
    assert!(report.is_valid());
}

#[test]
fn invalid_amount_and_empty_participants_are_rejected() {
    let mut records = RecordSet::new();
    records.add_expense(Expense::new("A", Money::ZERO));
    records.add_expense(
        Expense::new("B", money(dec!(10))).with_participants(Vec::<&str>::new()),
    );

    let err = LedgerEngine::default().compute(&abc(), &records).unwrap_err();
    let failures = err.failures();
    assert_eq!(failures.len(), 2);
    assert!(failures
        .iter()
        .all(|f| matches!(f, LedgerError::InvalidRecord { .. })));
}

#[test]
fn paid_bills_are_collected_into_the_common_fund() {
    let mut records = RecordSet::new();
    records.add_expense(Expense::new("A", money(dec!(300))));
    records.add_bill(UtilityBill::new("electricity", money(dec!(90))).mark_paid());
    records.add_bill(UtilityBill::new("water", money(dec!(45))));

    let report = LedgerEngine::default().compute(&abc(), &records).unwrap();
    assert_eq!(report.balances.common_fund(), money(dec!(90)));
    assert!(report.balances.is_conserved());
    assert!(report.is_valid());

    let contributed: Money = report
        .settlement
        .fund_contributions
        .iter()
        .map(|c| c.amount)
        .sum();
    assert_eq!(contributed, money(dec!(90)));
}

#[test]
fn report_round_trips_through_json() {
    let mut records = RecordSet::new();
    records.add_expense(Expense::new("B", money(dec!(123.45))).with_category("food"));
    records.add_income(Income::new(money(dec!(500))));

    let report = LedgerEngine::default().compute(&abc(), &records).unwrap();
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"123.45\""));

    let restored: LedgerReport = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, report);
}

#[test]
fn record_set_parses_from_host_json() {
    let json = r#"{
        "expenses": [
            { "amount": "300.00", "paid_by": "A" },
            { "amount": "45.10", "paid_by": "B", "participants": ["B", "C"], "category": "food" }
        ],
        "bills": [ { "name": "internet", "amount": "60.00", "paid": true } ]
    }"#;
    let records: RecordSet = serde_json::from_str(json).unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.incomes.is_empty());

    let report = LedgerEngine::default().compute(&abc(), &records).unwrap();
    assert!(report.is_valid());
}

#[test]
fn monthly_budget_flow() {
    let june = PeriodKey::new(2025, 6).unwrap();
    let in_june = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
    let in_july = Utc.with_ymd_and_hms(2025, 7, 2, 9, 0, 0).unwrap();

    let mut records = RecordSet::new();
    records.add_expense(Expense::new("A", money(dec!(600))).with_timestamp(in_june));
    records.add_expense(Expense::new("B", money(dec!(400))).with_timestamp(in_july));
    records.add_bill(
        UtilityBill::new("electricity", money(dec!(200)))
            .mark_paid()
            .with_timestamp(in_june),
    );
    records.add_income(Income::new(money(dec!(200))).with_timestamp(in_june));

    let june_records = records.in_period(&june);
    let summary = SpendSummary::from_records(&june_records);
    assert_eq!(summary.total_spent(), money(dec!(800)));

    let limit = BudgetLimit::for_period(money(dec!(800)), &records.incomes, &june);
    assert_eq!(limit.effective(), money(dec!(1000)));

    let monitor = LedgerEngine::default().budget_monitor();
    let evaluation = monitor.evaluate(june, summary.total_spent(), limit);
    assert_eq!(evaluation.alert.map(|a| a.threshold), Some(75));
    assert_eq!(evaluation.level, BudgetLevel::Warned(75));
}

#[test]
fn amounts_that_overflow_the_ledger_are_rejected() {
    let huge: Money = "50000000000000000.00".parse().unwrap();
    let mut records = RecordSet::new();
    records.add_expense(Expense::new("A", huge));
    let second = Expense::new("A", huge);
    let second_id = second.id();
    records.add_expense(second);

    let err = LedgerEngine::default().compute(&abc(), &records).unwrap_err();
    assert_eq!(
        err.failures(),
        vec![&LedgerError::InvalidRecord {
            record: second_id,
            reason: InvalidReason::AmountOverflow,
        }]
    );

    let excluding = LedgerEngine::new(EngineConfig {
        record_policy: RecordPolicy::Exclude,
        ..EngineConfig::default()
    })
    .unwrap();
    let report = excluding.compute(&abc(), &records).unwrap();
    assert_eq!(report.aggregation.expense_total(), huge);
    assert!(report.is_valid());
}

#[test]
fn excluded_records_round_trip_through_json() {
    let config = EngineConfig {
        record_policy: RecordPolicy::Exclude,
        ..EngineConfig::default()
    };
    let mut records = RecordSet::new();
    records.add_expense(Expense::new("A", money(dec!(90))));
    records.add_expense(Expense::new("Z", money(dec!(30))));

    let report = LedgerEngine::new(config)
        .unwrap()
        .compute(&abc(), &records)
        .unwrap();
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"excluded\""));

    let restored: LedgerReport = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.aggregation.excluded(), report.aggregation.excluded());
    assert_eq!(restored, report);
}

#[test]
fn budget_spend_counts_accepted_records_only() {
    let config = EngineConfig {
        record_policy: RecordPolicy::Exclude,
        ..EngineConfig::default()
    };
    let engine = LedgerEngine::new(config).unwrap();
    let mut records = RecordSet::new();
    records.add_expense(Expense::new("A", money(dec!(800))));
    records.add_expense(Expense::new("A", money(dec!(-500))));
    records.add_expense(Expense::new("Z", money(dec!(300))));
    records.add_income(Income::new(money(dec!(-100))));

    let aggregation = engine.aggregate(&abc(), &records).unwrap();
    let accepted = engine.accepted_records(&abc(), &records).unwrap();
    let summary = SpendSummary::from_records(&accepted);
    assert_eq!(aggregation.excluded().len(), 3);
    assert_eq!(summary.total_spent(), aggregation.total_spent());
    assert_eq!(summary.total_spent(), money(dec!(800)));

    let june = PeriodKey::current();
    let limit = BudgetLimit::for_period(money(dec!(1000)), &accepted.incomes, &june);
    assert_eq!(limit.effective(), money(dec!(1000)));

    let evaluation = engine
        .budget_monitor()
        .evaluate(june, summary.total_spent(), limit);
    assert_eq!(evaluation.alert.map(|a| a.threshold), Some(75));
}
