//! ledger-settlement CLI
//!
//! Compute balances, settlements and budget alerts from a JSON group file.
//!
//! # Usage
//!
//! ```bash
//! # Balances and who-pays-whom
//! ledger-settlement settle --input group.json
//!
//! # Output as JSON
//! ledger-settlement settle --input group.json --format json
//!
//! # Check June's spend against a 1000.00 budget, keeping latches between runs
//! ledger-settlement budget --input group.json --limit 1000 --period 2025-06 --state latches.json
//!
//! # Generate a random group for testing
//! ledger-settlement generate --members 8 --expenses 50
//! ```

use ledger_settlement::budget::monitor::{BudgetLimit, BudgetState};
use ledger_settlement::core::config::EngineConfig;
use ledger_settlement::core::member::{Member, Roster};
use ledger_settlement::core::money::Money;
use ledger_settlement::core::period::PeriodKey;
use ledger_settlement::core::record::RecordSet;
use ledger_settlement::engine::LedgerEngine;
use ledger_settlement::error::LedgerError;
use ledger_settlement::ledger::aggregator::ExcludedRecord;
use ledger_settlement::ledger::balance::Balance;
use ledger_settlement::ledger::summary::SpendSummary;
use ledger_settlement::settlement::solver::SettlementPlan;
use ledger_settlement::simulation::group_generator::{generate_group, GroupConfig};
use std::fs;
use std::path::Path;
use std::process;

fn print_usage() {
    eprintln!(
        r#"ledger-settlement — shared-expense balances, settlements and budget alerts

USAGE:
    ledger-settlement <COMMAND> [OPTIONS]

COMMANDS:
    settle      Compute net balances and settlement transfers
    budget      Evaluate spend against a budget and report threshold alerts
    generate    Generate a random group file (for testing)
    help        Show this message

OPTIONS (settle, budget):
    --input <FILE>      Path to JSON group file
    --config <FILE>     Path to JSON engine configuration
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (budget):
    --limit <AMOUNT>    Base budget for the period, e.g. 1000.00
    --period <YYYY-MM>  Period to evaluate (default: current month)
    --state <FILE>      Load and save alert latches across runs

OPTIONS (generate):
    --members <N>       Number of members (default: 6)
    --expenses <N>      Number of expenses (default: 40)
    --bills <N>         Number of utility bills (default: 3)
    --seed <N>          Seed for reproducible output
    --output <FILE>     Write to file instead of stdout

Set RUST_LOG=debug for engine diagnostics."#
    );
}

/// JSON schema for an input group.
#[derive(serde::Serialize, serde::Deserialize)]
struct GroupFile {
    members: Vec<Member>,
    #[serde(flatten)]
    records: RecordSet,
}

/// JSON output schema for `settle`.
#[derive(serde::Serialize)]
struct SettleOutput<'a> {
    balances: &'a [Balance],
    common_fund: Money,
    conserved: bool,
    settlement: &'a SettlementPlan,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    excluded: &'a [ExcludedRecord],
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn take_value(args: &[String], i: &mut usize, flag: &str) -> String {
    *i += 1;
    args.get(*i)
        .cloned()
        .unwrap_or_else(|| fail(format!("{} requires a value", flag)))
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> T {
    value
        .parse()
        .unwrap_or_else(|_| fail(format!("{} requires a number, got '{}'", flag, value)))
}

fn load_group(path: &str) -> (Roster, RecordSet) {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("cannot read '{}': {}", path, e)));

    let file: GroupFile = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "members": [ {{ "id": "asha", "name": "Asha", "room": "B-12" }} ],
  "expenses": [ {{ "amount": "300.00", "paid_by": "asha", "participants": ["asha"] }} ],
  "incomes": [ {{ "amount": "500.00" }} ],
  "bills": [ {{ "name": "electricity", "amount": "90.00", "paid": true }} ]
}}"#
        );
        process::exit(1);
    });

    (Roster::new(file.members), file.records)
}

fn load_engine(config_path: Option<&str>) -> LedgerEngine {
    let config = match config_path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .unwrap_or_else(|e| fail(format!("cannot read '{}': {}", path, e)));
            EngineConfig::from_json_str(&content).unwrap_or_else(|e| fail(e))
        }
        None => EngineConfig::default(),
    };
    LedgerEngine::new(config).unwrap_or_else(|e| fail(e))
}

fn rejected(err: LedgerError) -> ! {
    for failure in err.failures() {
        eprintln!("  {}", failure);
    }
    fail("aggregation rejected")
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| fail(e))
}

fn cmd_settle(args: &[String]) {
    let mut input_path = None;
    let mut config_path = None;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => input_path = Some(take_value(args, &mut i, "--input")),
            "--config" => config_path = Some(take_value(args, &mut i, "--config")),
            "--format" => format = take_value(args, &mut i, "--format"),
            other => fail(format!("unknown option: {}", other)),
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| fail("--input <FILE> is required"));
    let (roster, records) = load_group(&path);
    let engine = load_engine(config_path.as_deref());
    let report = engine
        .compute(&roster, &records)
        .unwrap_or_else(|e| rejected(e));

    let excluded = report.aggregation.excluded();

    if format == "json" {
        let output = SettleOutput {
            balances: report.balances.balances(),
            common_fund: report.balances.common_fund(),
            conserved: report.balances.is_conserved(),
            settlement: &report.settlement,
            excluded,
        };
        println!("{}", to_json(&output));
    } else {
        println!("{}", report);
        if !report.settlement.is_empty() {
            println!("\n{}", report.settlement.describe(&roster));
        }
        for e in excluded {
            println!("Excluded: {}", e);
        }
    }
}

fn cmd_budget(args: &[String]) {
    let mut input_path = None;
    let mut config_path = None;
    let mut state_path = None;
    let mut limit = None;
    let mut period = PeriodKey::current();
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => input_path = Some(take_value(args, &mut i, "--input")),
            "--config" => config_path = Some(take_value(args, &mut i, "--config")),
            "--state" => state_path = Some(take_value(args, &mut i, "--state")),
            "--format" => format = take_value(args, &mut i, "--format"),
            "--limit" => {
                let raw = take_value(args, &mut i, "--limit");
                limit = Some(
                    raw.parse::<Money>()
                        .unwrap_or_else(|e| fail(format!("--limit: {}", e))),
                );
            }
            "--period" => {
                let raw = take_value(args, &mut i, "--period");
                period = raw.parse().unwrap_or_else(|e: String| fail(e));
            }
            other => fail(format!("unknown option: {}", other)),
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| fail("--input <FILE> is required"));
    let base = limit.unwrap_or_else(|| fail("--limit <AMOUNT> is required"));
    let (roster, records) = load_group(&path);
    let engine = load_engine(config_path.as_deref());
    let monitor = engine.budget_monitor();

    if let Some(state_file) = state_path.as_deref().filter(|p| Path::new(p).exists()) {
        let content = fs::read_to_string(state_file)
            .unwrap_or_else(|e| fail(format!("cannot read '{}': {}", state_file, e)));
        let states: Vec<BudgetState> = serde_json::from_str(&content)
            .unwrap_or_else(|e| fail(format!("invalid state file '{}': {}", state_file, e)));
        monitor.restore(states);
    }

    let accepted = engine
        .accepted_records(&roster, &records.in_period(&period))
        .unwrap_or_else(|e| rejected(e));
    let summary = SpendSummary::from_records(&accepted);
    let budget = BudgetLimit::for_period(base, &accepted.incomes, &period);
    let evaluation = monitor.evaluate(period, summary.total_spent(), budget);

    if let Some(state_file) = state_path.as_deref() {
        fs::write(state_file, to_json(&monitor.snapshot()))
            .unwrap_or_else(|e| fail(format!("cannot write '{}': {}", state_file, e)));
    }

    if format == "json" {
        println!("{}", to_json(&evaluation));
        return;
    }

    println!("Period: {}\n", period);
    println!("{}", summary);
    println!("=== Budget ===");
    println!("Limit:           {}", evaluation.limit);
    println!("Spent:           {}", evaluation.spent);
    match evaluation.percentage_used {
        Some(pct) => println!("Used:            {:.1}%", pct),
        None => println!("Used:            n/a (no budget set)"),
    }
    println!("Level:           {}", evaluation.level);
    if let Some(alert) = &evaluation.alert {
        println!(
            "\nALERT: {}% of the budget used ({} of {})",
            alert.threshold, alert.spent, alert.limit
        );
    }
}

fn cmd_generate(args: &[String]) {
    let mut config = GroupConfig::default();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--members" => {
                config.member_count =
                    parse_number(&take_value(args, &mut i, "--members"), "--members")
            }
            "--expenses" => {
                config.expense_count =
                    parse_number(&take_value(args, &mut i, "--expenses"), "--expenses")
            }
            "--bills" => {
                config.bill_count = parse_number(&take_value(args, &mut i, "--bills"), "--bills")
            }
            "--seed" => {
                config.seed = Some(parse_number(&take_value(args, &mut i, "--seed"), "--seed"))
            }
            "--output" => output_path = Some(take_value(args, &mut i, "--output")),
            other => fail(format!("unknown option: {}", other)),
        }
        i += 1;
    }

    let (roster, records) = generate_group(&config);
    let file = GroupFile {
        members: roster.members().cloned().collect(),
        records,
    };
    let json = to_json(&file);

    if let Some(path) = output_path {
        fs::write(&path, &json)
            .unwrap_or_else(|e| fail(format!("cannot write '{}': {}", path, e)));
        eprintln!(
            "Generated {} records across {} members → {}",
            file.records.len(),
            file.members.len(),
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "settle" => cmd_settle(rest),
        "budget" => cmd_budget(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
