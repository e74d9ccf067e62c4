use crate::core::member::MemberId;
use crate::core::money::Money;
use crate::core::period::PeriodKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

pub type RecordId = Uuid;

/// Category assigned to utility bills in summaries.
pub const UTILITIES_CATEGORY: &str = "utilities";

/// Shape shared by every money-carrying record the engine consumes.
pub trait MonetaryRecord {
    fn id(&self) -> RecordId;
    fn amount(&self) -> Money;
    fn timestamp(&self) -> DateTime<Utc>;
    fn scope(&self) -> &str;
}

fn new_record_id() -> RecordId {
    Uuid::new_v4()
}

fn default_category() -> String {
    "general".to_string()
}

/// A shared cost paid by one member and split among participants.
///
/// `participants == None` means "everyone in the roster at aggregation
/// time". An explicit empty set is invalid and is rejected by the
/// aggregator rather than read as "nobody".
///
/// # Examples
///
/// ```
/// use ledger_settlement::core::money::Money;
/// use ledger_settlement::core::record::Expense;
///
/// let dinner = Expense::new("a", Money::from_major(90))
///     .with_participants(["a", "b"])
///     .with_category("food");
/// assert_eq!(dinner.participants().map(|p| p.len()), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(default = "new_record_id")]
    id: RecordId,
    #[serde(default)]
    scope: String,
    amount: Money,
    paid_by: MemberId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    participants: Option<BTreeSet<MemberId>>,
    #[serde(default = "default_category")]
    category: String,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
}

impl Expense {
    pub fn new(paid_by: impl Into<MemberId>, amount: Money) -> Self {
        Self {
            id: new_record_id(),
            scope: String::new(),
            amount,
            paid_by: paid_by.into(),
            participants: None,
            category: default_category(),
            timestamp: Utc::now(),
        }
    }

    /// Fix the id (useful for testing / determinism).
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = id;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_participants<I, M>(mut self, participants: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MemberId>,
    {
        self.participants = Some(participants.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = at;
        self
    }

    pub fn paid_by(&self) -> &MemberId {
        &self.paid_by
    }

    pub fn participants(&self) -> Option<&BTreeSet<MemberId>> {
        self.participants.as_ref()
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

/// Money added to the scope's budget for its period. Never split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Income {
    #[serde(default = "new_record_id")]
    id: RecordId,
    #[serde(default)]
    scope: String,
    amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
}

impl Income {
    pub fn new(amount: Money) -> Self {
        Self {
            id: new_record_id(),
            scope: String::new(),
            amount,
            source: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = id;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = at;
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

/// A recurring group bill (rent, electricity, water).
///
/// Bills have no payer and no participant subset: a paid bill is split
/// evenly across every member. Unpaid bills are tracked but never count as
/// spend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilityBill {
    #[serde(default = "new_record_id")]
    id: RecordId,
    #[serde(default)]
    scope: String,
    amount: Money,
    #[serde(default)]
    name: String,
    #[serde(default)]
    paid: bool,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
}

impl UtilityBill {
    pub fn new(name: impl Into<String>, amount: Money) -> Self {
        Self {
            id: new_record_id(),
            scope: String::new(),
            amount,
            name: name.into(),
            paid: false,
            timestamp: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = id;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = at;
        self
    }

    pub fn mark_paid(mut self) -> Self {
        self.paid = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_paid(&self) -> bool {
        self.paid
    }
}

macro_rules! impl_monetary_record {
    ($($ty:ty),+) => {
        $(
            impl MonetaryRecord for $ty {
                fn id(&self) -> RecordId {
                    self.id
                }

                fn amount(&self) -> Money {
                    self.amount
                }

                fn timestamp(&self) -> DateTime<Utc> {
                    self.timestamp
                }

                fn scope(&self) -> &str {
                    &self.scope
                }
            }
        )+
    };
}

impl_monetary_record!(Expense, Income, UtilityBill);

/// The records of one scope, already fetched by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub incomes: Vec<Income>,
    #[serde(default)]
    pub bills: Vec<UtilityBill>,
}

fn keep<R, F>(records: &[R], pred: F) -> Vec<R>
where
    R: MonetaryRecord + Clone,
    F: Fn(&R) -> bool,
{
    records.iter().filter(|&r| pred(r)).cloned().collect()
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_expense(&mut self, expense: Expense) {
        self.expenses.push(expense);
    }

    pub fn add_income(&mut self, income: Income) {
        self.incomes.push(income);
    }

    pub fn add_bill(&mut self, bill: UtilityBill) {
        self.bills.push(bill);
    }

    pub fn len(&self) -> usize {
        self.expenses.len() + self.incomes.len() + self.bills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bills that count as realized spend.
    pub fn paid_bills(&self) -> impl Iterator<Item = &UtilityBill> {
        self.bills.iter().filter(|b| b.is_paid())
    }

    /// Bills still awaiting payment.
    pub fn pending_bills(&self) -> impl Iterator<Item = &UtilityBill> {
        self.bills.iter().filter(|b| !b.is_paid())
    }

    /// Records whose timestamp falls inside `period`.
    pub fn in_period(&self, period: &PeriodKey) -> RecordSet {
        RecordSet {
            expenses: keep(&self.expenses, |r| period.contains(r.timestamp())),
            incomes: keep(&self.incomes, |r| period.contains(r.timestamp())),
            bills: keep(&self.bills, |r| period.contains(r.timestamp())),
        }
    }

    /// Records owned by `scope`.
    pub fn in_scope(&self, scope: &str) -> RecordSet {
        RecordSet {
            expenses: keep(&self.expenses, |r| r.scope() == scope),
            incomes: keep(&self.incomes, |r| r.scope() == scope),
            bills: keep(&self.bills, |r| r.scope() == scope),
        }
    }

    /// Every record except those whose id is in `ids`.
    pub fn excluding(&self, ids: &BTreeSet<RecordId>) -> RecordSet {
        RecordSet {
            expenses: keep(&self.expenses, |r| !ids.contains(&r.id())),
            incomes: keep(&self.incomes, |r| !ids.contains(&r.id())),
            bills: keep(&self.bills, |r| !ids.contains(&r.id())),
        }
    }
}
