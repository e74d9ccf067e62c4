use crate::core::config::{AlertThresholds, EngineConfig};
use crate::core::money::Money;
use crate::core::period::PeriodKey;
use crate::core::record::{Income, MonetaryRecord};
use log::info;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// The budget a period's spend is measured against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetLimit {
    /// Limit configured by the scope owner.
    pub base: Money,
    /// Income received during the period.
    pub income_top_up: Money,
}

impl BudgetLimit {
    pub fn new(base: Money) -> Self {
        Self {
            base,
            income_top_up: Money::ZERO,
        }
    }

    pub fn with_top_up(mut self, top_up: Money) -> Self {
        self.income_top_up = top_up;
        self
    }

    /// Base limit plus every income that falls inside `period`.
    pub fn for_period(base: Money, incomes: &[Income], period: &PeriodKey) -> Self {
        let top_up = incomes
            .iter()
            .filter(|i| period.contains(i.timestamp()))
            .fold(Money::ZERO, |total, i| total.saturating_add(i.amount()));
        Self::new(base).with_top_up(top_up)
    }

    /// Base plus top-up, clamped at [`Money::MAX`].
    pub fn effective(&self) -> Money {
        self.base.saturating_add(self.income_top_up)
    }
}

/// Where a period stands relative to its thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "threshold", rename_all = "snake_case")]
pub enum BudgetLevel {
    Clear,
    /// A threshold below the highest one has fired.
    Warned(u32),
    /// The highest configured threshold has fired.
    Critical(u32),
}

impl fmt::Display for BudgetLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetLevel::Clear => write!(f, "clear"),
            BudgetLevel::Warned(t) => write!(f, "warned ({t}%)"),
            BudgetLevel::Critical(t) => write!(f, "critical ({t}%)"),
        }
    }
}

/// Emitted once per threshold per period. The host decides how to surface it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAlertEvent {
    pub period: PeriodKey,
    pub threshold: u32,
    pub spent: Money,
    pub limit: Money,
    pub percentage_used: f64,
}

/// Latch state for one period. The host may persist it via
/// [`BudgetMonitor::snapshot`] and hand it back through
/// [`BudgetMonitor::restore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetState {
    pub period: PeriodKey,
    /// Base limit seen at the last evaluation.
    pub base_limit: Money,
    pub fired_thresholds: BTreeSet<u32>,
    /// Spend seen at the last evaluation.
    #[serde(default)]
    pub total_spent: Money,
    /// Base limit plus income top-up at the last evaluation.
    #[serde(default)]
    pub effective_limit: Money,
}

impl BudgetState {
    pub fn new(period: PeriodKey, base_limit: Money) -> Self {
        Self {
            period,
            base_limit,
            fired_thresholds: BTreeSet::new(),
            total_spent: Money::ZERO,
            effective_limit: base_limit,
        }
    }
}

/// Outcome of one [`BudgetMonitor::evaluate`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetEvaluation {
    pub period: PeriodKey,
    pub spent: Money,
    pub limit: Money,
    /// `None` when the effective limit is zero or negative: spend is shown
    /// but no threshold is evaluated.
    pub percentage_used: Option<f64>,
    pub level: BudgetLevel,
    pub alert: Option<BudgetAlertEvent>,
}

/// Watches spend against a budget and fires one-shot threshold alerts.
///
/// Thresholds are latches: once fired for a period they stay fired even if
/// spend later drops, until the period is reset or the owner raises the
/// base limit. Each period keeps independent latches.
///
/// All latch state sits behind one mutex and every evaluation does its
/// read-check-fire-write under that lock, so two concurrent evaluations can
/// never fire the same threshold.
///
/// # Examples
///
/// ```
/// use ledger_settlement::budget::monitor::{BudgetLimit, BudgetMonitor};
/// use ledger_settlement::core::money::Money;
/// use ledger_settlement::core::period::PeriodKey;
///
/// let monitor = BudgetMonitor::default();
/// let june = PeriodKey::new(2025, 6).unwrap();
/// let limit = BudgetLimit::new(Money::from_major(1000));
///
/// let first = monitor.evaluate(june, Money::from_major(760), limit);
/// assert_eq!(first.alert.map(|a| a.threshold), Some(75));
///
/// let again = monitor.evaluate(june, Money::from_major(770), limit);
/// assert!(again.alert.is_none());
/// ```
#[derive(Debug, Default)]
pub struct BudgetMonitor {
    thresholds: AlertThresholds,
    states: Mutex<HashMap<PeriodKey, BudgetState>>,
}

impl BudgetMonitor {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self {
            thresholds,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.alert_thresholds.clone())
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Evaluate `spent` against `limit` for `period`.
    ///
    /// When several thresholds are crossed at once, all of them latch but
    /// only the highest produces an event.
    pub fn evaluate(&self, period: PeriodKey, spent: Money, limit: BudgetLimit) -> BudgetEvaluation {
        let mut states = self.lock();
        let state = states
            .entry(period)
            .or_insert_with(|| BudgetState::new(period, limit.base));

        if limit.base > state.base_limit && !state.fired_thresholds.is_empty() {
            info!(
                "budget for {} raised from {} to {}, clearing alerts",
                period, state.base_limit, limit.base
            );
            state.fired_thresholds.clear();
        }
        state.base_limit = limit.base;

        let effective = limit.effective();
        let percentage_used = percentage(spent, effective);
        state.total_spent = spent;
        state.effective_limit = effective;

        let mut alert = None;
        if effective.is_positive() {
            let newly_crossed: Vec<u32> = self
                .thresholds
                .as_slice()
                .iter()
                .copied()
                .filter(|t| crossed(spent, effective, *t))
                .filter(|t| !state.fired_thresholds.contains(t))
                .collect();

            state.fired_thresholds.extend(newly_crossed.iter().copied());

            if let Some(&threshold) = newly_crossed.last() {
                info!(
                    "budget alert for {}: {}% threshold crossed ({} of {})",
                    period, threshold, spent, effective
                );
                alert = Some(BudgetAlertEvent {
                    period,
                    threshold,
                    spent,
                    limit: effective,
                    percentage_used: percentage_used.unwrap_or_default(),
                });
            }
        }

        BudgetEvaluation {
            period,
            spent,
            limit: effective,
            percentage_used,
            level: self.level_of(state),
            alert,
        }
    }

    /// Latch state for `period`, if it has ever been evaluated.
    pub fn state(&self, period: &PeriodKey) -> Option<BudgetState> {
        self.lock().get(period).cloned()
    }

    pub fn level(&self, period: &PeriodKey) -> BudgetLevel {
        self.lock()
            .get(period)
            .map(|s| self.level_of(s))
            .unwrap_or(BudgetLevel::Clear)
    }

    /// Forget every latch of `period`.
    pub fn reset_period(&self, period: &PeriodKey) {
        self.lock().remove(period);
    }

    /// All period states, ordered by period.
    pub fn snapshot(&self) -> Vec<BudgetState> {
        let mut states: Vec<BudgetState> = self.lock().values().cloned().collect();
        states.sort_by_key(|s| s.period);
        states
    }

    /// Replace the latches of the periods in `states`. Other periods are kept.
    pub fn restore(&self, states: impl IntoIterator<Item = BudgetState>) {
        let mut current = self.lock();
        for state in states {
            current.insert(state.period, state);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PeriodKey, BudgetState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn level_of(&self, state: &BudgetState) -> BudgetLevel {
        let highest_configured = self.thresholds.as_slice().last().copied();
        match state.fired_thresholds.iter().next_back().copied() {
            None => BudgetLevel::Clear,
            Some(t) if Some(t) == highest_configured => BudgetLevel::Critical(t),
            Some(t) => BudgetLevel::Warned(t),
        }
    }
}

/// `spent / limit >= threshold%`, compared exactly in integers.
fn crossed(spent: Money, limit: Money, threshold: u32) -> bool {
    i128::from(spent.minor()) * 100 >= i128::from(limit.minor()) * i128::from(threshold)
}

fn percentage(spent: Money, limit: Money) -> Option<f64> {
    if !limit.is_positive() {
        return None;
    }
    (spent.to_decimal() * Decimal::ONE_HUNDRED)
        .checked_div(limit.to_decimal())
        .and_then(|pct| pct.to_f64())
}
