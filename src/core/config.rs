use crate::core::money::{RemainderPolicy, Tolerance};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// What the aggregator does with a record that fails validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordPolicy {
    /// Fail the whole batch, reporting every bad record.
    #[default]
    Reject,
    /// Drop bad records and report them alongside the result.
    Exclude,
}

/// Budget alert thresholds in percent, strictly ascending.
///
/// # Examples
///
/// ```
/// use ledger_settlement::core::config::AlertThresholds;
///
/// assert!(AlertThresholds::new(vec![50, 80, 100]).is_ok());
/// assert!(AlertThresholds::new(vec![90, 75]).is_err());
/// assert!(AlertThresholds::new(vec![]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct AlertThresholds(Vec<u32>);

impl AlertThresholds {
    pub fn new(percentages: Vec<u32>) -> Result<Self> {
        if percentages.is_empty() {
            return Err(LedgerError::Configuration(
                "alert_thresholds must not be empty".into(),
            ));
        }
        if percentages.contains(&0) {
            return Err(LedgerError::Configuration(
                "alert_thresholds must be positive percentages".into(),
            ));
        }
        if percentages.windows(2).any(|w| w[0] >= w[1]) {
            return Err(LedgerError::Configuration(format!(
                "alert_thresholds must be strictly ascending, got {percentages:?}"
            )));
        }
        Ok(Self(percentages))
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self(vec![75, 90])
    }
}

impl TryFrom<Vec<u32>> for AlertThresholds {
    type Error = LedgerError;

    fn try_from(value: Vec<u32>) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AlertThresholds> for Vec<u32> {
    fn from(value: AlertThresholds) -> Self {
        value.0
    }
}

/// Engine-wide options.
///
/// Every field has a default, so `{}` is a valid configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Settlement tolerance in hundredths of a minor unit.
    pub tolerance_minor_units: u32,
    pub alert_thresholds: AlertThresholds,
    pub remainder_policy: RemainderPolicy,
    pub record_policy: RecordPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tolerance_minor_units: Tolerance::DEFAULT_HUNDREDTHS,
            alert_thresholds: AlertThresholds::default(),
            remainder_policy: RemainderPolicy::default(),
            record_policy: RecordPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LedgerError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Re-checks invariants that a hand-built config may have skipped.
    pub fn validate(&self) -> Result<()> {
        AlertThresholds::new(self.alert_thresholds.as_slice().to_vec())?;
        Ok(())
    }

    pub fn tolerance(&self) -> Tolerance {
        Tolerance::from_hundredths(self.tolerance_minor_units)
    }
}
