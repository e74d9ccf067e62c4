use crate::core::member::MemberId;
use crate::core::money::Money;
use crate::core::record::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a record was refused before any share was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// Amount was zero or negative.
    NonPositiveAmount,
    /// A participant set was supplied but contained nobody.
    EmptyParticipants,
    /// Posting the amount would push a running total past `i64` minor units.
    AmountOverflow,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::NonPositiveAmount => write!(f, "amount must be positive"),
            InvalidReason::EmptyParticipants => {
                write!(f, "explicit participant set must not be empty")
            }
            InvalidReason::AmountOverflow => write!(f, "amount overflows the ledger totals"),
        }
    }
}

/// Errors produced by the ledger engine.
///
/// Every variant is a data-quality signal: the caller fixes the input and
/// re-invokes. Nothing here is fatal to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum LedgerError {
    #[error("record {record} is invalid: {reason}")]
    InvalidRecord {
        record: RecordId,
        reason: InvalidReason,
    },
    #[error("record {record} references unknown participant {member}")]
    UnknownParticipant { record: RecordId, member: MemberId },
    #[error("cannot split {amount} among zero participants")]
    DivisionDegenerate { amount: Money },
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("{} record(s) rejected: {}", .0.len(), summarize(.0))]
    Rejected(Vec<LedgerError>),
}

impl LedgerError {
    /// The record this error is attached to, when there is one.
    pub fn record(&self) -> Option<RecordId> {
        match self {
            LedgerError::InvalidRecord { record, .. }
            | LedgerError::UnknownParticipant { record, .. } => Some(*record),
            _ => None,
        }
    }

    /// Flatten a batch rejection into its individual failures.
    pub fn failures(&self) -> Vec<&LedgerError> {
        match self {
            LedgerError::Rejected(inner) => inner.iter().flat_map(|e| e.failures()).collect(),
            other => vec![other],
        }
    }
}

fn summarize(errors: &[LedgerError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, LedgerError>;
