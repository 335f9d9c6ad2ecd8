//! Per-record outcomes for pipeline stages.
//!
//! Each stage decides record by record whether to keep or drop. Dropped
//! records keep their reason so diagnostics survive to the final report.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::ValidationError;

/// Pipeline stage that made a keep/drop decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Join,
    Drift,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Join => "join",
            Self::Drift => "drift",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a record did not make it to the next stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
    MissingField { field: String },
    UnparseableDate { value: String },
    UnparseableNumber { field: String, value: String },
    InvalidTicker { value: String, detail: String },
    ZeroConsensus,
    NonFiniteValue { field: String },
    InvalidValue { detail: String },
    NoPriceHistory,
    NoPriceBefore,
    NoPriceAfter,
    ZeroPriceBefore,
}

impl DropReason {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "missing_field",
            Self::UnparseableDate { .. } => "unparseable_date",
            Self::UnparseableNumber { .. } => "unparseable_number",
            Self::InvalidTicker { .. } => "invalid_ticker",
            Self::ZeroConsensus => "zero_consensus",
            Self::NonFiniteValue { .. } => "non_finite_value",
            Self::InvalidValue { .. } => "invalid_value",
            Self::NoPriceHistory => "no_price_history",
            Self::NoPriceBefore => "no_price_before",
            Self::NoPriceAfter => "no_price_after",
            Self::ZeroPriceBefore => "zero_price_before",
        }
    }
}

impl Display for DropReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { field } => write!(f, "missing required field '{field}'"),
            Self::UnparseableDate { value } => write!(f, "unparseable date '{value}'"),
            Self::UnparseableNumber { field, value } => {
                write!(f, "field '{field}' is not a number: '{value}'")
            }
            Self::InvalidTicker { value, detail } => write!(f, "invalid ticker '{value}': {detail}"),
            Self::ZeroConsensus => f.write_str("consensus EPS is zero"),
            Self::NonFiniteValue { field } => write!(f, "field '{field}' is not finite"),
            Self::InvalidValue { detail } => f.write_str(detail),
            Self::NoPriceHistory => f.write_str("no price history for ticker"),
            Self::NoPriceBefore => f.write_str("no close strictly before report date"),
            Self::NoPriceAfter => f.write_str("no close strictly after report date"),
            Self::ZeroPriceBefore => f.write_str("close before report date is zero"),
        }
    }
}

impl From<ValidationError> for DropReason {
    fn from(error: ValidationError) -> Self {
        match error {
            ValidationError::ZeroConsensus => Self::ZeroConsensus,
            ValidationError::NonFiniteValue { field } => Self::NonFiniteValue {
                field: field.to_owned(),
            },
            ValidationError::InvalidDate { value } => Self::UnparseableDate { value },
            other => Self::InvalidValue {
                detail: other.to_string(),
            },
        }
    }
}

/// A record removed by a stage, with enough context to find it again.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dropped {
    pub stage: Stage,
    pub subject: String,
    #[serde(flatten)]
    pub reason: DropReason,
}

impl Display for Dropped {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.subject, self.reason)
    }
}

/// Records kept by a stage plus the ones it dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport<T> {
    pub kept: Vec<T>,
    pub dropped: Vec<Dropped>,
}

impl<T> StageReport<T> {
    pub fn new() -> Self {
        Self {
            kept: Vec::new(),
            dropped: Vec::new(),
        }
    }

    /// Files one per-record outcome, logging drops at `warn`.
    pub fn record(&mut self, stage: Stage, subject: impl Into<String>, outcome: Result<T, DropReason>) {
        match outcome {
            Ok(value) => self.kept.push(value),
            Err(reason) => {
                let dropped = Dropped {
                    stage,
                    subject: subject.into(),
                    reason,
                };
                tracing::warn!(
                    stage = %dropped.stage,
                    subject = %dropped.subject,
                    reason = dropped.reason.code(),
                    "dropped record: {}",
                    dropped.reason
                );
                self.dropped.push(dropped);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

impl<T> Default for StageReport<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_splits_kept_and_dropped() {
        let mut report = StageReport::new();
        report.record(Stage::Load, "row 2", Ok(1));
        report.record(Stage::Load, "row 3", Err(DropReason::ZeroConsensus));
        report.record(Stage::Load, "row 4", Ok(3));

        assert_eq!(report.kept, vec![1, 3]);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].subject, "row 3");
        assert_eq!(report.dropped[0].reason.code(), "zero_consensus");
    }

    #[test]
    fn dropped_serializes_reason_inline() {
        let dropped = Dropped {
            stage: Stage::Join,
            subject: String::from("AAPL 2024-11-01"),
            reason: DropReason::NoPriceAfter,
        };
        let value = serde_json::to_value(&dropped).expect("serialize");
        assert_eq!(value["stage"], "join");
        assert_eq!(value["reason"], "no_price_after");
    }

    #[test]
    fn validation_errors_map_to_drop_reasons() {
        assert_eq!(
            DropReason::from(ValidationError::ZeroConsensus),
            DropReason::ZeroConsensus
        );
        assert!(matches!(
            DropReason::from(ValidationError::InvalidDate {
                value: String::from("x")
            }),
            DropReason::UnparseableDate { .. }
        ));
    }
}
