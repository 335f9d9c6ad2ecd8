//! Cumulative abnormal return and earnings surprise classification.
//!
//! Pure functions over [`JoinedEvent`]s. Running the computer twice over the
//! same events yields identical results.

use crate::outcome::{DropReason, Stage, StageReport};
use crate::{DriftResult, JoinedEvent, SurpriseCategory};

/// Surprise ratios within `[-0.01, 0.01]` classify as Neutral.
pub const DEFAULT_SURPRISE_THRESHOLD: f64 = 0.01;

/// `(price_after - price_before) / price_before`.
pub fn cumulative_abnormal_return(price_before: f64, price_after: f64) -> Result<f64, DropReason> {
    if price_before == 0.0 {
        return Err(DropReason::ZeroPriceBefore);
    }
    finite("car", (price_after - price_before) / price_before)
}

/// `(eps_actual - eps_consensus) / eps_consensus`.
pub fn surprise_ratio(eps_actual: f64, eps_consensus: f64) -> Result<f64, DropReason> {
    if eps_consensus == 0.0 {
        return Err(DropReason::ZeroConsensus);
    }
    finite("surprise_ratio", (eps_actual - eps_consensus) / eps_consensus)
}

/// Positive above `threshold`, Negative below `-threshold`, Neutral otherwise.
///
/// A ratio of exactly zero (actual equals consensus) is Neutral for any
/// non-negative threshold.
pub fn classify(ratio: f64, threshold: f64) -> SurpriseCategory {
    if ratio > threshold {
        SurpriseCategory::Positive
    } else if ratio < -threshold {
        SurpriseCategory::Negative
    } else {
        SurpriseCategory::Neutral
    }
}

fn finite(field: &str, value: f64) -> Result<f64, DropReason> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DropReason::NonFiniteValue {
            field: field.to_owned(),
        })
    }
}

/// Computes CAR and surprise category for joined events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftComputer {
    threshold: f64,
}

impl Default for DriftComputer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SURPRISE_THRESHOLD,
        }
    }
}

impl DriftComputer {
    /// Negative or non-finite thresholds fall back to the default.
    pub fn new(threshold: f64) -> Self {
        if threshold.is_finite() && threshold >= 0.0 {
            Self { threshold }
        } else {
            Self::default()
        }
    }

    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn compute(&self, event: &JoinedEvent) -> Result<DriftResult, DropReason> {
        let car = cumulative_abnormal_return(event.price_before, event.price_after)?;
        let ratio = surprise_ratio(event.eps_actual, event.eps_consensus)?;

        Ok(DriftResult {
            event: event.clone(),
            car,
            surprise_ratio: ratio,
            surprise_category: classify(ratio, self.threshold),
        })
    }

    pub fn compute_all(&self, events: &[JoinedEvent]) -> StageReport<DriftResult> {
        let mut report = StageReport::new();
        for event in events {
            report.record(
                Stage::Drift,
                format!("{} {}", event.ticker, event.report_date),
                self.compute(event),
            );
        }
        report
    }
}
