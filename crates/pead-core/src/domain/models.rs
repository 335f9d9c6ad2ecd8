use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CalendarDate, Ticker, ValidationError};

/// One earnings announcement with actual and consensus EPS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsRecord {
    pub ticker: Ticker,
    pub report_date: CalendarDate,
    pub eps_actual: f64,
    pub eps_consensus: f64,
}

impl EarningsRecord {
    pub fn new(
        ticker: Ticker,
        report_date: CalendarDate,
        eps_actual: f64,
        eps_consensus: f64,
    ) -> Result<Self, ValidationError> {
        validate_finite("eps_actual", eps_actual)?;
        validate_finite("eps_consensus", eps_consensus)?;
        if eps_consensus == 0.0 {
            return Err(ValidationError::ZeroConsensus);
        }

        Ok(Self {
            ticker,
            report_date,
            eps_actual,
            eps_consensus,
        })
    }
}

/// Daily close observation for a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub ticker: Ticker,
    pub date: CalendarDate,
    pub close: f64,
}

impl PriceObservation {
    pub fn new(ticker: Ticker, date: CalendarDate, close: f64) -> Result<Self, ValidationError> {
        validate_non_negative("close", close)?;
        Ok(Self {
            ticker,
            date,
            close,
        })
    }
}

/// Earnings record bracketed by the nearest closes strictly before and after the report date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedEvent {
    pub ticker: Ticker,
    pub report_date: CalendarDate,
    pub eps_actual: f64,
    pub eps_consensus: f64,
    pub price_before: f64,
    pub price_before_date: CalendarDate,
    pub price_after: f64,
    pub price_after_date: CalendarDate,
}

impl JoinedEvent {
    pub fn new(
        record: &EarningsRecord,
        before: &PriceObservation,
        after: &PriceObservation,
    ) -> Self {
        Self {
            ticker: record.ticker.clone(),
            report_date: record.report_date,
            eps_actual: record.eps_actual,
            eps_consensus: record.eps_consensus,
            price_before: before.close,
            price_before_date: before.date,
            price_after: after.close,
            price_after_date: after.date,
        }
    }
}

/// Direction of an earnings surprise relative to consensus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SurpriseCategory {
    Positive,
    Negative,
    Neutral,
}

impl SurpriseCategory {
    pub const ALL: [Self; 3] = [Self::Positive, Self::Negative, Self::Neutral];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        }
    }
}

impl Display for SurpriseCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurpriseCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                format!("invalid surprise category '{value}', expected Positive, Negative or Neutral")
            })
    }
}

/// Joined event enriched with its cumulative abnormal return and surprise classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftResult {
    #[serde(flatten)]
    pub event: JoinedEvent,
    pub car: f64,
    pub surprise_ratio: f64,
    pub surprise_category: SurpriseCategory,
}

impl DriftResult {
    pub fn ticker(&self) -> &Ticker {
        &self.event.ticker
    }
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
