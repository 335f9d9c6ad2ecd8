//! # Domain Models
//!
//! Canonical types flowing through the drift pipeline.
//!
//! Entities only move forward: an [`EarningsRecord`] is bracketed by two
//! [`PriceObservation`]s into a [`JoinedEvent`], which the drift computer turns
//! into a [`DriftResult`]. Nothing is mutated after construction.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Ticker`] | Validated, upper-cased stock ticker |
//! | [`CalendarDate`] | Timezone-naive calendar date |
//! | [`DateRange`] | Inclusive date span for price requests |
//! | [`EarningsRecord`] | Actual vs consensus EPS for one announcement |
//! | [`PriceObservation`] | Daily close for a ticker |
//! | [`JoinedEvent`] | Earnings record with bracketing closes |
//! | [`DriftResult`] | Joined event with CAR and surprise category |

mod calendar_date;
mod models;
mod ticker;

pub use calendar_date::{CalendarDate, DateRange};
pub use models::{
    DriftResult, EarningsRecord, JoinedEvent, PriceObservation, SurpriseCategory,
};
pub use ticker::Ticker;
