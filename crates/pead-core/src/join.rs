//! Event-price joining.
//!
//! For every earnings record, finds the latest close strictly before and the
//! earliest close strictly after the report date within that ticker's
//! history. Same-day closes are never used on either side.

use std::collections::BTreeMap;

use crate::outcome::{DropReason, Stage, StageReport};
use crate::{EarningsRecord, JoinedEvent, PriceObservation, Ticker};

/// Per-ticker price histories sorted by date for bisection.
#[derive(Debug, Clone, Default)]
pub struct PriceIndex {
    series: BTreeMap<Ticker, Vec<PriceObservation>>,
}

impl PriceIndex {
    pub fn new(histories: BTreeMap<Ticker, Vec<PriceObservation>>) -> Self {
        let series = histories
            .into_iter()
            .map(|(ticker, mut observations)| {
                observations.sort_by_key(|observation| observation.date);
                (ticker, observations)
            })
            .collect();
        Self { series }
    }

    /// Groups loose observations by their own ticker.
    pub fn from_observations<I>(observations: I) -> Self
    where
        I: IntoIterator<Item = PriceObservation>,
    {
        let mut histories: BTreeMap<Ticker, Vec<PriceObservation>> = BTreeMap::new();
        for observation in observations {
            histories
                .entry(observation.ticker.clone())
                .or_default()
                .push(observation);
        }
        Self::new(histories)
    }

    pub fn history(&self, ticker: &Ticker) -> Option<&[PriceObservation]> {
        self.series.get(ticker).map(Vec::as_slice)
    }

    /// Brackets one earnings record with its nearest closes.
    pub fn join(&self, record: &EarningsRecord) -> Result<JoinedEvent, DropReason> {
        let history = self
            .history(&record.ticker)
            .filter(|history| !history.is_empty())
            .ok_or(DropReason::NoPriceHistory)?;

        let first_not_before = history.partition_point(|o| o.date < record.report_date);
        let first_after = history.partition_point(|o| o.date <= record.report_date);

        let before = first_not_before
            .checked_sub(1)
            .and_then(|position| history.get(position))
            .ok_or(DropReason::NoPriceBefore)?;
        let after = history.get(first_after).ok_or(DropReason::NoPriceAfter)?;

        Ok(JoinedEvent::new(record, before, after))
    }
}

/// Joins every record, dropping those without a close on both sides.
pub fn join_events(records: &[EarningsRecord], index: &PriceIndex) -> StageReport<JoinedEvent> {
    let mut report = StageReport::new();
    for record in records {
        report.record(
            Stage::Join,
            format!("{} {}", record.ticker, record.report_date),
            index.join(record),
        );
    }

    tracing::info!(
        joined = report.kept.len(),
        dropped = report.dropped.len(),
        "joined earnings events to prices"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CalendarDate;

    fn date(value: &str) -> CalendarDate {
        CalendarDate::parse(value).expect("valid date")
    }

    fn ticker(value: &str) -> Ticker {
        Ticker::parse(value).expect("valid ticker")
    }

    fn price(symbol: &str, day: &str, close: f64) -> PriceObservation {
        PriceObservation::new(ticker(symbol), date(day), close).expect("valid price")
    }

    fn record(symbol: &str, day: &str) -> EarningsRecord {
        EarningsRecord::new(ticker(symbol), date(day), 1.0, 0.95).expect("valid record")
    }

    fn unsorted_index() -> PriceIndex {
        PriceIndex::from_observations([
            price("AAPL", "2024-11-04", 110.0),
            price("AAPL", "2024-10-30", 98.0),
            price("AAPL", "2024-11-01", 105.0),
            price("AAPL", "2024-10-31", 100.0),
            price("AAPL", "2024-11-05", 111.0),
        ])
    }

    #[test]
    fn skips_same_day_close_on_both_sides() {
        let joined = unsorted_index()
            .join(&record("AAPL", "2024-11-01"))
            .expect("should join");

        assert_eq!(joined.price_before, 100.0);
        assert_eq!(joined.price_before_date, date("2024-10-31"));
        assert_eq!(joined.price_after, 110.0);
        assert_eq!(joined.price_after_date, date("2024-11-04"));
    }

    #[test]
    fn weekend_report_uses_surrounding_trading_days() {
        let joined = unsorted_index()
            .join(&record("AAPL", "2024-11-02"))
            .expect("should join");
        assert_eq!(joined.price_before_date, date("2024-11-01"));
        assert_eq!(joined.price_after_date, date("2024-11-04"));
    }

    #[test]
    fn missing_side_drops_record() {
        let index = unsorted_index();
        assert_eq!(
            index.join(&record("AAPL", "2024-10-30")),
            Err(DropReason::NoPriceBefore)
        );
        assert_eq!(
            index.join(&record("AAPL", "2024-11-05")),
            Err(DropReason::NoPriceAfter)
        );
        assert_eq!(
            index.join(&record("MSFT", "2024-11-01")),
            Err(DropReason::NoPriceHistory)
        );
    }

    #[test]
    fn duplicate_timestamps_do_not_panic() {
        let index = PriceIndex::from_observations([
            price("AAPL", "2024-10-31", 100.0),
            price("AAPL", "2024-10-31", 101.0),
            price("AAPL", "2024-11-04", 110.0),
            price("AAPL", "2024-11-04", 109.0),
        ]);
        let joined = index.join(&record("AAPL", "2024-11-01")).expect("should join");
        assert!(joined.price_before == 100.0 || joined.price_before == 101.0);
        assert!(joined.price_after == 110.0 || joined.price_after == 109.0);
    }

    #[test]
    fn join_events_reports_drops_per_record() {
        let records = vec![
            record("AAPL", "2024-11-01"),
            record("AAPL", "2024-11-05"),
            record("MSFT", "2024-11-01"),
        ];
        let report = join_events(&records, &unsorted_index());

        assert_eq!(report.kept.len(), 1);
        assert_eq!(report.dropped.len(), 2);
        assert_eq!(report.dropped[0].subject, "AAPL 2024-11-05");
        assert_eq!(report.dropped[1].reason, DropReason::NoPriceHistory);
        for event in &report.kept {
            assert!(event.price_before_date < event.report_date);
            assert!(event.report_date < event.price_after_date);
        }
    }
}
