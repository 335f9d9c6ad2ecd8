//! Read-only orderings and aggregates over drift results.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::{DriftResult, SurpriseCategory};

/// Number of entries `top_by_car` returns when the caller has no preference.
pub const DEFAULT_TOP_N: usize = 5;

/// Sort direction for CAR rankings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Mean CAR and count for one surprise category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: SurpriseCategory,
    pub mean_car: f64,
    pub count: usize,
}

/// Projection over a borrowed slice of drift results; never mutates or adds fields.
#[derive(Debug, Clone, Copy)]
pub struct Ranker<'a> {
    results: &'a [DriftResult],
}

impl<'a> Ranker<'a> {
    pub fn new(results: &'a [DriftResult]) -> Self {
        Self { results }
    }

    /// First `n` results by CAR. Ties keep input order.
    pub fn top_by_car(&self, n: usize, order: SortOrder) -> Vec<&'a DriftResult> {
        let mut sorted = self.sorted_by_car(self.results.iter(), order);
        sorted.truncate(n);
        sorted
    }

    /// Every result in `category`, highest CAR first.
    pub fn filter_by_category(&self, category: SurpriseCategory) -> Vec<&'a DriftResult> {
        self.sorted_by_car(
            self.results
                .iter()
                .filter(|result| result.surprise_category == category),
            SortOrder::Descending,
        )
    }

    /// Mean CAR and count per category present in the input, in
    /// Positive, Negative, Neutral order. Absent categories are omitted.
    pub fn summary_stats(&self) -> Vec<CategoryStats> {
        let mut totals: BTreeMap<SurpriseCategory, (f64, usize)> = BTreeMap::new();
        for result in self.results {
            let entry = totals.entry(result.surprise_category).or_insert((0.0, 0));
            entry.0 += result.car;
            entry.1 += 1;
        }

        totals
            .into_iter()
            .map(|(category, (sum, count))| CategoryStats {
                category,
                mean_car: sum / count as f64,
                count,
            })
            .collect()
    }

    fn sorted_by_car<I>(&self, results: I, order: SortOrder) -> Vec<&'a DriftResult>
    where
        I: Iterator<Item = &'a DriftResult>,
    {
        let mut sorted = results.collect::<Vec<_>>();
        // slice::sort_by is stable
        sorted.sort_by(|left, right| compare_car(left.car, right.car, order));
        sorted
    }
}

fn compare_car(left: f64, right: f64, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Ascending => left.total_cmp(&right),
        SortOrder::Descending => right.total_cmp(&left),
    }
}
