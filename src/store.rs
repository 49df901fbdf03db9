//! Daily aggregation store
//!
//! Holds the per-metric running aggregates for the active date. Each metric
//! combines under its fixed policy: distance accumulates, everything else
//! keeps a running mean. The store is plain owned state; the engine wraps
//! it in a mutex and the ingestion loop is its sole writer.

use crate::types::{AggregatePolicy, DailySnapshot, MetricAggregate, MetricKind};
use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;

/// Per-metric running daily aggregates for the active date
#[derive(Debug, Clone)]
pub struct AggregationStore {
    date: NaiveDate,
    metrics: BTreeMap<MetricKind, MetricAggregate>,
}

impl Default for AggregationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregationStore {
    /// Create an empty store. The first sample establishes the window date.
    pub fn new() -> Self {
        Self {
            date: Local::now().date_naive(),
            metrics: BTreeMap::new(),
        }
    }

    /// The date of the current aggregation window. Meaningful once the
    /// first sample has arrived; until then it is a placeholder.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Fold one sample into the aggregate for `kind`, dated with the
    /// local clock.
    pub fn update(&mut self, kind: MetricKind, value: f64) {
        self.update_on(Local::now().date_naive(), kind, value);
    }

    /// Date-explicit variant of [`AggregationStore::update`].
    ///
    /// The first sample into an empty store opens the window and stamps
    /// its date; later samples fold into the open window wherever they
    /// arrive, so a missed flush accumulates into the current window
    /// rather than backfilling. The first sample of a kind creates the
    /// aggregate with `sample_count = 1`. Averages use an incremental
    /// mean, which avoids re-summation and bounds numeric drift
    /// regardless of stream length.
    pub fn update_on(&mut self, date: NaiveDate, kind: MetricKind, value: f64) {
        if self.metrics.is_empty() {
            self.date = date;
        }
        match self.metrics.get_mut(&kind) {
            Some(aggregate) => {
                match aggregate.policy {
                    AggregatePolicy::Average => {
                        aggregate.value +=
                            (value - aggregate.value) / (aggregate.sample_count as f64 + 1.0);
                    }
                    AggregatePolicy::Sum => {
                        aggregate.value += value;
                    }
                }
                aggregate.sample_count += 1;
            }
            None => {
                self.metrics.insert(
                    kind,
                    MetricAggregate {
                        sample_count: 1,
                        value,
                        policy: kind.policy(),
                    },
                );
            }
        }
    }

    /// Point-in-time copy of every currently-present aggregate.
    ///
    /// Metrics never touched that day are absent from the snapshot, not
    /// zero. The copy shares no state with the store, so the caller can
    /// hand it to a slow collaborator without holding any guard.
    pub fn snapshot(&self) -> DailySnapshot {
        DailySnapshot {
            date: self.date,
            metrics: self.metrics.clone(),
        }
    }

    /// Clear all aggregates, establishing a fresh empty state.
    ///
    /// The date of the next window is stamped by its first sample, not
    /// here: a flush that fires late in day D must not pin the fresh
    /// store to the already-persisted date D. Must only be called after
    /// the preceding snapshot has been durably handed off.
    pub fn reset(&mut self) {
        self.metrics.clear();
    }

    #[cfg(test)]
    fn get(&self, kind: MetricKind) -> Option<&MetricAggregate> {
        self.metrics.get(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn store() -> AggregationStore {
        AggregationStore::new()
    }

    #[test]
    fn test_first_sample_creates_aggregate() {
        let mut store = store();
        store.update(MetricKind::Weight, 70.2);

        let agg = store.get(MetricKind::Weight).unwrap();
        assert_eq!(agg.sample_count, 1);
        assert_eq!(agg.value, 70.2);
        assert_eq!(agg.policy, AggregatePolicy::Average);
    }

    #[test]
    fn test_weight_average_of_two() {
        let mut store = store();
        store.update(MetricKind::Weight, 70.2);
        store.update(MetricKind::Weight, 71.8);

        let agg = store.get(MetricKind::Weight).unwrap();
        assert_eq!(agg.sample_count, 2);
        assert!((agg.value - 71.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_sums() {
        let mut store = store();
        store.update(MetricKind::Distance, 5.0);
        store.update(MetricKind::Distance, 3.2);

        let agg = store.get(MetricKind::Distance).unwrap();
        assert_eq!(agg.sample_count, 2);
        assert!((agg.value - 8.2).abs() < 1e-9);
    }

    #[test]
    fn test_incremental_mean_matches_arithmetic_mean() {
        let samples = [61.0, 58.5, 72.25, 64.0, 69.75, 55.5, 66.0];
        let mut store = store();
        for s in samples {
            store.update(MetricKind::Heartbeat, s);
        }

        let expected: f64 = samples.iter().sum::<f64>() / samples.len() as f64;
        let agg = store.get(MetricKind::Heartbeat).unwrap();
        assert_eq!(agg.sample_count, samples.len() as u64);
        assert!((agg.value - expected).abs() < 1e-9);
    }

    #[test]
    fn test_mean_is_order_independent() {
        let samples = [96.0, 98.5, 94.25, 97.0];
        let mut forward = store();
        let mut backward = store();
        for s in samples {
            forward.update(MetricKind::Oxygen, s);
        }
        for s in samples.iter().rev() {
            backward.update(MetricKind::Oxygen, *s);
        }

        let a = forward.get(MetricKind::Oxygen).unwrap().value;
        let b = backward.get(MetricKind::Oxygen).unwrap().value;
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut store = store();
        store.update_on(day(), MetricKind::Temperature, 36.5);

        let snapshot = store.snapshot();
        store.update_on(day(), MetricKind::Temperature, 38.0);

        assert_eq!(snapshot.get(MetricKind::Temperature).unwrap().value, 36.5);
        assert_eq!(snapshot.date, day());
    }

    #[test]
    fn test_first_sample_opens_the_window() {
        let mut store = store();
        store.update_on(day(), MetricKind::Weight, 70.0);
        assert_eq!(store.date(), day());

        // Later samples fold into the open window wherever they arrive
        store.update_on(day().succ_opt().unwrap(), MetricKind::Weight, 71.0);
        assert_eq!(store.snapshot().date, day());
    }

    #[test]
    fn test_next_sample_after_reset_opens_a_new_window() {
        let mut store = store();
        store.update_on(day(), MetricKind::Distance, 5.0);
        store.reset();

        // The fresh window is dated by its first sample, not by the
        // instant the reset happened
        let next_day = day().succ_opt().unwrap();
        store.update_on(next_day, MetricKind::Distance, 3.0);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.date, next_day);
        assert_eq!(snapshot.get(MetricKind::Distance).unwrap().sample_count, 1);
    }

    #[test]
    fn test_untouched_metrics_absent_from_snapshot() {
        let mut store = store();
        store.update(MetricKind::Weight, 70.0);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.weight(), Some(70.0));
        assert_eq!(snapshot.distance(), None);
        assert_eq!(snapshot.heartbeat(), None);
    }

    #[test]
    fn test_reset_starts_fresh_aggregates() {
        let mut store = store();
        store.update(MetricKind::Weight, 70.2);
        store.update(MetricKind::Weight, 71.8);

        store.reset();
        assert!(store.snapshot().is_empty());

        store.update(MetricKind::Weight, 65.0);
        let agg = store.get(MetricKind::Weight).unwrap();
        assert_eq!(agg.sample_count, 1);
        assert_eq!(agg.value, 65.0);
    }

    #[test]
    fn test_workout_time_averaged_in_minutes() {
        let mut store = store();
        // 1h30m and 0h30m as total minutes
        store.update(MetricKind::WorkoutTime, 90.0);
        store.update(MetricKind::WorkoutTime, 30.0);

        let snapshot = store.snapshot();
        let wt = snapshot.workout_time().unwrap();
        assert_eq!((wt.hours, wt.minutes), (1, 0));
    }
}
