//! Core types for the Vitalink engine
//!
//! This module defines the data that flows through the engine: decoded
//! telemetry events, per-metric daily aggregates, point-in-time snapshots,
//! and the device location state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A decoded, typed unit of telemetry derived from one frame key.
///
/// Events are produced only by the frame parser and consumed exactly once
/// by the ingestion loop's dispatch step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// Body weight reading (kg)
    Weight(f64),
    /// Distance covered since the previous reading (meters)
    Distance(f64),
    /// Heart rate reading (bpm)
    Heartbeat(i64),
    /// Blood oxygen saturation (percent)
    Oxygen(f64),
    /// Body temperature (celsius)
    Temperature(f64),
    /// Accumulated workout duration
    WorkoutTime(WorkoutTime),
    /// GPS position fix
    Location { latitude: f64, longitude: f64 },
    /// Distress signal from the device
    Emergency,
}

/// Workout duration as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutTime {
    pub hours: i64,
    pub minutes: i64,
}

impl WorkoutTime {
    pub fn new(hours: i64, minutes: i64) -> Self {
        Self { hours, minutes }
    }

    /// Total duration in minutes, the unit workout time is aggregated in
    pub fn total_minutes(&self) -> f64 {
        (self.hours * 60 + self.minutes) as f64
    }

    /// Convert an aggregated minute count back to hours/minutes
    pub fn from_total_minutes(total: f64) -> Self {
        let total = total.round() as i64;
        Self {
            hours: total / 60,
            minutes: total % 60,
        }
    }
}

/// The metric kinds that participate in daily aggregation.
///
/// Location and Emergency events are routed elsewhere and never enter the
/// aggregation store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Weight,
    Distance,
    Heartbeat,
    Oxygen,
    Temperature,
    WorkoutTime,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Weight => "weight",
            MetricKind::Distance => "distance",
            MetricKind::Heartbeat => "heartbeat",
            MetricKind::Oxygen => "oxygen",
            MetricKind::Temperature => "temperature",
            MetricKind::WorkoutTime => "workout_time",
        }
    }

    /// Fixed aggregation policy table: distance accumulates, every other
    /// metric is a running daily average.
    pub fn policy(&self) -> AggregatePolicy {
        match self {
            MetricKind::Distance => AggregatePolicy::Sum,
            _ => AggregatePolicy::Average,
        }
    }
}

/// Rule by which repeated same-day readings of one metric combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregatePolicy {
    Average,
    Sum,
}

/// Running daily aggregate for one metric kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricAggregate {
    /// Number of samples received since the last reset
    pub sample_count: u64,
    /// Policy-defined combination of all samples since the last reset
    pub value: f64,
    pub policy: AggregatePolicy,
}

/// Immutable, point-in-time copy of all current-day aggregates.
///
/// Metrics never touched that day are absent, not zero; callers decide the
/// zero/null policy. Ownership transfers to the persistence collaborator
/// at the daily flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    pub metrics: BTreeMap<MetricKind, MetricAggregate>,
}

impl DailySnapshot {
    /// True if no metric received a sample that day
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn get(&self, kind: MetricKind) -> Option<&MetricAggregate> {
        self.metrics.get(&kind)
    }

    fn value(&self, kind: MetricKind) -> Option<f64> {
        self.metrics.get(&kind).map(|a| a.value)
    }

    pub fn weight(&self) -> Option<f64> {
        self.value(MetricKind::Weight)
    }

    pub fn distance(&self) -> Option<f64> {
        self.value(MetricKind::Distance)
    }

    pub fn heartbeat(&self) -> Option<f64> {
        self.value(MetricKind::Heartbeat)
    }

    pub fn oxygen(&self) -> Option<f64> {
        self.value(MetricKind::Oxygen)
    }

    pub fn temperature(&self) -> Option<f64> {
        self.value(MetricKind::Temperature)
    }

    /// Aggregated workout time converted back from total minutes
    pub fn workout_time(&self) -> Option<WorkoutTime> {
        self.value(MetricKind::WorkoutTime)
            .map(WorkoutTime::from_total_minutes)
    }
}

/// The single most-recent known device position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationState {
    pub latitude: f64,
    pub longitude: f64,
    /// Receipt time of the fix, not the device-side measurement time
    pub updated_at: DateTime<Utc>,
}

/// Plain coordinate pair for alert payloads and the location query surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<LocationState> for Coordinates {
    fn from(state: LocationState) -> Self {
        Self {
            latitude: state.latitude,
            longitude: state.longitude,
        }
    }
}
