//! Persistence gateway interface
//!
//! Durable storage of one snapshot row per day is owned by an external
//! collaborator behind the [`PersistenceGateway`] trait. The core only
//! needs to know whether a handoff succeeded, so it can decide whether to
//! reset the aggregation store.

use crate::error::PersistError;
use crate::types::DailySnapshot;
use std::collections::BTreeMap;

/// Consumer of daily snapshots.
///
/// A [`PersistError::DuplicateDate`] is recoverable: the caller logs it and
/// discards the snapshot for that attempt without resetting the store.
pub trait PersistenceGateway: Send {
    fn save_daily_record(&mut self, snapshot: &DailySnapshot) -> Result<(), PersistError>;
}

/// In-memory gateway with the same one-row-per-date constraint a relational
/// backend would enforce. Used by tests and the CLI demo.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    records: BTreeMap<chrono::NaiveDate, DailySnapshot>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &BTreeMap<chrono::NaiveDate, DailySnapshot> {
        &self.records
    }
}

impl PersistenceGateway for InMemoryGateway {
    fn save_daily_record(&mut self, snapshot: &DailySnapshot) -> Result<(), PersistError> {
        if self.records.contains_key(&snapshot.date) {
            return Err(PersistError::DuplicateDate(snapshot.date));
        }
        self.records.insert(snapshot.date, snapshot.clone());
        Ok(())
    }
}
