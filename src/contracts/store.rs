use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::contracts::error::StoreError;

/// Durable store for the counter's single state record.
///
/// # Invariants
/// - A successful `save` fully replaces the prior record; a failed `save`
///   leaves it intact.
/// - Readers observe either the previous complete record or the new one,
///   never a partial write.
/// - Absence of a record is a normal outcome (first run), not an error.
pub trait StateStore: Send + Sync {
    /// Loads the persisted counter state.
    ///
    /// Returns `Err` only for read failures distinct from non-existence
    /// (permissions, disk faults). An unparseable record is reported as
    /// `StateLoad::Corrupt`, never as an error.
    fn load(&self) -> Result<StateLoad, StoreError>;

    /// Durably replaces the persisted state with `state`.
    fn save(&self, state: &CounterState) -> Result<(), StoreError>;
}

/// Outcome of reading the persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateLoad {
    /// No record exists yet (first run).
    Absent,
    /// A record exists but could not be parsed. Callers recover by
    /// restarting the sequence, as if no record existed.
    Corrupt,
    /// A well-formed record.
    Present(CounterState),
}

/// The counter's persisted state: the last ticket number issued and the
/// calendar day it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    /// Day for which `current_number` is valid.
    pub last_reset_date: NaiveDate,
    /// Last ticket number issued on `last_reset_date`. Always >= 1 once
    /// persisted, since issuance is the only writer.
    pub current_number: u32,
}
