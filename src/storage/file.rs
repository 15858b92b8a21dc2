use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use crate::contracts::{CounterState, StateLoad, StateStore, StoreError};

/// Separator between the date and number fields of the record.
const FIELD_SEPARATOR: char = '|';

/// Date format of the record's first field.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Single-record plain-text state store.
///
/// The record is one line, `YYYY-MM-DD|<number>`, overwritten wholesale on
/// every save. Saves go through a temp file in the target's directory
/// followed by an atomic rename, so a reader never observes a partial
/// write and a failed save leaves the previous record intact.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Opens a store at `path`, creating the parent directory if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let parent = parent_dir(&path)?;
        fs::create_dir_all(parent).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(Self { path })
    }

    /// Path of the backing state file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<StateLoad, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            // Absence is the expected first-run case, not a failure.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StateLoad::Absent),
            Err(e) => return Err(StoreError::ReadFailed(e.to_string())),
        };

        match parse_record(&raw) {
            Some(state) => Ok(StateLoad::Present(state)),
            None => {
                tracing::debug!(raw = %raw.trim(), "Unparseable state record");
                Ok(StateLoad::Corrupt)
            }
        }
    }

    fn save(&self, state: &CounterState) -> Result<(), StoreError> {
        let dir = parent_dir(&self.path)?;

        // Temp file must live in the same directory as the target for the
        // rename to stay atomic (renames across filesystems are copies).
        let mut tmp =
            NamedTempFile::new_in(dir).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        tmp.write_all(encode_record(state).as_bytes())
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        Ok(())
    }
}

fn parent_dir(path: &Path) -> Result<&Path, StoreError> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| {
            StoreError::InvalidPath(format!("{} has no parent directory", path.display()))
        })
}

/// Parses a record line. Returns `None` for anything that does not split
/// into exactly a date part and a number part (missing separator, bad
/// date, bad number, extra fields, truncated write).
fn parse_record(raw: &str) -> Option<CounterState> {
    let (date_part, number_part) = raw.trim().split_once(FIELD_SEPARATOR)?;
    let last_reset_date = NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()?;
    let current_number = number_part.parse::<u32>().ok()?;
    Some(CounterState {
        last_reset_date,
        current_number,
    })
}

fn encode_record(state: &CounterState) -> String {
    format!(
        "{}{}{}\n",
        state.last_reset_date.format(DATE_FORMAT),
        FIELD_SEPARATOR,
        state.current_number
    )
}
