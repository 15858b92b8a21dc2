use chrono::{Local, NaiveDate};

/// Source of the current calendar date.
///
/// Callers read the date once per issuance and pass that single value
/// through the whole load-decide-save cycle, so the comparison and the
/// record written always agree even across midnight.
pub trait Clock: Send + Sync {
    /// Returns the current calendar date, date-only precision.
    fn today(&self) -> NaiveDate;
}

/// Clock backed by the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
