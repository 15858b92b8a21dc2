use std::sync::Mutex;

use chrono::NaiveDate;

use crate::contracts::{CounterError, CounterState, LockResultExt, StateLoad, StateStore};

/// Minimum width of the display form; shorter numbers are zero-padded.
const DISPLAY_MIN_WIDTH: usize = 2;

/// A ticket produced by a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTicket {
    pub ticket_number: u32,
    /// Zero-padded form shown to customers ("01", "12", "137").
    pub display_number: String,
    /// Day the ticket was issued for.
    pub issued_on: NaiveDate,
    /// True when this issuance found an unparseable record and restarted
    /// the sequence.
    pub recovered_from_corruption: bool,
}

/// Daily-reset ticket counter over a durable state store.
///
/// Each issuance is a fresh load-decide-save cycle: no counter value is
/// cached between calls, so the store is the single source of truth. The
/// whole cycle runs under one process-wide mutex, which makes concurrent
/// issuances on the same day yield unique, gapless numbers.
///
/// # Invariants
/// - Same-day issuances return strictly increasing numbers.
/// - A day change restarts the sequence at 1.
/// - A number is returned only after it has been durably persisted.
pub struct TicketCounter<S: StateStore> {
    store: S,
    issue_lock: Mutex<()>,
}

impl<S: StateStore> TicketCounter<S> {
    /// Creates a counter over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            issue_lock: Mutex::new(()),
        }
    }

    /// Issues the next ticket for `today`.
    ///
    /// Decision rule:
    /// - no record, or record unparseable → 1
    /// - record for a different day → 1 (daily reset)
    /// - record for `today` → stored number + 1
    ///
    /// The new state is persisted before the ticket is returned; a failed
    /// save aborts the issuance so the next successful call increments
    /// from the last durably recorded value.
    pub fn issue_next(&self, today: NaiveDate) -> Result<IssuedTicket, CounterError> {
        let _guard = self.issue_lock.lock().map_lock_err()?;

        let loaded = self.store.load()?;
        let recovered = matches!(loaded, StateLoad::Corrupt);
        if recovered {
            tracing::warn!("Persisted counter state unreadable, restarting sequence at 1");
        }

        let ticket_number = match loaded {
            StateLoad::Present(state) if state.last_reset_date == today => state
                .current_number
                .checked_add(1)
                .ok_or(CounterError::Overflow)?,
            // First run, new day, or recovered corruption: sequence restarts.
            _ => 1,
        };

        self.store.save(&CounterState {
            last_reset_date: today,
            current_number: ticket_number,
        })?;

        Ok(IssuedTicket {
            ticket_number,
            display_number: format_display(ticket_number),
            issued_on: today,
            recovered_from_corruption: recovered,
        })
    }

    /// Reads the persisted state without advancing it.
    ///
    /// Issuance is the only mutator; peeking any number of times leaves
    /// the record untouched.
    pub fn current(&self) -> Result<StateLoad, CounterError> {
        let _guard = self.issue_lock.lock().map_lock_err()?;
        Ok(self.store.load()?)
    }
}

/// Zero-pads a ticket number to at least two digits. Numbers of three or
/// more digits are rendered as-is, never truncated.
pub fn format_display(ticket_number: u32) -> String {
    format!("{:0width$}", ticket_number, width = DISPLAY_MIN_WIDTH)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    /// In-memory store for exercising the decision rule in isolation.
    struct MemoryStore {
        record: Mutex<StateLoad>,
        fail_saves: AtomicBool,
    }

    impl MemoryStore {
        fn new(initial: StateLoad) -> Self {
            Self {
                record: Mutex::new(initial),
                fail_saves: AtomicBool::new(false),
            }
        }
    }

    impl StateStore for MemoryStore {
        fn load(&self) -> Result<StateLoad, crate::contracts::StoreError> {
            Ok(*self.record.lock().unwrap())
        }

        fn save(&self, state: &CounterState) -> Result<(), crate::contracts::StoreError> {
            if self.fail_saves.load(Ordering::Relaxed) {
                return Err(crate::contracts::StoreError::WriteFailed(
                    "injected failure".into(),
                ));
            }
            *self.record.lock().unwrap() = StateLoad::Present(*state);
            Ok(())
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn first_issue_starts_at_one() {
        let counter = TicketCounter::new(MemoryStore::new(StateLoad::Absent));
        let ticket = counter.issue_next(date("2024-05-01")).unwrap();

        assert_eq!(ticket.ticket_number, 1);
        assert_eq!(ticket.display_number, "01");
        assert_eq!(ticket.issued_on, date("2024-05-01"));
        assert!(!ticket.recovered_from_corruption);
    }

    #[test]
    fn same_day_issue_increments_stored_number() {
        let counter = TicketCounter::new(MemoryStore::new(StateLoad::Present(CounterState {
            last_reset_date: date("2024-05-01"),
            current_number: 7,
        })));

        let ticket = counter.issue_next(date("2024-05-01")).unwrap();
        assert_eq!(ticket.ticket_number, 8);
        assert_eq!(ticket.display_number, "08");
    }

    #[test]
    fn day_change_resets_sequence_to_one() {
        let counter = TicketCounter::new(MemoryStore::new(StateLoad::Present(CounterState {
            last_reset_date: date("2024-05-01"),
            current_number: 41,
        })));

        let ticket = counter.issue_next(date("2024-05-02")).unwrap();
        assert_eq!(ticket.ticket_number, 1);
        assert_eq!(ticket.display_number, "01");

        // The new day's record replaces the old one.
        assert_eq!(
            counter.current().unwrap(),
            StateLoad::Present(CounterState {
                last_reset_date: date("2024-05-02"),
                current_number: 1,
            })
        );
    }

    #[test]
    fn successive_issues_are_strictly_increasing() {
        let counter = TicketCounter::new(MemoryStore::new(StateLoad::Absent));
        let today = date("2024-05-01");

        let mut prev = 0;
        for _ in 0..50 {
            let ticket = counter.issue_next(today).unwrap();
            assert!(ticket.ticket_number > prev);
            prev = ticket.ticket_number;
        }
    }

    #[test]
    fn padding_pads_but_never_truncates() {
        let counter = TicketCounter::new(MemoryStore::new(StateLoad::Present(CounterState {
            last_reset_date: date("2024-05-01"),
            current_number: 99,
        })));

        let ticket = counter.issue_next(date("2024-05-01")).unwrap();
        assert_eq!(ticket.ticket_number, 100);
        assert_eq!(ticket.display_number, "100");
    }

    #[test]
    fn format_display_pads_to_two_digits() {
        assert_eq!(format_display(1), "01");
        assert_eq!(format_display(9), "09");
        assert_eq!(format_display(12), "12");
        assert_eq!(format_display(137), "137");
    }

    #[test]
    fn corrupt_record_restarts_sequence() {
        let counter = TicketCounter::new(MemoryStore::new(StateLoad::Corrupt));

        let ticket = counter.issue_next(date("2024-05-01")).unwrap();
        assert_eq!(ticket.ticket_number, 1);
        assert!(ticket.recovered_from_corruption);

        // A fresh record has been written over the corrupt one.
        let ticket = counter.issue_next(date("2024-05-01")).unwrap();
        assert_eq!(ticket.ticket_number, 2);
        assert!(!ticket.recovered_from_corruption);
    }

    #[test]
    fn current_does_not_mutate_state() {
        let counter = TicketCounter::new(MemoryStore::new(StateLoad::Absent));
        let today = date("2024-05-01");

        counter.issue_next(today).unwrap();
        let before = counter.current().unwrap();
        let again = counter.current().unwrap();
        assert_eq!(before, again);

        // The next issuance continues from the peeked value.
        assert_eq!(counter.issue_next(today).unwrap().ticket_number, 2);
    }

    #[test]
    fn overflow_is_a_typed_error() {
        let counter = TicketCounter::new(MemoryStore::new(StateLoad::Present(CounterState {
            last_reset_date: date("2024-05-01"),
            current_number: u32::MAX,
        })));

        let err = counter.issue_next(date("2024-05-01")).unwrap_err();
        assert!(matches!(err, CounterError::Overflow));
    }

    #[test]
    fn failed_save_aborts_the_issuance() {
        let store = MemoryStore::new(StateLoad::Absent);
        store.fail_saves.store(true, Ordering::Relaxed);
        let counter = TicketCounter::new(store);

        let err = counter.issue_next(date("2024-05-01")).unwrap_err();
        assert!(matches!(
            err,
            CounterError::Store(crate::contracts::StoreError::WriteFailed(_))
        ));
    }
}
