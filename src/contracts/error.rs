use std::sync::{MutexGuard, PoisonError};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TicketdError {
    #[error("Counter error: {0}")]
    Counter(#[from] CounterError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Extension trait for converting lock errors to CounterError.
pub trait LockResultExt<T> {
    /// Converts a lock error to a CounterError.
    fn map_lock_err(self) -> Result<T, CounterError>;
}

impl<'a, T> LockResultExt<MutexGuard<'a, T>>
    for Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>
{
    #[inline]
    fn map_lock_err(self) -> Result<MutexGuard<'a, T>, CounterError> {
        self.map_err(|e| CounterError::LockPoisoned(e.to_string()))
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid state path: {0}")]
    InvalidPath(String),

    #[error("Failed to read state: {0}")]
    ReadFailed(String),

    #[error("Failed to write state: {0}")]
    WriteFailed(String),
}

#[derive(Error, Debug)]
pub enum CounterError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Ticket number overflow")]
    Overflow,
}
