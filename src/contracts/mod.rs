pub mod clock;
pub mod error;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use error::{CounterError, LockResultExt, StoreError, TicketdError};
pub use store::{CounterState, StateLoad, StateStore};
