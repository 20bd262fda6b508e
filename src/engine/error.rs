use ulid::Ulid;

/// Domain errors are expected outcomes and are returned, never logged as
/// failures. `Storage` is the one infrastructure class — it is retried a
/// bounded number of times inside the engine before surfacing.
#[derive(Debug)]
pub enum BookingError {
    /// Booking id does not resolve (or the requester may not see it).
    NotFound(Ulid),
    /// Requested window overlaps an existing blocking booking; the id is
    /// the blocking one. Recoverable by picking another slot.
    Conflict(Ulid),
    /// Operation attempted on a booking not in the required state.
    InvalidState { id: Ulid, state: &'static str },
    /// Malformed input: misaligned start, duration out of bounds, start in
    /// the past.
    Validation(&'static str),
    LimitExceeded(&'static str),
    /// Journal I/O failure after retry exhaustion.
    Storage(String),
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::NotFound(id) => write!(f, "booking not found: {id}"),
            BookingError::Conflict(id) => {
                write!(f, "requested window conflicts with booking: {id}")
            }
            BookingError::InvalidState { id, state } => {
                write!(f, "booking {id} is {state}; operation not allowed")
            }
            BookingError::Validation(msg) => write!(f, "invalid request: {msg}"),
            BookingError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            BookingError::Storage(e) => write!(f, "journal error: {e}"),
        }
    }
}

impl std::error::Error for BookingError {}
