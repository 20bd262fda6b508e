//! Hard bounds protecting the engine from absurd inputs. Tunable business
//! values (hold lifetime, step, lead time) live in `config` instead.

/// Shortest bookable session.
pub const MIN_DURATION_MINUTES: u32 = 5;

/// Longest bookable session (a full working day).
pub const MAX_DURATION_MINUTES: u32 = 8 * 60;

/// Largest trailing buffer accepted on a reservation request.
pub const MAX_BUFFER_MINUTES: u32 = 4 * 60;

/// Cap on retained booking rows per consultant (terminal rows included —
/// nothing is hard-deleted).
pub const MAX_BOOKINGS_PER_CONSULTANT: usize = 50_000;

/// How far into the future a slot may be requested or listed.
pub const MAX_HORIZON_DAYS: i64 = 365;

pub const MAX_CANCEL_REASON_LEN: usize = 512;

/// Journal append retries before the failure surfaces as a storage error.
pub const JOURNAL_RETRY_ATTEMPTS: u32 = 3;

/// Base backoff between journal retries; doubles per attempt.
pub const JOURNAL_RETRY_BACKOFF_MS: u64 = 50;
