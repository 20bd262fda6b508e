use chrono::{DateTime, Duration, Utc};
use ulid::Ulid;

use crate::config::EngineConfig;
use crate::limits::*;
use crate::model::{Booking, ConsultantSchedule, Window};

use super::BookingError;

/// Reject malformed reservation requests before any lock is taken.
pub(crate) fn validate_request(
    config: &EngineConfig,
    now: DateTime<Utc>,
    start_at: DateTime<Utc>,
    duration_minutes: u32,
    buffer_minutes: u32,
) -> Result<(), BookingError> {
    validate_bounds(duration_minutes, buffer_minutes)?;

    let align_secs = config.start_alignment_minutes as i64 * 60;
    if start_at.timestamp() % align_secs != 0 || start_at.timestamp_subsec_nanos() != 0 {
        return Err(BookingError::Validation(
            "start time not aligned to the booking granularity",
        ));
    }
    if start_at < now + config.min_lead() {
        return Err(BookingError::Validation(
            "start time is in the past or within the minimum lead time",
        ));
    }
    if start_at > now + Duration::days(MAX_HORIZON_DAYS) {
        return Err(BookingError::LimitExceeded("start too far in the future"));
    }
    Ok(())
}

/// Duration/buffer bounds shared by the write path and the read-only
/// availability listing.
pub(crate) fn validate_bounds(
    duration_minutes: u32,
    buffer_minutes: u32,
) -> Result<(), BookingError> {
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
        return Err(BookingError::Validation("duration out of bounds"));
    }
    if buffer_minutes > MAX_BUFFER_MINUTES {
        return Err(BookingError::Validation("buffer out of bounds"));
    }
    Ok(())
}

/// The occupied window a request would claim: `[start, start+duration+buffer)`.
pub(crate) fn requested_window(
    start_at: DateTime<Utc>,
    duration_minutes: u32,
    buffer_minutes: u32,
) -> Window {
    Window::new(
        start_at,
        start_at + Duration::minutes((duration_minutes + buffer_minutes) as i64),
    )
}

/// All blocking bookings whose occupied window overlaps `window`.
///
/// Caller decides the locking discipline: the availability listing calls
/// this under the schedule's read guard, the write path under the write
/// guard it already holds — which is what makes check-then-insert atomic
/// per consultant.
pub(crate) fn find_blocking_overlaps<'a>(
    schedule: &'a ConsultantSchedule,
    window: &Window,
    now: DateTime<Utc>,
    exclude: Option<Ulid>,
) -> Vec<&'a Booking> {
    schedule
        .overlapping(window)
        .filter(|b| exclude != Some(b.id))
        .filter(|b| b.is_blocking(now))
        .filter(|b| b.occupied().overlaps(window))
        .collect()
}

/// First conflict wins: returns `Conflict` carrying the blocking booking's
/// id, or `Ok` when the window is clear.
pub(crate) fn check_no_conflict(
    schedule: &ConsultantSchedule,
    window: &Window,
    now: DateTime<Utc>,
    exclude: Option<Ulid>,
) -> Result<(), BookingError> {
    match find_blocking_overlaps(schedule, window, now, exclude).first() {
        Some(blocking) => Err(BookingError::Conflict(blocking.id)),
        None => Ok(()),
    }
}
