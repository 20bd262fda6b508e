use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::model::{Booking, Window};

use super::conflict::find_blocking_overlaps;
use super::Engine;

impl Engine {
    pub async fn get_booking(&self, booking_id: Ulid) -> Option<Booking> {
        let consultant_id = self.consultant_for_booking(&booking_id)?;
        let schedule = self.state.get(&consultant_id)?.value().clone();
        let guard = schedule.read().await;
        guard.get(booking_id).cloned()
    }

    /// Every retained row for the consultant, terminal states included,
    /// ordered by start time.
    pub async fn bookings_for(&self, consultant_id: Ulid) -> Vec<Booking> {
        let Some(schedule) = self.state.get(&consultant_id).map(|e| e.value().clone()) else {
            return Vec::new();
        };
        let guard = schedule.read().await;
        guard.bookings.clone()
    }

    /// Plain-read variant of the overlap detector: blocking bookings whose
    /// occupied window overlaps `[start, end)`. Takes no write lock and may
    /// observe slightly stale state; the write path re-validates.
    pub async fn find_blocking(
        &self,
        consultant_id: Ulid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Ulid>,
    ) -> Vec<Booking> {
        let Some(schedule) = self.state.get(&consultant_id).map(|e| e.value().clone()) else {
            return Vec::new();
        };
        let guard = schedule.read().await;
        let window = Window::new(start, end);
        find_blocking_overlaps(&guard, &window, self.clock.now(), exclude)
            .into_iter()
            .cloned()
            .collect()
    }
}
