use chrono::{Datelike, NaiveDate};
use ulid::Ulid;

use crate::model::{BookableRef, Candidate, Slot, SlotReason, Window};

use super::conflict::{find_blocking_overlaps, validate_bounds};
use super::slots::enumerate_within;
use super::{BookingError, Engine};

impl Engine {
    /// Candidate start times for the date: working-hour ranges stepped at
    /// the configured granularity, minus holidays and past times.
    /// Recomputed per call — purely a function of inputs and the clock.
    pub async fn generate_candidates(
        &self,
        consultant_id: Ulid,
        date: NaiveDate,
        duration_minutes: u32,
        buffer_minutes: u32,
    ) -> Result<Vec<Candidate>, BookingError> {
        validate_bounds(duration_minutes, buffer_minutes)?;

        if self.calendar.is_holiday(consultant_id, date).await {
            return Ok(Vec::new());
        }
        let ranges = self
            .calendar
            .active_hours(consultant_id, date.weekday())
            .await;

        let cutoff = self.clock.now() + self.config.min_lead();
        Ok(enumerate_within(
            &ranges,
            date,
            duration_minutes,
            buffer_minutes,
            self.config.slot_step_minutes,
        )
        .into_iter()
        .filter(|c| c.start_at >= cutoff)
        .collect())
    }

    /// Client-facing availability listing for a date. Unlike
    /// `generate_candidates`, past candidates are kept and annotated so
    /// today's earlier slots render greyed out instead of vanishing.
    ///
    /// Pure read: no locks beyond the schedule's read guard, no mutation,
    /// and possibly slightly stale — the write path re-validates.
    pub async fn list_slots(
        &self,
        consultant_id: Ulid,
        date: NaiveDate,
        duration_minutes: u32,
        buffer_minutes: u32,
    ) -> Result<Vec<Slot>, BookingError> {
        validate_bounds(duration_minutes, buffer_minutes)?;
        metrics::counter!(crate::observability::SLOT_QUERIES_TOTAL).increment(1);

        if self.calendar.is_holiday(consultant_id, date).await {
            return Ok(Vec::new());
        }
        let ranges = self
            .calendar
            .active_hours(consultant_id, date.weekday())
            .await;
        let candidates = enumerate_within(
            &ranges,
            date,
            duration_minutes,
            buffer_minutes,
            self.config.slot_step_minutes,
        );
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let cutoff = now + self.config.min_lead();
        let schedule = self.state.get(&consultant_id).map(|e| e.value().clone());
        let guard = match &schedule {
            Some(s) => Some(s.read().await),
            None => None,
        };

        let buffer = chrono::Duration::minutes(buffer_minutes as i64);
        let slots = candidates
            .into_iter()
            .map(|c| {
                let reason = if c.start_at < cutoff {
                    Some(SlotReason::Past)
                } else {
                    let window = Window::new(c.start_at, c.end_at + buffer);
                    let booked = guard
                        .as_ref()
                        .is_some_and(|g| !find_blocking_overlaps(g, &window, now, None).is_empty());
                    booked.then_some(SlotReason::Booked)
                };
                Slot {
                    start_at: c.start_at,
                    end_at: c.end_at,
                    available: reason.is_none(),
                    reason,
                }
            })
            .collect();
        Ok(slots)
    }

    /// Resolve duration and buffer through the catalog, then list slots.
    pub async fn list_slots_for(
        &self,
        consultant_id: Ulid,
        date: NaiveDate,
        bookable: BookableRef,
    ) -> Result<Vec<Slot>, BookingError> {
        let details = self
            .catalog
            .resolve(&bookable)
            .await
            .ok_or(BookingError::Validation("unknown bookable"))?;
        self.list_slots(
            consultant_id,
            date,
            details.duration_minutes,
            details.buffer_after_minutes,
        )
        .await
    }
}
