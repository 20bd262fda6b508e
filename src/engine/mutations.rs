use chrono::Duration;
use ulid::Ulid;

use crate::limits::{MAX_BOOKINGS_PER_CONSULTANT, MAX_CANCEL_REASON_LEN};
use crate::model::*;

use super::conflict::{check_no_conflict, requested_window, validate_request};
use super::{BookingError, Engine};

impl Engine {
    /// Place a time-limited hold on a slot.
    ///
    /// Validation and insertion happen under the consultant's write guard,
    /// so of N concurrent overlapping requests for the same consultant
    /// exactly one passes the conflict check and inserts; the rest observe
    /// `Conflict`. Requests for different consultants never contend.
    pub async fn create_pending(&self, req: HoldRequest) -> Result<Booking, BookingError> {
        let now = self.clock.now();
        validate_request(
            &self.config,
            now,
            req.start_at,
            req.duration_minutes,
            req.buffer_after_minutes,
        )?;

        let schedule = self.schedule(req.consultant_id);
        let mut guard = schedule.write().await;
        if guard.bookings.len() >= MAX_BOOKINGS_PER_CONSULTANT {
            return Err(BookingError::LimitExceeded(
                "too many bookings for consultant",
            ));
        }

        let window = requested_window(req.start_at, req.duration_minutes, req.buffer_after_minutes);
        match check_no_conflict(&guard, &window, now, None) {
            Ok(()) => {}
            Err(e) => {
                metrics::counter!(crate::observability::HOLD_CONFLICTS_TOTAL).increment(1);
                return Err(e);
            }
        }

        let booking = Booking {
            id: Ulid::new(),
            client_id: req.client_id,
            consultant_id: req.consultant_id,
            bookable: req.bookable,
            start_at: req.start_at,
            end_at: req.start_at + Duration::minutes(req.duration_minutes as i64),
            duration_minutes: req.duration_minutes,
            buffer_after_minutes: req.buffer_after_minutes,
            status: BookingStatus::Pending {
                expires_at: now + self.config.hold_lifetime(),
            },
        };

        let event = Event::HoldPlaced {
            booking: booking.clone(),
        };
        self.persist_and_apply(req.consultant_id, &mut guard, &event)
            .await?;
        metrics::counter!(crate::observability::HOLDS_PLACED_TOTAL).increment(1);
        Ok(booking)
    }

    /// Resolve duration and buffer through the catalog, then place the hold.
    pub async fn create_pending_for(
        &self,
        client_id: Ulid,
        consultant_id: Ulid,
        bookable: BookableRef,
        start_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Booking, BookingError> {
        let details = self
            .catalog
            .resolve(&bookable)
            .await
            .ok_or(BookingError::Validation("unknown bookable"))?;
        self.create_pending(HoldRequest {
            client_id,
            consultant_id,
            bookable,
            start_at,
            duration_minutes: details.duration_minutes,
            buffer_after_minutes: details.buffer_after_minutes,
        })
        .await
    }

    /// Flip a still-valid hold to confirmed.
    ///
    /// The overlap re-check (excluding the hold itself) is normally
    /// redundant — the hold already reserved the window — but guards
    /// against administrative edits to other bookings during the hold.
    pub async fn confirm(&self, booking_id: Ulid, client_id: Ulid) -> Result<Booking, BookingError> {
        let (consultant_id, mut guard) = self.resolve_booking_write(&booking_id).await?;
        let now = self.clock.now();

        let window = {
            let booking = guard.get(booking_id).ok_or(BookingError::NotFound(booking_id))?;
            // Holds are private to their owner.
            if booking.client_id != client_id {
                return Err(BookingError::NotFound(booking_id));
            }
            match booking.status {
                BookingStatus::Pending { expires_at } if expires_at > now => {}
                // A lapsed hold is unconfirmable even before the sweeper
                // gets to it; the row stays pending in storage until swept.
                BookingStatus::Pending { .. } => {
                    return Err(BookingError::InvalidState {
                        id: booking_id,
                        state: "pending with a lapsed hold",
                    });
                }
                ref status => {
                    return Err(BookingError::InvalidState {
                        id: booking_id,
                        state: status.name(),
                    });
                }
            }
            booking.occupied()
        };

        check_no_conflict(&guard, &window, now, Some(booking_id))?;

        let event = Event::HoldConfirmed {
            id: booking_id,
            consultant_id,
        };
        self.persist_and_apply(consultant_id, &mut guard, &event)
            .await?;
        metrics::counter!(crate::observability::HOLDS_CONFIRMED_TOTAL).increment(1);

        Ok(guard.get(booking_id).cloned().expect("booking just confirmed"))
    }

    /// Cancel a pending or confirmed booking. A cancelled pending hold
    /// stops blocking the instant the status flips, independent of its
    /// expiry deadline.
    pub async fn cancel(
        &self,
        booking_id: Ulid,
        actor: CancelActor,
        reason: Option<String>,
    ) -> Result<Booking, BookingError> {
        if let Some(ref r) = reason
            && r.len() > MAX_CANCEL_REASON_LEN
        {
            return Err(BookingError::LimitExceeded("cancel reason too long"));
        }

        let (consultant_id, mut guard) = self.resolve_booking_write(&booking_id).await?;
        let now = self.clock.now();

        {
            let booking = guard.get(booking_id).ok_or(BookingError::NotFound(booking_id))?;
            match booking.status {
                BookingStatus::Pending { .. } | BookingStatus::Confirmed => {}
                ref status => {
                    return Err(BookingError::InvalidState {
                        id: booking_id,
                        state: status.name(),
                    });
                }
            }
        }

        let event = Event::BookingCancelled {
            id: booking_id,
            consultant_id,
            at: now,
            by: actor,
            reason,
        };
        self.persist_and_apply(consultant_id, &mut guard, &event)
            .await?;
        metrics::counter!(crate::observability::BOOKINGS_CANCELLED_TOTAL).increment(1);

        Ok(guard.get(booking_id).cloned().expect("booking just cancelled"))
    }

    /// Mark a confirmed booking as completed (post-session bookkeeping).
    pub async fn complete(&self, booking_id: Ulid) -> Result<Booking, BookingError> {
        let (consultant_id, mut guard) = self.resolve_booking_write(&booking_id).await?;

        {
            let booking = guard.get(booking_id).ok_or(BookingError::NotFound(booking_id))?;
            match booking.status {
                BookingStatus::Confirmed => {}
                ref status => {
                    return Err(BookingError::InvalidState {
                        id: booking_id,
                        state: status.name(),
                    });
                }
            }
        }

        let event = Event::BookingCompleted {
            id: booking_id,
            consultant_id,
        };
        self.persist_and_apply(consultant_id, &mut guard, &event)
            .await?;

        Ok(guard.get(booking_id).cloned().expect("booking just completed"))
    }

    /// Collect (booking, consultant) pairs whose hold has lapsed. Skips
    /// schedules whose lock is contended — the next sweep catches them.
    pub fn collect_lapsed_holds(&self) -> Vec<(Ulid, Ulid)> {
        let now = self.clock.now();
        let mut lapsed = Vec::new();
        for entry in self.state.iter() {
            let schedule = entry.value().clone();
            if let Ok(guard) = schedule.try_read() {
                for booking in &guard.bookings {
                    if let BookingStatus::Pending { expires_at } = booking.status
                        && expires_at <= now
                    {
                        lapsed.push((booking.id, booking.consultant_id));
                    }
                }
            }
        }
        lapsed
    }

    /// Transition every lapsed pending hold to expired. Idempotent: a row
    /// already moved out of pending is simply not matched. Per-row journal
    /// failures are logged and skipped — stale holds self-correct on the
    /// next cycle. Returns the number of holds expired.
    pub async fn sweep_expired(&self) -> usize {
        let lapsed = self.collect_lapsed_holds();
        let mut swept = 0;
        for (booking_id, consultant_id) in lapsed {
            let Some(schedule) = self.state.get(&consultant_id).map(|e| e.value().clone()) else {
                continue;
            };
            let mut guard = schedule.write().await;
            let now = self.clock.now();

            // Re-check under the lock — a concurrent confirm or cancel may
            // have moved the row out of pending.
            let still_lapsed = matches!(
                guard.get(booking_id).map(|b| &b.status),
                Some(BookingStatus::Pending { expires_at }) if *expires_at <= now
            );
            if !still_lapsed {
                continue;
            }

            let event = Event::HoldExpired {
                id: booking_id,
                consultant_id,
            };
            match self
                .persist_and_apply(consultant_id, &mut guard, &event)
                .await
            {
                Ok(()) => swept += 1,
                Err(e) => tracing::warn!("sweep skip {booking_id}: {e}"),
            }
        }
        if swept > 0 {
            metrics::counter!(crate::observability::HOLDS_EXPIRED_TOTAL)
                .increment(swept as u64);
        }
        metrics::counter!(crate::observability::SWEEP_RUNS_TOTAL).increment(1);
        swept
    }

    /// Rewrite the journal as one snapshot event per booking row. The
    /// audit trail of rows survives compaction; only per-row transition
    /// history is folded into the final state.
    pub async fn compact_journal(&self) -> Result<(), BookingError> {
        let mut events = Vec::new();
        for entry in self.state.iter() {
            let schedule = entry.value().clone();
            let guard = schedule.try_read().expect("compact: uncontended read");
            for booking in &guard.bookings {
                events.push(Event::BookingSnapshot {
                    booking: booking.clone(),
                });
            }
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.journal_tx
            .send(super::JournalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| BookingError::Storage("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| BookingError::Storage("journal writer dropped response".into()))?
            .map_err(|e| BookingError::Storage(e.to_string()))
    }

    pub async fn journal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = tokio::sync::oneshot::channel();
        if self
            .journal_tx
            .send(super::JournalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
