use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start < end, "Window start must be before end");
        Self { start, end }
    }

    /// Half-open overlap test: windows that exactly touch do not overlap.
    pub fn overlaps(&self, other: &Window) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// What is being booked — the consultant's own time, or one of the services
/// they offer. Duration and price for the `Service` variant are resolved by
/// the external catalog collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookableRef {
    Consultant(Ulid),
    Service(Ulid),
}

/// Who cancelled a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelActor {
    Client(Ulid),
    Admin(Ulid),
}

/// Booking lifecycle. The hold deadline lives inside `Pending`, so
/// "expires_at is set iff the booking is pending" holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending { expires_at: DateTime<Utc> },
    Confirmed,
    Cancelled {
        at: DateTime<Utc>,
        by: CancelActor,
        reason: Option<String>,
    },
    Completed,
    Expired,
}

impl BookingStatus {
    pub fn name(&self) -> &'static str {
        match self {
            BookingStatus::Pending { .. } => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled { .. } => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::Expired => "expired",
        }
    }

    /// Terminal states never transition further.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Cancelled { .. } | BookingStatus::Completed | BookingStatus::Expired
        )
    }
}

/// One reservation attempt. Rows are retained in every terminal state for
/// audit — nothing is hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub client_id: Ulid,
    pub consultant_id: Ulid,
    pub bookable: BookableRef,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Redundant with `end_at - start_at`; kept for display.
    pub duration_minutes: u32,
    /// Trailing time appended after `end_at`, occupied but not bookable.
    pub buffer_after_minutes: u32,
    pub status: BookingStatus,
}

impl Booking {
    /// The true exclusivity interval: `[start_at, end_at + buffer)`.
    pub fn occupied(&self) -> Window {
        Window::new(
            self.start_at,
            self.end_at + Duration::minutes(self.buffer_after_minutes as i64),
        )
    }

    /// A booking occupies the calendar iff confirmed, or pending with a
    /// still-valid hold. Terminal rows never block, whatever their times.
    pub fn is_blocking(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            BookingStatus::Confirmed => true,
            BookingStatus::Pending { expires_at } => expires_at > now,
            _ => false,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            BookingStatus::Pending { expires_at } => Some(expires_at),
            _ => None,
        }
    }
}

/// Inputs for placing a hold. Duration and buffer are explicit; use
/// `Engine::create_pending_for` to resolve them through the catalog instead.
#[derive(Debug, Clone)]
pub struct HoldRequest {
    pub client_id: Ulid,
    pub consultant_id: Ulid,
    pub bookable: BookableRef,
    pub start_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub buffer_after_minutes: u32,
}

/// All booking rows for one consultant, sorted by `start_at`. The engine
/// wraps each schedule in its own `RwLock`; holding the write guard is what
/// serializes concurrent holds for that consultant.
#[derive(Debug, Clone)]
pub struct ConsultantSchedule {
    pub consultant_id: Ulid,
    pub bookings: Vec<Booking>,
}

impl ConsultantSchedule {
    pub fn new(consultant_id: Ulid) -> Self {
        Self {
            consultant_id,
            bookings: Vec::new(),
        }
    }

    /// Insert keeping sort order by start_at.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.start_at, |b| b.start_at)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn get(&self, id: Ulid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: Ulid) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    /// Bookings whose occupied window overlaps the query window, blocking or
    /// not. Binary search skips everything starting at or after `query.end`;
    /// the buffer only ever extends a window to the right, so the bound is
    /// safe.
    pub fn overlapping(&self, query: &Window) -> impl Iterator<Item = &Booking> {
        let right_bound = self.bookings.partition_point(|b| b.start_at < query.end);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.occupied().end > query.start)
    }
}

/// Journal record format — flat lifecycle events, no nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    HoldPlaced {
        booking: Booking,
    },
    HoldConfirmed {
        id: Ulid,
        consultant_id: Ulid,
    },
    HoldExpired {
        id: Ulid,
        consultant_id: Ulid,
    },
    BookingCancelled {
        id: Ulid,
        consultant_id: Ulid,
        at: DateTime<Utc>,
        by: CancelActor,
        reason: Option<String>,
    },
    BookingCompleted {
        id: Ulid,
        consultant_id: Ulid,
    },
    /// Compaction record: the booking's full current row.
    BookingSnapshot {
        booking: Booking,
    },
}

impl Event {
    pub fn consultant_id(&self) -> Ulid {
        match self {
            Event::HoldPlaced { booking } | Event::BookingSnapshot { booking } => {
                booking.consultant_id
            }
            Event::HoldConfirmed { consultant_id, .. }
            | Event::HoldExpired { consultant_id, .. }
            | Event::BookingCancelled { consultant_id, .. }
            | Event::BookingCompleted { consultant_id, .. } => *consultant_id,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

/// A generated, not-yet-validated potential start time. `end_at` excludes
/// the trailing buffer; the buffer must still fit inside the working-hour
/// range for the candidate to be emitted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// Why a listed slot cannot be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotReason {
    Past,
    Booked,
}

/// One entry in the client-facing availability listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub available: bool,
    pub reason: Option<SlotReason>,
}
