mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;
mod slots;

pub use error::BookingError;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};
use ulid::Ulid;

use crate::calendar::CalendarSource;
use crate::catalog::BookableCatalog;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::journal::Journal;
use crate::limits::{JOURNAL_RETRY_ATTEMPTS, JOURNAL_RETRY_BACKOFF_MS};
use crate::model::*;
use crate::notify::NotifyHub;

pub type SharedSchedule = Arc<RwLock<ConsultantSchedule>>;

// ── Group-commit journal channel ─────────────────────────

pub(super) enum JournalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the journal and batches appends for group
/// commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond Ok to all senders.
async fn journal_writer_loop(mut journal: Journal, mut rx: mpsc::Receiver<JournalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            JournalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(JournalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            flush_and_respond(&mut journal, &mut batch);
                            handle_non_append(&mut journal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut journal, &mut batch);
                }
            }
            other => handle_non_append(&mut journal, other),
        }
    }
}

fn flush_and_respond(
    journal: &mut Journal,
    batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>,
) {
    metrics::histogram!(crate::observability::JOURNAL_FLUSH_BATCH_SIZE)
        .record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(journal, batch);
    metrics::histogram!(crate::observability::JOURNAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());

    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(
    journal: &mut Journal,
    batch: &[(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = journal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = journal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn handle_non_append(journal: &mut Journal, cmd: JournalCommand) {
    match cmd {
        JournalCommand::Compact { events, response } => {
            let result = Journal::write_compact_file(journal.path(), &events)
                .and_then(|()| journal.swap_compact_file());
            let _ = response.send(result);
        }
        JournalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(journal.appends_since_compact());
        }
        JournalCommand::Append { .. } => unreachable!(),
    }
}

/// The reservation engine: one logical lock per consultant, an append-only
/// journal as the source of truth on disk, and lifecycle events broadcast
/// to whoever subscribes.
pub struct Engine {
    /// consultant id → that consultant's booking rows
    pub(super) state: DashMap<Ulid, SharedSchedule>,
    /// Reverse lookup: booking id → consultant id
    pub(super) bookings: DashMap<Ulid, Ulid>,
    pub(super) journal_tx: mpsc::Sender<JournalCommand>,
    pub notify: Arc<NotifyHub>,
    pub(super) calendar: Arc<dyn CalendarSource>,
    pub(super) catalog: Arc<dyn BookableCatalog>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: EngineConfig,
}

/// Apply an event directly to a schedule (no locking — caller holds the
/// write guard). Transitions trust the event: validation happened before
/// the event was journaled.
fn apply_to_schedule(
    schedule: &mut ConsultantSchedule,
    event: &Event,
    index: &DashMap<Ulid, Ulid>,
) {
    match event {
        Event::HoldPlaced { booking } | Event::BookingSnapshot { booking } => {
            index.insert(booking.id, booking.consultant_id);
            schedule.insert_booking(booking.clone());
        }
        Event::HoldConfirmed { id, .. } => {
            if let Some(b) = schedule.get_mut(*id) {
                b.status = BookingStatus::Confirmed;
            }
        }
        Event::HoldExpired { id, .. } => {
            if let Some(b) = schedule.get_mut(*id) {
                b.status = BookingStatus::Expired;
            }
        }
        Event::BookingCancelled {
            id, at, by, reason, ..
        } => {
            if let Some(b) = schedule.get_mut(*id) {
                b.status = BookingStatus::Cancelled {
                    at: *at,
                    by: *by,
                    reason: reason.clone(),
                };
            }
        }
        Event::BookingCompleted { id, .. } => {
            if let Some(b) = schedule.get_mut(*id) {
                b.status = BookingStatus::Completed;
            }
        }
    }
}

impl Engine {
    pub fn new(
        journal_path: PathBuf,
        calendar: Arc<dyn CalendarSource>,
        catalog: Arc<dyn BookableCatalog>,
        notify: Arc<NotifyHub>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> io::Result<Self> {
        let events = Journal::replay(&journal_path)?;
        let journal = Journal::open(&journal_path)?;
        let (journal_tx, journal_rx) = mpsc::channel(4096);
        tokio::spawn(journal_writer_loop(journal, journal_rx));

        let engine = Self {
            state: DashMap::new(),
            bookings: DashMap::new(),
            journal_tx,
            notify,
            calendar,
            catalog,
            clock,
            config,
        };

        // Replay events — we're the sole owner of these Arcs, so try_write
        // always succeeds instantly (no contention). Never use blocking_write
        // here because this may run inside an async context.
        for event in &events {
            let schedule = engine.schedule(event.consultant_id());
            let mut guard = schedule.try_write().expect("replay: uncontended write");
            apply_to_schedule(&mut guard, event, &engine.bookings);
        }

        Ok(engine)
    }

    /// The consultant's schedule, created lazily on first touch. Consultant
    /// existence is the calendar collaborator's concern, not ours.
    pub(super) fn schedule(&self, consultant_id: Ulid) -> SharedSchedule {
        self.state
            .entry(consultant_id)
            .or_insert_with(|| Arc::new(RwLock::new(ConsultantSchedule::new(consultant_id))))
            .clone()
    }

    pub fn consultant_for_booking(&self, booking_id: &Ulid) -> Option<Ulid> {
        self.bookings.get(booking_id).map(|e| *e.value())
    }

    /// Write an event to the journal via the background group-commit
    /// writer. I/O failures are retried with backoff — they carry no
    /// business decision — before surfacing as `Storage`.
    async fn journal_append(&self, event: &Event) -> Result<(), BookingError> {
        let mut last_err = String::new();
        for attempt in 0..JOURNAL_RETRY_ATTEMPTS {
            if attempt > 0 {
                let backoff = JOURNAL_RETRY_BACKOFF_MS << (attempt - 1);
                tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
            }
            let (tx, rx) = oneshot::channel();
            self.journal_tx
                .send(JournalCommand::Append {
                    event: event.clone(),
                    response: tx,
                })
                .await
                .map_err(|_| BookingError::Storage("journal writer shut down".into()))?;
            match rx.await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => {
                    tracing::warn!("journal append failed (attempt {}): {e}", attempt + 1);
                    last_err = e.to_string();
                }
                Err(_) => {
                    return Err(BookingError::Storage("journal writer dropped response".into()));
                }
            }
        }
        Err(BookingError::Storage(last_err))
    }

    /// Journal-append + apply + notify in one call, all under the caller's
    /// write guard.
    pub(super) async fn persist_and_apply(
        &self,
        consultant_id: Ulid,
        schedule: &mut ConsultantSchedule,
        event: &Event,
    ) -> Result<(), BookingError> {
        self.journal_append(event).await?;
        apply_to_schedule(schedule, event, &self.bookings);
        self.notify.send(consultant_id, event);
        Ok(())
    }

    /// Lookup booking → consultant, acquire the schedule's write guard.
    pub(super) async fn resolve_booking_write(
        &self,
        booking_id: &Ulid,
    ) -> Result<(Ulid, tokio::sync::OwnedRwLockWriteGuard<ConsultantSchedule>), BookingError> {
        let consultant_id = self
            .consultant_for_booking(booking_id)
            .ok_or(BookingError::NotFound(*booking_id))?;
        let schedule = self.schedule(consultant_id);
        let guard = schedule.write_owned().await;
        Ok((consultant_id, guard))
    }
}
