//! Read-only port onto the consultant-management collaborator: recurring
//! weekly working hours plus ad-hoc holidays. The engine never writes here.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Weekday};
use dashmap::DashMap;
use ulid::Ulid;

/// Half-open time-of-day range `[start, end)` within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        debug_assert!(start < end, "TimeRange start must be before end");
        Self { start, end }
    }
}

/// One recurring availability range. Multiple non-overlapping ranges per
/// weekday model split shifts; an inactive row is invisible to the engine.
#[derive(Debug, Clone)]
pub struct WorkingHour {
    pub weekday: Weekday,
    pub range: TimeRange,
    pub active: bool,
}

/// A date with no slots at all, whatever the weekly schedule says.
#[derive(Debug, Clone)]
pub struct Holiday {
    pub date: NaiveDate,
    pub label: Option<String>,
}

/// Calendar provider contract. Implementations must return active ranges
/// sorted by start time and non-overlapping within a weekday.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn active_hours(&self, consultant_id: Ulid, weekday: Weekday) -> Vec<TimeRange>;
    async fn is_holiday(&self, consultant_id: Ulid, date: NaiveDate) -> bool;
}

#[derive(Debug, Default)]
struct ConsultantCalendar {
    working_hours: Vec<WorkingHour>,
    holidays: Vec<Holiday>,
}

/// In-memory calendar for tests and embedders without a live calendar
/// service.
#[derive(Default)]
pub struct StaticCalendar {
    entries: DashMap<Ulid, ConsultantCalendar>,
}

impl StaticCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_working_hour(&self, consultant_id: Ulid, hour: WorkingHour) {
        self.entries
            .entry(consultant_id)
            .or_default()
            .working_hours
            .push(hour);
    }

    pub fn add_holiday(&self, consultant_id: Ulid, holiday: Holiday) {
        self.entries
            .entry(consultant_id)
            .or_default()
            .holidays
            .push(holiday);
    }
}

#[async_trait]
impl CalendarSource for StaticCalendar {
    async fn active_hours(&self, consultant_id: Ulid, weekday: Weekday) -> Vec<TimeRange> {
        let Some(cal) = self.entries.get(&consultant_id) else {
            return Vec::new();
        };
        let mut ranges: Vec<TimeRange> = cal
            .working_hours
            .iter()
            .filter(|wh| wh.active && wh.weekday == weekday)
            .map(|wh| wh.range)
            .collect();
        ranges.sort_by_key(|r| r.start);
        ranges
    }

    async fn is_holiday(&self, consultant_id: Ulid, date: NaiveDate) -> bool {
        self.entries
            .get(&consultant_id)
            .is_some_and(|cal| cal.holidays.iter().any(|h| h.date == date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn unknown_consultant_has_no_hours() {
        let cal = StaticCalendar::new();
        assert!(cal.active_hours(Ulid::new(), Weekday::Mon).await.is_empty());
        assert!(!cal.is_holiday(Ulid::new(), "2025-06-02".parse().unwrap()).await);
    }

    #[tokio::test]
    async fn inactive_rows_are_invisible() {
        let cal = StaticCalendar::new();
        let cid = Ulid::new();
        cal.add_working_hour(
            cid,
            WorkingHour {
                weekday: Weekday::Mon,
                range: TimeRange::new(t("10:00:00"), t("12:00:00")),
                active: false,
            },
        );
        assert!(cal.active_hours(cid, Weekday::Mon).await.is_empty());
    }

    #[tokio::test]
    async fn split_shift_sorted_by_start() {
        let cal = StaticCalendar::new();
        let cid = Ulid::new();
        cal.add_working_hour(
            cid,
            WorkingHour {
                weekday: Weekday::Tue,
                range: TimeRange::new(t("14:00:00"), t("18:00:00")),
                active: true,
            },
        );
        cal.add_working_hour(
            cid,
            WorkingHour {
                weekday: Weekday::Tue,
                range: TimeRange::new(t("09:00:00"), t("12:00:00")),
                active: true,
            },
        );

        let ranges = cal.active_hours(cid, Weekday::Tue).await;
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].start, t("09:00:00"));
        assert_eq!(ranges[1].start, t("14:00:00"));

        // Other weekdays are unaffected.
        assert!(cal.active_hours(cid, Weekday::Wed).await.is_empty());
    }

    #[tokio::test]
    async fn holiday_lookup() {
        let cal = StaticCalendar::new();
        let cid = Ulid::new();
        cal.add_holiday(
            cid,
            Holiday {
                date: "2025-12-25".parse().unwrap(),
                label: Some("closed".into()),
            },
        );
        assert!(cal.is_holiday(cid, "2025-12-25".parse().unwrap()).await);
        assert!(!cal.is_holiday(cid, "2025-12-26".parse().unwrap()).await);
    }
}
