use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::calendar::TimeRange;
use crate::model::Candidate;

/// Enumerate every candidate start time inside the given working-hour
/// ranges for `date`, stepping from each range's start in `step_minutes`
/// increments while `start + duration + buffer` still fits in the range.
///
/// Pure function of its inputs — no clock, no filtering of past times.
/// The availability facade annotates past candidates instead of hiding
/// them; `Engine::generate_candidates` applies the past-time cutoff.
pub(crate) fn enumerate_within(
    ranges: &[TimeRange],
    date: NaiveDate,
    duration_minutes: u32,
    buffer_minutes: u32,
    step_minutes: u32,
) -> Vec<Candidate> {
    let duration = Duration::minutes(duration_minutes as i64);
    let occupied = Duration::minutes((duration_minutes + buffer_minutes) as i64);
    let step = Duration::minutes(step_minutes as i64);

    let mut candidates = Vec::new();
    for range in ranges {
        let range_end: DateTime<Utc> = date.and_time(range.end).and_utc();
        let mut start: DateTime<Utc> = date.and_time(range.start).and_utc();
        while start + occupied <= range_end {
            candidates.push(Candidate {
                start_at: start,
                end_at: start + duration,
            });
            start += step;
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn range(start: &str, end: &str) -> TimeRange {
        TimeRange::new(
            start.parse::<NaiveTime>().unwrap(),
            end.parse::<NaiveTime>().unwrap(),
        )
    }

    fn date() -> NaiveDate {
        "2025-06-02".parse().unwrap()
    }

    fn starts(candidates: &[Candidate]) -> Vec<String> {
        candidates
            .iter()
            .map(|c| c.start_at.format("%H:%M").to_string())
            .collect()
    }

    #[test]
    fn two_hour_range_sixty_minute_service() {
        // 10:00–12:00, 60 min, no buffer, 30-minute step:
        // 10:00 ✓  10:30 ✓  11:00 ✓ (ends exactly at 12:00)  11:30 ✗
        let candidates = enumerate_within(&[range("10:00:00", "12:00:00")], date(), 60, 0, 30);
        assert_eq!(starts(&candidates), vec!["10:00", "10:30", "11:00"]);
        assert_eq!(
            candidates[2].end_at,
            date().and_time("12:00:00".parse().unwrap()).and_utc()
        );
    }

    #[test]
    fn buffer_must_fit_inside_the_range() {
        // Same range but a 15-minute buffer: 11:00 + 60 + 15 > 12:00.
        let candidates = enumerate_within(&[range("10:00:00", "12:00:00")], date(), 60, 15, 30);
        assert_eq!(starts(&candidates), vec!["10:00", "10:30"]);
        // end_at excludes the buffer.
        assert_eq!(
            candidates[1].end_at,
            date().and_time("11:30:00".parse().unwrap()).and_utc()
        );
    }

    #[test]
    fn split_shift_enumerates_both_ranges() {
        let candidates = enumerate_within(
            &[range("09:00:00", "10:00:00"), range("14:00:00", "15:30:00")],
            date(),
            60,
            0,
            30,
        );
        assert_eq!(starts(&candidates), vec!["09:00", "14:00", "14:30"]);
    }

    #[test]
    fn service_longer_than_range_yields_nothing() {
        let candidates = enumerate_within(&[range("10:00:00", "11:00:00")], date(), 90, 0, 30);
        assert!(candidates.is_empty());
    }

    #[test]
    fn no_ranges_yields_nothing() {
        assert!(enumerate_within(&[], date(), 60, 0, 30).is_empty());
    }

    #[test]
    fn step_granularity_is_independent_of_alignment() {
        // A 15-minute step triples the density of the default 30.
        let coarse = enumerate_within(&[range("10:00:00", "12:00:00")], date(), 30, 0, 30);
        let fine = enumerate_within(&[range("10:00:00", "12:00:00")], date(), 30, 0, 15);
        assert_eq!(starts(&coarse), vec!["10:00", "10:30", "11:00", "11:30"]);
        assert_eq!(
            starts(&fine),
            vec!["10:00", "10:15", "10:30", "10:45", "11:00", "11:15", "11:30"]
        );
    }
}
