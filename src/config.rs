use chrono::Duration;

/// Scheduling knobs. Every value here is a business decision, so none of
/// them may be buried in engine logic as a literal.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Lifetime of a pending hold before it lapses.
    pub hold_minutes: i64,
    /// Stepping granularity for generated candidate slots.
    ///
    /// Intentionally coarser than `start_alignment_minutes`: the UI lists
    /// half-hour slots, but a reservation request is accepted on any
    /// 5-minute boundary. Keep the two independent.
    pub slot_step_minutes: u32,
    /// Alignment granularity a requested start time must fall on.
    pub start_alignment_minutes: u32,
    /// Minimum lead time between "now" and a bookable start.
    pub min_lead_minutes: i64,
    /// Expiry sweeper cadence.
    pub sweep_interval_secs: u64,
    /// Journal appends between compactions.
    pub compact_threshold: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hold_minutes: 15,
            slot_step_minutes: 30,
            start_alignment_minutes: 5,
            min_lead_minutes: 0,
            sweep_interval_secs: 5,
            compact_threshold: 1000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl EngineConfig {
    /// Load from `SLOTWISE_*` environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            hold_minutes: env_parse("SLOTWISE_HOLD_MINUTES", d.hold_minutes),
            slot_step_minutes: env_parse("SLOTWISE_SLOT_STEP_MINUTES", d.slot_step_minutes),
            start_alignment_minutes: env_parse(
                "SLOTWISE_START_ALIGNMENT_MINUTES",
                d.start_alignment_minutes,
            ),
            min_lead_minutes: env_parse("SLOTWISE_MIN_LEAD_MINUTES", d.min_lead_minutes),
            sweep_interval_secs: env_parse("SLOTWISE_SWEEP_INTERVAL_SECS", d.sweep_interval_secs),
            compact_threshold: env_parse("SLOTWISE_COMPACT_THRESHOLD", d.compact_threshold),
        }
    }

    pub fn hold_lifetime(&self) -> Duration {
        Duration::minutes(self.hold_minutes)
    }

    pub fn min_lead(&self) -> Duration {
        Duration::minutes(self.min_lead_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.hold_minutes, 15);
        assert_eq!(cfg.slot_step_minutes, 30);
        assert_eq!(cfg.start_alignment_minutes, 5);
        assert_eq!(cfg.hold_lifetime(), Duration::minutes(15));
    }

    #[test]
    fn from_env_falls_back_on_garbage() {
        // Safety: test-local var name, no other test reads it.
        unsafe { std::env::set_var("SLOTWISE_HOLD_MINUTES", "not-a-number") };
        let cfg = EngineConfig::from_env();
        assert_eq!(cfg.hold_minutes, 15);
        unsafe { std::env::remove_var("SLOTWISE_HOLD_MINUTES") };
    }
}
