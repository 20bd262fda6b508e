use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: holds successfully placed.
pub const HOLDS_PLACED_TOTAL: &str = "slotwise_holds_placed_total";

/// Counter: hold attempts rejected with a conflict.
pub const HOLD_CONFLICTS_TOTAL: &str = "slotwise_hold_conflicts_total";

/// Counter: holds confirmed into bookings.
pub const HOLDS_CONFIRMED_TOTAL: &str = "slotwise_holds_confirmed_total";

/// Counter: bookings cancelled (pending or confirmed).
pub const BOOKINGS_CANCELLED_TOTAL: &str = "slotwise_bookings_cancelled_total";

/// Counter: availability listings served.
pub const SLOT_QUERIES_TOTAL: &str = "slotwise_slot_queries_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Counter: lapsed holds transitioned to expired by the sweeper.
pub const HOLDS_EXPIRED_TOTAL: &str = "slotwise_holds_expired_total";

/// Counter: sweep cycles run.
pub const SWEEP_RUNS_TOTAL: &str = "slotwise_sweep_runs_total";

/// Histogram: journal group-commit flush duration in seconds.
pub const JOURNAL_FLUSH_DURATION_SECONDS: &str = "slotwise_journal_flush_duration_seconds";

/// Histogram: journal group-commit batch size (events per flush).
pub const JOURNAL_FLUSH_BATCH_SIZE: &str = "slotwise_journal_flush_batch_size";

/// Install the Prometheus metrics exporter on the given port. No-op if
/// `port` is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
