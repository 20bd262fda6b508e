use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use ulid::Ulid;

use slotwise::calendar::StaticCalendar;
use slotwise::catalog::StaticCatalog;
use slotwise::clock::SystemClock;
use slotwise::config::EngineConfig;
use slotwise::engine::{BookingError, Engine};
use slotwise::model::{BookableRef, HoldRequest};
use slotwise::notify::NotifyHub;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

fn build_engine() -> Arc<Engine> {
    let dir = std::env::temp_dir().join("slotwise_bench");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("bench_{}.journal", Ulid::new()));
    Arc::new(
        Engine::new(
            path,
            Arc::new(StaticCalendar::new()),
            Arc::new(StaticCatalog::new()),
            Arc::new(NotifyHub::new()),
            Arc::new(SystemClock),
            EngineConfig::default(),
        )
        .unwrap(),
    )
}

/// First 5-minute boundary at least an hour from now — keeps every
/// benchmark start time aligned and in the future.
fn base_start() -> DateTime<Utc> {
    let secs = Utc::now().timestamp() + 3600;
    DateTime::from_timestamp(secs - secs % 300 + 300, 0).unwrap()
}

fn request(consultant_id: Ulid, start_at: DateTime<Utc>) -> HoldRequest {
    HoldRequest {
        client_id: Ulid::new(),
        consultant_id,
        bookable: BookableRef::Consultant(consultant_id),
        start_at,
        duration_minutes: 60,
        buffer_after_minutes: 0,
    }
}

async fn phase1_sequential(engine: &Arc<Engine>) {
    let cid = Ulid::new();
    let base = base_start();

    let n = 2000;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();

    for i in 0..n {
        let slot = base + chrono::Duration::hours(i as i64);
        let t = Instant::now();
        engine.create_pending(request(cid, slot)).await.unwrap();
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} holds in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("hold latency", &mut latencies);
}

async fn phase2_fanout(engine: &Arc<Engine>) {
    let n_consultants = 10;
    let n_per_consultant = 200;
    let base = base_start();

    let start = Instant::now();
    let mut handles = Vec::new();

    for _ in 0..n_consultants {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let cid = Ulid::new();
            for i in 0..n_per_consultant {
                let slot = base + chrono::Duration::hours(i as i64);
                engine.create_pending(request(cid, slot)).await.unwrap();
            }
        }));
    }

    for h in handles {
        h.await.unwrap();
    }

    let elapsed = start.elapsed();
    let total = n_consultants * n_per_consultant;
    let ops = total as f64 / elapsed.as_secs_f64();
    println!(
        "  {n_consultants} consultants x {n_per_consultant} holds = {total} total in {:.2}s = {ops:.0} ops/sec",
        elapsed.as_secs_f64()
    );
}

async fn phase3_contended_slot(engine: &Arc<Engine>) {
    let n_slots = 100;
    let n_rivals = 8;
    let cid = Ulid::new();
    let base = base_start();

    let start = Instant::now();
    let mut total_ok = 0usize;
    let mut total_conflicts = 0usize;

    for i in 0..n_slots {
        let slot = base + chrono::Duration::hours(i as i64);
        let mut handles = Vec::new();
        for _ in 0..n_rivals {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.create_pending(request(cid, slot)).await
            }));
        }
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => total_ok += 1,
                Err(BookingError::Conflict(_)) => total_conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
    }

    let elapsed = start.elapsed();
    assert_eq!(total_ok, n_slots, "exactly one rival must win each slot");
    assert_eq!(total_conflicts, n_slots * (n_rivals - 1));
    println!(
        "  {n_slots} slots x {n_rivals} rivals in {:.2}s: {total_ok} wins, {total_conflicts} conflicts (invariant held)",
        elapsed.as_secs_f64()
    );
}

async fn phase4_reads_under_write_load(engine: &Arc<Engine>) {
    let cid = Ulid::new();
    let base = base_start();

    // Pre-fill a schedule worth scanning.
    for i in 0..500 {
        let slot = base + chrono::Duration::hours(i as i64);
        engine.create_pending(request(cid, slot)).await.unwrap();
    }

    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let writer = {
        let engine = engine.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            let mut i: i64 = 500;
            while !stop.load(std::sync::atomic::Ordering::Relaxed) {
                let slot = base + chrono::Duration::hours(i);
                let _ = engine.create_pending(request(cid, slot)).await;
                i += 1;
            }
        })
    };

    let n_readers = 8;
    let reads_per_reader = 500;
    let mut handles = Vec::new();
    for _ in 0..n_readers {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let mut latencies = Vec::with_capacity(reads_per_reader);
            for i in 0..reads_per_reader {
                let from = base + chrono::Duration::hours((i % 400) as i64);
                let t = Instant::now();
                let _ = engine
                    .find_blocking(cid, from, from + chrono::Duration::hours(24), None)
                    .await;
                latencies.push(t.elapsed());
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for h in handles {
        all_latencies.extend(h.await.unwrap());
    }

    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    let _ = writer.await;

    print_latency("blocking-overlap query", &mut all_latencies);
}

#[tokio::main]
async fn main() {
    println!("=== slotwise contention benchmark ===\n");

    println!("[phase 1] sequential hold throughput");
    phase1_sequential(&build_engine()).await;

    println!("\n[phase 2] fan-out across consultants");
    phase2_fanout(&build_engine()).await;

    println!("\n[phase 3] contended slot — one winner per slot");
    phase3_contended_slot(&build_engine()).await;

    println!("\n[phase 4] read latency under write load");
    phase4_reads_under_write_load(&build_engine()).await;

    println!("\n=== benchmark complete ===");
}
