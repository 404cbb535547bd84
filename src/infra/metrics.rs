//! Lock-free metrics collection and periodic reporting
//!
//! Held by the caller (CLI, simulator, host service), never by the engine.
//! Counter updates are lock-free; `report()` swaps the periodic counters to
//! get a consistent snapshot.
//!
//! NOTE: Relaxed ordering throughout; these are statistical
//! counters only and must not drive alert decisions.

use crate::domain::types::{AlertDecision, ClearanceReport, Priority, Urgency};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Evaluation latency bucket boundaries (microseconds)
/// Buckets: ≤5, ≤10, ≤20, ≤40, ≤80, ≤160, ≤320, ≤640, ≤1280, ≤2560, >2560
const BUCKET_BOUNDS: [u64; 10] = [5, 10, 20, 40, 80, 160, 320, 640, 1280, 2560];
const NUM_BUCKETS: usize = 11;

/// Upper bound reported for each bucket (last bucket uses 2x the previous bound)
const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
    [5, 10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120];

const NUM_URGENCIES: usize = 4;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets<const N: usize>(buckets: &[AtomicU64; N]) -> [u64; N] {
    std::array::from_fn(|i| buckets[i].swap(0, Ordering::Relaxed))
}

/// Upper bound of the bucket containing the given percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
pub struct Metrics {
    /// Evaluations ever run (monotonic)
    evaluations_total: AtomicU64,
    /// Evaluations since last report (reset on report)
    evaluations_since_report: AtomicU64,
    /// Sum of evaluation latencies in microseconds (reset on report)
    latency_sum_us: AtomicU64,
    /// Max evaluation latency in microseconds (reset on report)
    latency_max_us: AtomicU64,
    /// Evaluation latency histogram (reset on report)
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Alerts fired (monotonic)
    alerts_fired_total: AtomicU64,
    /// Alerts fired per urgency, indexed by `Urgency::index` (monotonic)
    alerts_by_urgency: [AtomicU64; NUM_URGENCIES],
    /// Clearance rankings computed (monotonic)
    rankings_total: AtomicU64,
    /// CRITICAL recommendations across all rankings (monotonic)
    critical_recommendations_total: AtomicU64,
    /// Message rewrites attempted (monotonic)
    enrichments_total: AtomicU64,
    /// Rewrites that fell back to the template message (monotonic)
    enrichment_fallbacks_total: AtomicU64,
    /// Last report time (only accessed from reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            evaluations_total: AtomicU64::new(0),
            evaluations_since_report: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            alerts_fired_total: AtomicU64::new(0),
            alerts_by_urgency: std::array::from_fn(|_| AtomicU64::new(0)),
            rankings_total: AtomicU64::new(0),
            critical_recommendations_total: AtomicU64::new(0),
            enrichments_total: AtomicU64::new(0),
            enrichment_fallbacks_total: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record one alert evaluation and its outcome
    #[inline]
    pub fn record_evaluation(&self, latency_us: u64, decision: &AlertDecision) {
        self.evaluations_total.fetch_add(1, Ordering::Relaxed);
        self.evaluations_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_us, latency_us);

        if decision.fired {
            self.alerts_fired_total.fetch_add(1, Ordering::Relaxed);
            self.alerts_by_urgency[decision.urgency.index()].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record one clearance ranking
    #[inline]
    pub fn record_ranking(&self, report: &ClearanceReport) {
        self.rankings_total.fetch_add(1, Ordering::Relaxed);
        let critical = report
            .recommendations
            .iter()
            .filter(|r| r.priority == Priority::Critical)
            .count() as u64;
        self.critical_recommendations_total.fetch_add(critical, Ordering::Relaxed);
    }

    /// Record a message rewrite attempt
    #[inline]
    pub fn record_enrichment(&self, fell_back: bool) {
        self.enrichments_total.fetch_add(1, Ordering::Relaxed);
        if fell_back {
            self.enrichment_fallbacks_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn evaluations_total(&self) -> u64 {
        self.evaluations_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn alerts_fired_total(&self) -> u64 {
        self.alerts_fired_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn enrichment_fallbacks_total(&self) -> u64 {
        self.enrichment_fallbacks_total.load(Ordering::Relaxed)
    }

    /// Snapshot and reset the periodic counters
    pub fn report(&self) -> MetricsSummary {
        let evaluations = self.evaluations_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.latency_sum_us.swap(0, Ordering::Relaxed);
        let max_latency = self.latency_max_us.swap(0, Ordering::Relaxed);
        let lat_buckets = swap_buckets(&self.latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let evaluations_per_sec = if elapsed.as_secs_f64() > 0.0 {
            evaluations as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let avg_latency_us = if evaluations > 0 { latency_sum / evaluations } else { 0 };

        MetricsSummary {
            evaluations_total: self.evaluations_total.load(Ordering::Relaxed),
            evaluations_per_sec,
            avg_latency_us,
            max_latency_us: max_latency,
            lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
            alerts_fired_total: self.alerts_fired_total.load(Ordering::Relaxed),
            alerts_by_urgency: std::array::from_fn(|i| {
                self.alerts_by_urgency[i].load(Ordering::Relaxed)
            }),
            rankings_total: self.rankings_total.load(Ordering::Relaxed),
            critical_recommendations_total: self
                .critical_recommendations_total
                .load(Ordering::Relaxed),
            enrichments_total: self.enrichments_total.load(Ordering::Relaxed),
            enrichment_fallbacks_total: self.enrichment_fallbacks_total.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub evaluations_total: u64,
    pub evaluations_per_sec: f64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
    pub lat_p50_us: u64,
    pub lat_p99_us: u64,
    pub alerts_fired_total: u64,
    /// Indexed by `Urgency::index` (CRITICAL, HIGH, MEDIUM, LOW)
    pub alerts_by_urgency: [u64; NUM_URGENCIES],
    pub rankings_total: u64,
    pub critical_recommendations_total: u64,
    pub enrichments_total: u64,
    pub enrichment_fallbacks_total: u64,
}

impl MetricsSummary {
    pub fn alerts_for(&self, urgency: Urgency) -> u64 {
        self.alerts_by_urgency[urgency.index()]
    }

    pub fn log(&self) {
        info!(
            evaluations_total = %self.evaluations_total,
            evaluations_per_sec = format!("{:.1}", self.evaluations_per_sec),
            avg_latency_us = %self.avg_latency_us,
            max_latency_us = %self.max_latency_us,
            p50_us = %self.lat_p50_us,
            p99_us = %self.lat_p99_us,
            alerts_fired = %self.alerts_fired_total,
            critical = %self.alerts_for(Urgency::Critical),
            high = %self.alerts_for(Urgency::High),
            medium = %self.alerts_for(Urgency::Medium),
            rankings = %self.rankings_total,
            enrichment_fallbacks = %self.enrichment_fallbacks_total,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ClearanceRecommendation, Direction, VehicleId};

    fn decision(fired: bool, urgency: Urgency) -> AlertDecision {
        AlertDecision {
            fired,
            direction: if fired { Direction::Left } else { Direction::StayPut },
            urgency,
            distance_meters: 120.0,
            message: String::new(),
            vehicle_id: None,
        }
    }

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(5), 0);
        assert_eq!(bucket_index(6), 1);
        assert_eq!(bucket_index(2560), 9);
        assert_eq!(bucket_index(100_000), 10);
    }

    #[test]
    fn test_record_evaluation() {
        let metrics = Metrics::new();

        metrics.record_evaluation(4, &decision(true, Urgency::High));
        metrics.record_evaluation(8, &decision(false, Urgency::Low));
        metrics.record_evaluation(30, &decision(true, Urgency::Critical));

        assert_eq!(metrics.evaluations_total(), 3);
        assert_eq!(metrics.alerts_fired_total(), 2);
        assert_eq!(metrics.latency_sum_us.load(Ordering::Relaxed), 42);
    }

    #[test]
    fn test_report_resets_periodic_counters() {
        let metrics = Metrics::new();
        metrics.record_evaluation(10, &decision(true, Urgency::Medium));
        metrics.record_evaluation(20, &decision(true, Urgency::Medium));
        metrics.record_evaluation(30, &decision(false, Urgency::Low));

        let summary = metrics.report();
        assert_eq!(summary.evaluations_total, 3);
        assert_eq!(summary.avg_latency_us, 20);
        assert_eq!(summary.max_latency_us, 30);
        assert_eq!(summary.alerts_for(Urgency::Medium), 2);
        assert_eq!(summary.alerts_for(Urgency::Low), 0);

        assert_eq!(metrics.evaluations_since_report.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.latency_max_us.load(Ordering::Relaxed), 0);

        // Monotonic counters survive the report
        let again = metrics.report();
        assert_eq!(again.evaluations_total, 3);
        assert_eq!(again.avg_latency_us, 0);
    }

    #[test]
    fn test_record_ranking_and_enrichment() {
        let metrics = Metrics::new();
        let report = ClearanceReport {
            recommendations: vec![ClearanceRecommendation {
                subject_route: "Awaiting destination".to_string(),
                action: "Clear all traffic immediately".to_string(),
                reason: "Active SOS alert".to_string(),
                priority: Priority::Critical,
                subject_ids: vec![VehicleId::new("a")],
                subject_label: "a".to_string(),
            }],
            summary: String::new(),
            total_emergency: 1,
            total_sos: 1,
        };
        metrics.record_ranking(&report);
        metrics.record_enrichment(false);
        metrics.record_enrichment(true);

        let summary = metrics.report();
        assert_eq!(summary.rankings_total, 1);
        assert_eq!(summary.critical_recommendations_total, 1);
        assert_eq!(summary.enrichments_total, 2);
        assert_eq!(summary.enrichment_fallbacks_total, 1);
    }

    #[test]
    fn test_percentiles() {
        let mut buckets = [0u64; NUM_BUCKETS];
        buckets[0] = 90;
        buckets[5] = 10;
        assert_eq!(percentile_from_buckets(&buckets, 0.50), 5);
        assert_eq!(percentile_from_buckets(&buckets, 0.99), 160);
        assert_eq!(percentile_from_buckets(&[0; NUM_BUCKETS], 0.99), 0);
    }
}
