use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,
    degraded_extractions: AtomicUsize,

    // Timing (in microseconds)
    total_ocr_time_us: AtomicU64,
    total_llm_time_us: AtomicU64,

    // Counts
    ocr_runs: AtomicUsize,
    llm_calls: AtomicUsize,
    total_pages_processed: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            failed_requests: AtomicUsize::new(0),
            degraded_extractions: AtomicUsize::new(0),
            total_ocr_time_us: AtomicU64::new(0),
            total_llm_time_us: AtomicU64::new(0),
            ocr_runs: AtomicUsize::new(0),
            llm_calls: AtomicUsize::new(0),
            total_pages_processed: AtomicUsize::new(0),
        })
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_ocr(&self, duration: Duration, pages: usize) {
        self.total_ocr_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.ocr_runs.fetch_add(1, Ordering::Relaxed);
        self.total_pages_processed.fetch_add(pages, Ordering::Relaxed);
    }

    /// `degraded` marks a call whose answer was replaced by the AI-error record.
    pub fn record_llm(&self, duration: Duration, degraded: bool) {
        self.total_llm_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.llm_calls.fetch_add(1, Ordering::Relaxed);
        if degraded {
            self.degraded_extractions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            degraded_extractions: self.degraded_extractions.load(Ordering::Relaxed),
            avg_ocr_time_ms: self.avg_time_ms(&self.total_ocr_time_us, &self.ocr_runs),
            avg_llm_time_ms: self.avg_time_ms(&self.total_llm_time_us, &self.llm_calls),
            total_pages_processed: self.total_pages_processed.load(Ordering::Relaxed),
        }
    }

    fn avg_time_ms(&self, total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
        let total = total_us.load(Ordering::Relaxed) as f64;
        let cnt = count.load(Ordering::Relaxed) as f64;
        if cnt > 0.0 {
            total / cnt / 1000.0 // Convert to ms
        } else {
            0.0
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub degraded_extractions: usize,
    pub avg_ocr_time_ms: f64,
    pub avg_llm_time_ms: f64,
    pub total_pages_processed: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_averages() {
        let metrics = Metrics::new();
        metrics.record_request(true);
        metrics.record_request(false);
        metrics.record_ocr(Duration::from_millis(30), 2);
        metrics.record_ocr(Duration::from_millis(10), 1);
        metrics.record_llm(Duration::from_millis(500), true);

        let snapshot = metrics.snapshot();

        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.successful_requests, 1);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.degraded_extractions, 1);
        assert_eq!(snapshot.total_pages_processed, 3);
        assert!((snapshot.avg_ocr_time_ms - 20.0).abs() < 1e-9);
        assert!((snapshot.avg_llm_time_ms - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.avg_ocr_time_ms, 0.0);
        assert_eq!(snapshot.avg_llm_time_ms, 0.0);
    }
}
