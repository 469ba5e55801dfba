use crate::pool::PoolCounts;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// --- Simple Histogram Implementation ---

/// A basic concurrent histogram storing count and sum.
///
/// Suitable for simple latency tracking without percentile detail. Uses
/// `Relaxed` ordering; strict inter-metric consistency is not required.
#[derive(Debug, Default)]
pub struct SimpleHistogram {
  count: AtomicUsize,
  sum_micros: AtomicUsize,
}

impl SimpleHistogram {
  /// Records a duration observation.
  pub fn record(&self, duration: Duration) {
    self.count.fetch_add(1, Ordering::Relaxed);
    self.sum_micros.fetch_add(
      duration.as_micros().try_into().unwrap_or(usize::MAX),
      Ordering::Relaxed,
    );
  }

  /// Total number of observations recorded.
  pub fn get_count(&self) -> usize {
    self.count.load(Ordering::Relaxed)
  }

  /// Total sum of recorded durations, in microseconds.
  pub fn get_sum_micros(&self) -> usize {
    self.sum_micros.load(Ordering::Relaxed)
  }
}

// --- Main Metrics Struct (Internal State) ---

/// Internal dispatch counters.
///
/// Cloning shares the underlying atomics; the dispatcher core and its
/// in-flight jobs all write to the same set. None of these counters is
/// load-bearing for dispatch semantics; they are an observation hook on
/// top of the logs.
#[derive(Debug, Clone)]
pub struct DispatchMetrics {
  /// Jobs accepted for submission.
  pub jobs_submitted: Arc<AtomicUsize>,
  /// Empty requests rejected by the submission guard.
  pub jobs_rejected: Arc<AtomicUsize>,
  /// Jobs whose handler returned success.
  pub jobs_succeeded: Arc<AtomicUsize>,
  /// Jobs that failed while resolving entities, resolving the handler,
  /// or inside the handler body.
  pub jobs_failed: Arc<AtomicUsize>,
  /// Jobs whose handler panicked.
  pub jobs_panicked: Arc<AtomicUsize>,
  /// Entities skipped at resolve time (absent, or inactive under the
  /// active-only policy).
  pub entities_skipped: Arc<AtomicUsize>,
  /// Passes that drained completely.
  pub passes_completed: Arc<AtomicUsize>,
  /// Passes cut short by a graceful stop.
  pub passes_aborted: Arc<AtomicUsize>,
  /// Histogram of per-job execution duration.
  pub job_duration: Arc<SimpleHistogram>,
}

impl DispatchMetrics {
  pub fn new() -> Self {
    Self {
      jobs_submitted: Default::default(),
      jobs_rejected: Default::default(),
      jobs_succeeded: Default::default(),
      jobs_failed: Default::default(),
      jobs_panicked: Default::default(),
      entities_skipped: Default::default(),
      passes_completed: Default::default(),
      passes_aborted: Default::default(),
      job_duration: Arc::new(SimpleHistogram::default()),
    }
  }

  /// Creates a point-in-time snapshot, merging in the pool occupancy
  /// gauges.
  pub fn snapshot(&self, pool: PoolCounts) -> MetricsSnapshot {
    let order = Ordering::Relaxed;
    MetricsSnapshot {
      jobs_submitted: self.jobs_submitted.load(order),
      jobs_rejected: self.jobs_rejected.load(order),
      jobs_succeeded: self.jobs_succeeded.load(order),
      jobs_failed: self.jobs_failed.load(order),
      jobs_panicked: self.jobs_panicked.load(order),
      entities_skipped: self.entities_skipped.load(order),
      passes_completed: self.passes_completed.load(order),
      passes_aborted: self.passes_aborted.load(order),
      jobs_queued_current: pool.queued,
      jobs_running_current: pool.running,
      workers_live_current: pool.workers,
      job_duration_count: self.job_duration.get_count(),
      job_duration_sum_micros: self.job_duration.get_sum_micros(),
    }
  }
}

impl Default for DispatchMetrics {
  fn default() -> Self {
    Self::new()
  }
}

// --- Metrics Snapshot Struct (Public Data) ---

/// A snapshot of dispatcher metrics at a specific point in time.
///
/// Plain data; cheap to clone, serialize, or ship to a monitoring sink.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
  // Counters
  pub jobs_submitted: usize,
  pub jobs_rejected: usize,
  pub jobs_succeeded: usize,
  pub jobs_failed: usize,
  pub jobs_panicked: usize,
  pub entities_skipped: usize,
  pub passes_completed: usize,
  pub passes_aborted: usize,
  // Gauges (pool occupancy at snapshot time)
  pub jobs_queued_current: usize,
  pub jobs_running_current: usize,
  pub workers_live_current: usize,
  // Histogram data
  pub job_duration_count: usize,
  pub job_duration_sum_micros: usize,
}

impl MetricsSnapshot {
  /// Mean job execution duration in microseconds, if any job completed.
  pub fn mean_job_duration_micros(&self) -> Option<f64> {
    if self.job_duration_count == 0 {
      None
    } else {
      Some(self.job_duration_sum_micros as f64 / self.job_duration_count as f64)
    }
  }

  /// Mean job execution duration, if any job completed.
  pub fn mean_job_duration(&self) -> Option<Duration> {
    self
      .mean_job_duration_micros()
      .map(|micros| Duration::from_micros(micros as u64))
  }
}
