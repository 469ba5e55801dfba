//! Bounded asynchronous worker pool.
//!
//! The pool executes opaque boxed tasks under a concurrency cap, spawning
//! workers on demand and reclaiming them after a configurable idle
//! interval. It exposes the two drain primitives the dispatcher's wait
//! loops are built on: "submission queue empty" and "all submitted tasks
//! complete". These are distinct conditions, since the queue can be empty while
//! workers are still finishing the last tasks they picked up.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::{error, trace, warn};

/// A unit of work accepted by [`WorkerPool::submit`].
pub type PoolTask = BoxFuture<'static, ()>;

/// Capacity of the submission queue. A full queue back-pressures
/// `submit` callers until workers drain it.
pub const TASK_QUEUE_BOUND: usize = 128;

/// Point-in-time pool occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolCounts {
  /// Tasks accepted but not yet picked up by a worker.
  pub queued: usize,
  /// Tasks currently executing.
  pub running: usize,
  /// Live worker tasks, idle or busy.
  pub workers: usize,
}

struct PoolShared {
  label: String,
  task_tx: async_channel::Sender<PoolTask>,
  task_rx: async_channel::Receiver<PoolTask>,
  counts_tx: watch::Sender<PoolCounts>,
  stop_tx: watch::Sender<bool>,
  /// 0 = unbounded.
  max_workers: AtomicUsize,
  /// Seconds; 0 = workers are never reclaimed.
  max_idle_secs: AtomicU64,
  worker_seq: AtomicUsize,
}

/// Bounded concurrent executor with cooperative shutdown.
///
/// Cloning shares the same pool; all clones observe the same counters and
/// stop flag.
#[derive(Clone)]
pub struct WorkerPool {
  shared: Arc<PoolShared>,
}

impl WorkerPool {
  /// Creates a pool. `max_workers == 0` means no cap; `max_idle_secs == 0`
  /// disables idle reclamation.
  pub fn new(label: impl Into<String>, max_workers: usize, max_idle_secs: u64) -> Self {
    let (task_tx, task_rx) = async_channel::bounded(TASK_QUEUE_BOUND);
    let (counts_tx, _) = watch::channel(PoolCounts::default());
    let (stop_tx, _) = watch::channel(false);
    Self {
      shared: Arc::new(PoolShared {
        label: label.into(),
        task_tx,
        task_rx,
        counts_tx,
        stop_tx,
        max_workers: AtomicUsize::new(max_workers),
        max_idle_secs: AtomicU64::new(max_idle_secs),
        worker_seq: AtomicUsize::new(0),
      }),
    }
  }

  /// Current occupancy snapshot.
  pub fn counts(&self) -> PoolCounts {
    *self.shared.counts_tx.borrow()
  }

  /// Sets the maximum number of concurrent workers; 0 = unbounded.
  ///
  /// Takes effect immediately: raising the cap replenishes workers for
  /// any queued backlog, lowering it retires surplus workers at their
  /// next loop turn.
  pub fn set_max_workers(&self, max_workers: usize) {
    self
      .shared
      .max_workers
      .store(max_workers, AtomicOrdering::Relaxed);
    self.shared.spawn_for_backlog();
  }

  /// Sets the idle interval after which a waiting worker retires itself;
  /// 0 keeps workers warm indefinitely. Applies from each worker's next
  /// wait.
  pub fn set_max_idle_secs(&self, max_idle_secs: u64) {
    self
      .shared
      .max_idle_secs
      .store(max_idle_secs, AtomicOrdering::Relaxed);
  }

  /// Submits one task for execution. May block while the submission
  /// queue is full (backpressure).
  pub async fn submit(&self, task: PoolTask) {
    self.shared.counts_tx.send_modify(|c| c.queued += 1);
    self.shared.spawn_for_backlog();
    if self.shared.task_tx.send(task).await.is_err() {
      // Only possible once every receiver clone is gone, which cannot
      // happen while the pool itself is alive.
      self.shared.counts_tx.send_modify(|c| c.queued -= 1);
      error!(pool = %self.shared.label, "task queue closed, dropping submission");
    }
  }

  /// Signals a graceful stop. Workers finish the task in hand and exit;
  /// queued tasks are left unprocessed. Observed cooperatively via
  /// [`WorkerPool::is_stopping_now`] and the wait primitives.
  pub fn stop_graceful(&self) {
    let _ = self.shared.stop_tx.send(true);
  }

  /// True once a graceful stop has been requested.
  pub fn is_stopping_now(&self) -> bool {
    *self.shared.stop_tx.borrow()
  }

  /// Blocks until the submission queue is empty or `timeout` elapses.
  /// Returns true if the wait timed out. An empty queue does not imply
  /// the picked-up tasks have finished executing.
  pub async fn wait_until_queue_empty(&self, timeout: Duration) -> bool {
    self.wait_for_counts(timeout, |c| c.queued == 0).await
  }

  /// Blocks until no task is queued or running, or `timeout` elapses.
  /// Returns true if the wait timed out.
  pub async fn wait_until_all_complete(&self, timeout: Duration) -> bool {
    self
      .wait_for_counts(timeout, |c| c.queued == 0 && c.running == 0)
      .await
  }

  async fn wait_for_counts(
    &self,
    timeout: Duration,
    cond: impl FnMut(&PoolCounts) -> bool,
  ) -> bool {
    let mut rx = self.shared.counts_tx.subscribe();
    let timed_out = match tokio::time::timeout(timeout, rx.wait_for(cond)).await {
      Ok(Ok(_)) => false,
      // The sender lives inside the pool, so a closed channel cannot be
      // observed while `self` exists; report satisfied rather than hang.
      Ok(Err(_)) => false,
      Err(_) => true,
    };
    timed_out
  }
}

impl PoolShared {
  fn max_workers(&self) -> usize {
    self.max_workers.load(AtomicOrdering::Relaxed)
  }

  fn max_idle(&self) -> Option<Duration> {
    match self.max_idle_secs.load(AtomicOrdering::Relaxed) {
      0 => None,
      secs => Some(Duration::from_secs(secs)),
    }
  }

  /// Spawns workers until every queued task has a worker able to take
  /// it, respecting the cap. The worker count is claimed inside the
  /// counts channel before the task is spawned, so concurrent callers
  /// cannot overshoot the cap.
  fn spawn_for_backlog(self: &Arc<Self>) {
    loop {
      let max = self.max_workers();
      let mut spawn = false;
      self.counts_tx.send_modify(|c| {
        let idle = c.workers.saturating_sub(c.running);
        if c.queued > idle && (max == 0 || c.workers < max) {
          c.workers += 1;
          spawn = true;
        }
      });
      if !spawn {
        return;
      }
      let id = self.worker_seq.fetch_add(1, AtomicOrdering::Relaxed);
      let worker = Worker {
        id,
        shared: Arc::clone(self),
      };
      tokio::spawn(worker.run());
    }
  }
}

enum NextTask {
  Run(PoolTask),
  IdleExpired,
  Closed,
}

/// One worker task: pulls from the shared queue until it is told to stop,
/// retired by idle reclamation, or surplus to a lowered cap.
struct Worker {
  id: usize,
  shared: Arc<PoolShared>,
}

impl Worker {
  async fn run(self) {
    trace!(pool = %self.shared.label, worker = self.id, "worker started");
    let mut stop_rx = self.shared.stop_tx.subscribe();
    loop {
      if *stop_rx.borrow() {
        break;
      }
      if self.over_cap() {
        break;
      }

      tokio::select! {
        biased;

        // Wake on stop-signal changes first so a graceful stop is
        // observed between tasks, never mid-task.
        Ok(()) = stop_rx.changed() => {
          if *stop_rx.borrow() {
            break;
          }
        }

        next = self.next_task() => match next {
          NextTask::Run(task) => self.execute(task).await,
          NextTask::IdleExpired => {
            if self.shared.task_rx.is_empty() {
              break;
            }
          }
          NextTask::Closed => break,
        },
      }
    }
    self.shared.counts_tx.send_modify(|c| c.workers -= 1);
    // A task may have slipped in between the idle check and the
    // decrement; hand it to a fresh worker instead of stranding it.
    if !self.shared.task_rx.is_empty() && !*self.shared.stop_tx.borrow() {
      self.shared.spawn_for_backlog();
    }
    trace!(pool = %self.shared.label, worker = self.id, "worker retired");
  }

  /// True when the cap was lowered below the live worker count; the
  /// surplus worker retires itself.
  fn over_cap(&self) -> bool {
    let max = self.shared.max_workers();
    max != 0 && self.shared.counts_tx.borrow().workers > max
  }

  async fn next_task(&self) -> NextTask {
    match self.shared.max_idle() {
      Some(idle) => match tokio::time::timeout(idle, self.shared.task_rx.recv()).await {
        Ok(Ok(task)) => NextTask::Run(task),
        Ok(Err(_)) => NextTask::Closed,
        Err(_) => NextTask::IdleExpired,
      },
      None => match self.shared.task_rx.recv().await {
        Ok(task) => NextTask::Run(task),
        Err(_) => NextTask::Closed,
      },
    }
  }

  async fn execute(&self, task: PoolTask) {
    self.shared.counts_tx.send_modify(|c| {
      c.queued = c.queued.saturating_sub(1);
      c.running += 1;
    });
    // The task runs in its own tokio task so a panic is contained there
    // instead of tearing down this worker.
    if let Err(join_err) = tokio::spawn(task).await {
      if join_err.is_panic() {
        error!(pool = %self.shared.label, worker = self.id, "job task panicked");
      } else {
        warn!(pool = %self.shared.label, worker = self.id, "job task cancelled");
      }
    }
    self.shared.counts_tx.send_modify(|c| c.running -= 1);
  }
}
