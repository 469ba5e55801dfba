//! tests/accounts.rs
//! Account-level passes: bounded parallelism, active-only policy,
//! payload plumbing.

mod common;

use common::{
  build_dispatcher, seeded_source, setup_tracing, ConcurrencyTracker, CountingHandler,
  RecordingHandler,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fleetsweep::{handler_fn, job_data, Account, JobDispatcher, MemorySource};

#[tokio::test]
async fn bounded_parallelism_across_account_jobs() {
  setup_tracing();
  let source = seeded_source(5, 0);
  let (handler, max_observed) = ConcurrencyTracker::new(Duration::from_millis(50));
  let dispatcher = build_dispatcher(source, 2, handler);

  let started = Instant::now();
  let completed = dispatcher.run_account_jobs(None).await.unwrap();
  let elapsed = started.elapsed();

  assert!(completed);
  let snapshot = dispatcher.metrics();
  assert_eq!(snapshot.jobs_submitted, 5);
  assert_eq!(snapshot.jobs_succeeded, 5);

  let max = max_observed.load(Ordering::SeqCst);
  assert!(
    max >= 1 && max <= 2,
    "observed concurrency {max} outside pool bounds"
  );
  // 5 jobs through 2 workers need at least 3 sequential 50ms slots
  assert!(
    elapsed >= Duration::from_millis(150),
    "pass finished too fast: {elapsed:?}"
  );
}

#[tokio::test]
async fn active_only_skips_inactive_accounts() {
  setup_tracing();
  let source = Arc::new(MemorySource::new());
  source.insert_account(Account::new("one"));
  source.insert_account(Account::new("two").inactive());
  source.insert_account(Account::new("three"));

  let (handler, invocations) = CountingHandler::new(Duration::ZERO);
  let dispatcher = JobDispatcher::builder(source)
    .max_pool_size(2)
    .active_only(true)
    .wait_slice(Duration::from_millis(100))
    .handler(handler)
    .build();

  let completed = dispatcher.run_account_jobs(None).await.unwrap();
  assert!(completed);
  assert_eq!(invocations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_store_reports_an_incomplete_pass() {
  setup_tracing();
  let source = Arc::new(MemorySource::new());
  let (handler, invocations) = CountingHandler::new(Duration::ZERO);
  let dispatcher = build_dispatcher(source, 2, handler);

  let completed = dispatcher.run_account_jobs(None).await.unwrap();
  assert!(!completed);
  assert_eq!(invocations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn single_worker_preserves_enumeration_order() {
  setup_tracing();
  let source = seeded_source(4, 0);
  let (handler, seen) = RecordingHandler::new(Duration::ZERO);
  let dispatcher = build_dispatcher(source, 1, handler);

  assert!(dispatcher.run_account_jobs(None).await.unwrap());

  let seen = seen.lock().unwrap();
  let ids: Vec<_> = seen.iter().map(|(account, _)| account.clone()).collect();
  assert_eq!(ids, vec!["acct-00", "acct-01", "acct-02", "acct-03"]);
}

struct SweepConfig {
  region: &'static str,
}

#[tokio::test]
async fn job_data_reaches_every_handler_invocation() {
  setup_tracing();
  let source = seeded_source(3, 0);
  let hits = Arc::new(AtomicUsize::new(0));
  let handler = {
    let hits = hits.clone();
    handler_fn! {
      {
        let hits = hits.clone();
      }
      |job| {
        let config = job.job_data_as::<SweepConfig>().expect("payload missing");
        assert_eq!(config.region, "us-east");
        hits.fetch_add(1, Ordering::SeqCst);
        Ok(())
      }
    }
  };
  let dispatcher = build_dispatcher(source, 2, Arc::new(handler));

  let completed = dispatcher
    .run_account_jobs(Some(job_data(SweepConfig { region: "us-east" })))
    .await
    .unwrap();
  assert!(completed);
  assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn fire_and_forget_account_jobs_with_composed_wait() {
  setup_tracing();
  let source = seeded_source(4, 0);
  let (handler, invocations) = CountingHandler::new(Duration::from_millis(20));
  let dispatcher = build_dispatcher(source, 2, handler);

  dispatcher.add_account_jobs(None).await.unwrap();
  assert!(dispatcher.wait_all_complete().await);
  assert_eq!(invocations.load(Ordering::SeqCst), 4);
}
