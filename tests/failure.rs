//! tests/failure.rs
//! Per-job failure isolation and handler resolution failures.

mod common;

use common::{build_dispatcher, seeded_source, setup_tracing, CountingHandler};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fleetsweep::{
  handler_fn, DispatchError, HandlerFuture, JobDispatcher, JobError, JobHandler, JobRequest,
};
use futures::FutureExt;

#[tokio::test]
async fn one_failing_job_does_not_affect_the_pass() {
  setup_tracing();
  let source = seeded_source(4, 0);
  let survivors = Arc::new(AtomicUsize::new(0));
  let handler = {
    let survivors = survivors.clone();
    handler_fn! {
      {
        let survivors = survivors.clone();
      }
      |job| {
        if job.account_id() == "acct-01" {
          return Err(JobError::msg("synthetic failure"));
        }
        survivors.fetch_add(1, Ordering::SeqCst);
        Ok(())
      }
    }
  };
  let dispatcher = build_dispatcher(source, 2, Arc::new(handler));

  let completed = dispatcher.run_account_jobs(None).await.unwrap();
  assert!(
    completed,
    "individual job failures must not change the pass result"
  );
  assert_eq!(survivors.load(Ordering::SeqCst), 3);

  let snapshot = dispatcher.metrics();
  assert_eq!(snapshot.jobs_failed, 1);
  assert_eq!(snapshot.jobs_succeeded, 3);
}

#[tokio::test]
async fn panicking_handler_is_contained() {
  setup_tracing();
  let source = seeded_source(3, 0);
  let survivors = Arc::new(AtomicUsize::new(0));
  let handler = {
    let survivors = survivors.clone();
    handler_fn! {
      {
        let survivors = survivors.clone();
      }
      |job| {
        if job.account_id() == "acct-00" {
          panic!("handler forced panic");
        }
        survivors.fetch_add(1, Ordering::SeqCst);
        Ok(())
      }
    }
  };
  let dispatcher = build_dispatcher(source, 1, Arc::new(handler));

  let completed = dispatcher.run_account_jobs(None).await.unwrap();
  assert!(completed);
  assert_eq!(survivors.load(Ordering::SeqCst), 2);

  let snapshot = dispatcher.metrics();
  assert_eq!(snapshot.jobs_panicked, 1);
  assert_eq!(snapshot.jobs_succeeded, 2);

  // the pool survives the panic and serves the next pass
  assert!(dispatcher.run_account_jobs(None).await.unwrap());
  assert_eq!(dispatcher.metrics().jobs_panicked, 2);
}

#[tokio::test]
async fn factory_failure_is_per_job_and_logged() {
  setup_tracing();
  let source = seeded_source(3, 0);
  let dispatcher = JobDispatcher::builder(source)
    .max_pool_size(2)
    .wait_slice(Duration::from_millis(100))
    .handler_factory(|| Err("factory exploded".into()))
    .build();

  let completed = dispatcher.run_account_jobs(None).await.unwrap();
  assert!(completed);

  let snapshot = dispatcher.metrics();
  assert_eq!(snapshot.jobs_failed, 3);
  assert_eq!(snapshot.jobs_succeeded, 0);
}

#[tokio::test]
async fn unconfigured_handler_is_a_synchronous_configuration_error() {
  setup_tracing();
  let source = seeded_source(2, 0);
  let dispatcher = JobDispatcher::builder(source)
    .max_pool_size(1)
    .wait_slice(Duration::from_millis(100))
    .build();
  assert!(!dispatcher.has_handler());

  let err = dispatcher.run_account_jobs(None).await.unwrap_err();
  assert!(matches!(err, DispatchError::HandlerUnset));
  assert_eq!(dispatcher.metrics().jobs_submitted, 0);

  // the error is fatal to the call, not to the dispatcher
  let (handler, invocations) = CountingHandler::new(Duration::ZERO);
  dispatcher.set_handler(handler);
  assert!(dispatcher.run_account_jobs(None).await.unwrap());
  assert_eq!(invocations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn direct_submission_without_a_handler_fails_per_job() {
  setup_tracing();
  let source = seeded_source(1, 0);
  let dispatcher = JobDispatcher::builder(source)
    .max_pool_size(1)
    .wait_slice(Duration::from_millis(100))
    .build();

  // the fire-and-forget path has no synchronous error channel; the job
  // itself fails and is logged
  assert!(dispatcher.submit_account_job("acct-00", None).await);
  assert!(dispatcher.wait_all_complete().await);
  assert_eq!(dispatcher.metrics().jobs_failed, 1);
}

struct OneShot;

impl JobHandler for OneShot {
  fn run<'a>(&'a self, _job: &'a JobRequest) -> HandlerFuture<'a> {
    async move { Ok(()) }.boxed()
  }
}

#[tokio::test]
async fn factory_builds_a_fresh_handler_per_job() {
  setup_tracing();
  let source = seeded_source(4, 0);
  let built = Arc::new(AtomicUsize::new(0));
  let dispatcher = JobDispatcher::builder(source)
    .max_pool_size(2)
    .wait_slice(Duration::from_millis(100))
    .handler_factory({
      let built = built.clone();
      move || {
        built.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(OneShot) as Box<dyn JobHandler>)
      }
    })
    .build();

  let completed = dispatcher.run_account_jobs(None).await.unwrap();
  assert!(completed);
  assert_eq!(built.load(Ordering::SeqCst), 4);
  assert_eq!(dispatcher.metrics().jobs_succeeded, 4);
}

#[tokio::test]
async fn binding_an_instance_clears_the_factory() {
  setup_tracing();
  let source = seeded_source(2, 0);
  let built = Arc::new(AtomicUsize::new(0));
  let dispatcher = JobDispatcher::builder(source)
    .max_pool_size(1)
    .wait_slice(Duration::from_millis(100))
    .handler_factory({
      let built = built.clone();
      move || {
        built.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(OneShot) as Box<dyn JobHandler>)
      }
    })
    .build();

  let (counting, invocations) = CountingHandler::new(Duration::ZERO);
  dispatcher.set_handler(counting);

  let completed = dispatcher.run_account_jobs(None).await.unwrap();
  assert!(completed);
  assert_eq!(invocations.load(Ordering::SeqCst), 2);
  assert_eq!(built.load(Ordering::SeqCst), 0, "factory must be cleared");
}
