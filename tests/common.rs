//! tests/common.rs
//! Shared helper functions for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleetsweep::{
  Account, Device, EntitySource, HandlerFuture, JobDispatcher, JobHandler, JobRequest,
  MemorySource, StoreError,
};
use futures::future::BoxFuture;
use futures::FutureExt;

// Initializes tracing subscriber for test output.
pub fn setup_tracing() {
  // Use try_init to avoid panic if called multiple times
  let _ = tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_test_writer()
    .try_init();
}

// Seeds a store with `accounts` active accounts ("acct-00", ...) carrying
// `devices_per_account` active devices each ("dev-00", ...).
pub fn seeded_source(accounts: usize, devices_per_account: usize) -> Arc<MemorySource> {
  let source = MemorySource::new();
  for a in 0..accounts {
    let account_id = format!("acct-{a:02}");
    source.insert_account(Account::new(&account_id));
    for d in 0..devices_per_account {
      source.insert_device(Device::new(&account_id, format!("dev-{d:02}")));
    }
  }
  Arc::new(source)
}

// Builds a dispatcher with a short drain-wait slice so stop signals are
// noticed quickly in tests.
pub fn build_dispatcher(
  source: Arc<dyn EntitySource>,
  max_pool_size: i32,
  handler: Arc<dyn JobHandler>,
) -> JobDispatcher {
  JobDispatcher::builder(source)
    .max_pool_size(max_pool_size)
    .wait_slice(Duration::from_millis(100))
    .handler(handler)
    .build()
}

/// Handler that counts invocations and optionally sleeps.
pub struct CountingHandler {
  invocations: Arc<AtomicUsize>,
  delay: Duration,
}

impl CountingHandler {
  pub fn new(delay: Duration) -> (Arc<Self>, Arc<AtomicUsize>) {
    let invocations = Arc::new(AtomicUsize::new(0));
    (
      Arc::new(Self {
        invocations: invocations.clone(),
        delay,
      }),
      invocations,
    )
  }
}

impl JobHandler for CountingHandler {
  fn run<'a>(&'a self, _job: &'a JobRequest) -> HandlerFuture<'a> {
    async move {
      self.invocations.fetch_add(1, Ordering::SeqCst);
      if self.delay > Duration::ZERO {
        tokio::time::sleep(self.delay).await;
      }
      Ok(())
    }
    .boxed()
  }
}

/// Handler recording every (account, device) pair it sees, with an
/// optional per-job delay.
pub struct RecordingHandler {
  seen: Arc<Mutex<Vec<(String, Option<String>)>>>,
  delay: Duration,
}

pub type Recorded = Arc<Mutex<Vec<(String, Option<String>)>>>;

impl RecordingHandler {
  pub fn new(delay: Duration) -> (Arc<Self>, Recorded) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    (
      Arc::new(Self {
        seen: seen.clone(),
        delay,
      }),
      seen,
    )
  }
}

impl JobHandler for RecordingHandler {
  fn run<'a>(&'a self, job: &'a JobRequest) -> HandlerFuture<'a> {
    async move {
      self.seen.lock().unwrap().push((
        job.account_id().to_owned(),
        job.device_id().map(str::to_owned),
      ));
      if self.delay > Duration::ZERO {
        tokio::time::sleep(self.delay).await;
      }
      Ok(())
    }
    .boxed()
  }
}

/// Handler tracking how many jobs run at once.
pub struct ConcurrencyTracker {
  active: Arc<AtomicUsize>,
  max_observed: Arc<AtomicUsize>,
  delay: Duration,
}

impl ConcurrencyTracker {
  pub fn new(delay: Duration) -> (Arc<Self>, Arc<AtomicUsize>) {
    let max_observed = Arc::new(AtomicUsize::new(0));
    (
      Arc::new(Self {
        active: Arc::new(AtomicUsize::new(0)),
        max_observed: max_observed.clone(),
        delay,
      }),
      max_observed,
    )
  }
}

impl JobHandler for ConcurrencyTracker {
  fn run<'a>(&'a self, _job: &'a JobRequest) -> HandlerFuture<'a> {
    async move {
      let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
      self.max_observed.fetch_max(now_active, Ordering::SeqCst);
      if self.delay > Duration::ZERO {
        tokio::time::sleep(self.delay).await;
      }
      self.active.fetch_sub(1, Ordering::SeqCst);
      Ok(())
    }
    .boxed()
  }
}

/// EntitySource simulating a backing-store outage: every call fails.
pub struct OutageSource;

impl EntitySource for OutageSource {
  fn account_ids<'a>(
    &'a self,
    _filter: Option<&'a str>,
  ) -> BoxFuture<'a, Result<Vec<String>, StoreError>> {
    async { Err(StoreError::Unavailable("simulated outage".into())) }.boxed()
  }

  fn account<'a>(
    &'a self,
    _account_id: &'a str,
  ) -> BoxFuture<'a, Result<Option<Account>, StoreError>> {
    async { Err(StoreError::Unavailable("simulated outage".into())) }.boxed()
  }

  fn device_ids<'a>(
    &'a self,
    _account_id: &'a str,
    _filter: Option<&'a str>,
  ) -> BoxFuture<'a, Result<Vec<String>, StoreError>> {
    async { Err(StoreError::Unavailable("simulated outage".into())) }.boxed()
  }

  fn device<'a>(
    &'a self,
    _account: &'a Account,
    _device_id: &'a str,
  ) -> BoxFuture<'a, Result<Option<Device>, StoreError>> {
    async { Err(StoreError::Unavailable("simulated outage".into())) }.boxed()
  }
}

/// Decorator counting single-account fetches against an inner store.
pub struct FetchCountingSource {
  inner: Arc<MemorySource>,
  account_fetches: AtomicUsize,
}

impl FetchCountingSource {
  pub fn new(inner: Arc<MemorySource>) -> Arc<Self> {
    Arc::new(Self {
      inner,
      account_fetches: AtomicUsize::new(0),
    })
  }

  pub fn fetches(&self) -> usize {
    self.account_fetches.load(Ordering::SeqCst)
  }
}

impl EntitySource for FetchCountingSource {
  fn account_ids<'a>(
    &'a self,
    filter: Option<&'a str>,
  ) -> BoxFuture<'a, Result<Vec<String>, StoreError>> {
    self.inner.account_ids(filter)
  }

  fn account<'a>(
    &'a self,
    account_id: &'a str,
  ) -> BoxFuture<'a, Result<Option<Account>, StoreError>> {
    self.account_fetches.fetch_add(1, Ordering::SeqCst);
    self.inner.account(account_id)
  }

  fn device_ids<'a>(
    &'a self,
    account_id: &'a str,
    filter: Option<&'a str>,
  ) -> BoxFuture<'a, Result<Vec<String>, StoreError>> {
    self.inner.device_ids(account_id, filter)
  }

  fn device<'a>(
    &'a self,
    account: &'a Account,
    device_id: &'a str,
  ) -> BoxFuture<'a, Result<Option<Device>, StoreError>> {
    self.inner.device(account, device_id)
  }
}
