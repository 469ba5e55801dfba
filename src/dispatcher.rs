//! The job dispatcher: entity enumeration, job submission, drain-wait
//! synchronization, and the unattended repeat mode.

use crate::error::{DispatchError, JobError, StoreError};
use crate::filter::compose_filter;
use crate::job::{HandlerFactory, JobData, JobHandler, JobRequest};
use crate::metrics::{DispatchMetrics, MetricsSnapshot};
use crate::pool::{PoolCounts, WorkerPool};
use crate::source::{Account, Device, EntitySource, FLD_IS_ACTIVE};

use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, error, warn, Instrument};

/// Worker cap applied when the configured pool size is negative.
pub const DEFAULT_MAX_POOL_SIZE: usize = 20;
/// Default idle seconds before a pool worker is reclaimed.
pub const DEFAULT_MAX_IDLE_SECS: u32 = 5;
/// Bounded slice for one drain-wait poll. Each expiry re-checks the pool
/// stop flag, so a wait never blocks indefinitely against a pool that is
/// being torn down. Overridable per dispatcher via
/// [`DispatcherBuilder::wait_slice`].
pub const DRAIN_WAIT_SLICE: Duration = Duration::from_secs(30);
/// Lower clamp for the repeat-mode sleep interval.
pub const MIN_REPEAT_INTERVAL: Duration = Duration::from_millis(1000);

enum HandlerBinding {
  Unset,
  Instance(Arc<dyn JobHandler>),
  Factory(Arc<HandlerFactory>),
}

struct DispatchConfig {
  max_pool_size: i32,
  max_idle_secs: u32,
  active_only: bool,
  account_filter: Option<String>,
  device_filter: Option<String>,
  handler: HandlerBinding,
  wait_slice: Duration,
}

impl Default for DispatchConfig {
  fn default() -> Self {
    Self {
      max_pool_size: DEFAULT_MAX_POOL_SIZE as i32,
      max_idle_secs: DEFAULT_MAX_IDLE_SECS,
      active_only: false,
      account_filter: None,
      device_filter: None,
      handler: HandlerBinding::Unset,
      wait_slice: DRAIN_WAIT_SLICE,
    }
  }
}

fn effective_pool_size(max_pool_size: i32) -> usize {
  if max_pool_size < 0 {
    DEFAULT_MAX_POOL_SIZE
  } else {
    max_pool_size as usize
  }
}

fn trim_filter(filter: Option<String>) -> Option<String> {
  filter
    .map(|f| f.trim().to_owned())
    .filter(|f| !f.is_empty())
}

/// Shared dispatcher state. Jobs hold a weak reference to this so their
/// resolver helpers can call back in without pinning the dispatcher
/// alive.
pub(crate) struct DispatcherCore {
  source: Arc<dyn EntitySource>,
  config: Mutex<DispatchConfig>,
  pool: Mutex<Option<WorkerPool>>,
  pub(crate) metrics: DispatchMetrics,
}

impl DispatcherCore {
  /// Creates/gets the worker pool, lazily on first use. The pool is
  /// reused across all passes for the dispatcher's lifetime.
  fn pool(&self) -> WorkerPool {
    if let Some(pool) = self.pool.lock().as_ref() {
      return pool.clone();
    }
    let (max_workers, max_idle_secs) = {
      let cfg = self.config.lock();
      (
        effective_pool_size(cfg.max_pool_size),
        u64::from(cfg.max_idle_secs),
      )
    };
    let mut guard = self.pool.lock();
    if let Some(pool) = guard.as_ref() {
      return pool.clone();
    }
    let pool = WorkerPool::new("fleetsweep", max_workers, max_idle_secs);
    *guard = Some(pool.clone());
    pool
  }

  fn live_pool(&self) -> Option<WorkerPool> {
    self.pool.lock().clone()
  }

  fn pool_counts(&self) -> PoolCounts {
    self
      .pool
      .lock()
      .as_ref()
      .map(|p| p.counts())
      .unwrap_or_default()
  }

  fn wait_slice(&self) -> Duration {
    self.config.lock().wait_slice
  }

  fn account_filter(&self) -> Option<String> {
    let cfg = self.config.lock();
    compose_filter(cfg.account_filter.as_deref(), cfg.active_only, FLD_IS_ACTIVE)
  }

  fn device_filter(&self) -> Option<String> {
    let cfg = self.config.lock();
    compose_filter(cfg.device_filter.as_deref(), cfg.active_only, FLD_IS_ACTIVE)
  }

  fn active_only(&self) -> bool {
    self.config.lock().active_only
  }

  /// Fails fast when no handler is bound at all; orchestration methods
  /// surface this synchronously instead of submitting jobs that can only
  /// fail one by one.
  fn ensure_handler(&self) -> Result<(), DispatchError> {
    if matches!(self.config.lock().handler, HandlerBinding::Unset) {
      return Err(DispatchError::HandlerUnset);
    }
    Ok(())
  }

  /// Resolves the handler for one job: the shared instance if one is
  /// bound, otherwise a fresh instance from the factory. Called per
  /// submission, so factory-built handlers never see more than one job.
  /// A factory failure is fatal only to the job awaiting that instance.
  fn resolve_handler(&self) -> Result<Arc<dyn JobHandler>, JobError> {
    let factory = {
      let cfg = self.config.lock();
      match &cfg.handler {
        HandlerBinding::Instance(handler) => return Ok(handler.clone()),
        HandlerBinding::Factory(factory) => factory.clone(),
        HandlerBinding::Unset => return Err(JobError::HandlerUnset),
      }
    };
    factory()
      .map(Arc::from)
      .map_err(|err| JobError::HandlerCreation(err.to_string()))
  }

  /// Lists all account ids through the composed account filter. An empty
  /// store is an empty list, not an error.
  async fn account_ids(&self) -> Result<Vec<String>, StoreError> {
    let filter = self.account_filter();
    if let Some(f) = filter.as_deref() {
      debug!(filter = %f, "account selection");
    }
    self.source.account_ids(filter.as_deref()).await
  }

  /// Lists device ids under one account through the composed device
  /// filter.
  async fn device_ids(&self, account_id: &str) -> Result<Vec<String>, StoreError> {
    let filter = self.device_filter();
    if let Some(f) = filter.as_deref() {
      debug!(filter = %f, "device selection");
    }
    self.source.device_ids(account_id, filter.as_deref()).await
  }

  /// Fetches one account, applying the active-only policy. Absent and
  /// inactive are `Ok(None)`, never errors.
  pub(crate) async fn resolve_account(
    &self,
    account_id: &str,
  ) -> Result<Option<Account>, StoreError> {
    if account_id.trim().is_empty() {
      debug!("account id is blank");
      return Ok(None);
    }
    match self.source.account(account_id).await? {
      None => {
        debug!(account = %account_id, "unable to find account");
        self
          .metrics
          .entities_skipped
          .fetch_add(1, AtomicOrdering::Relaxed);
        Ok(None)
      }
      Some(account) if self.active_only() && !account.is_active => {
        debug!(account = %account_id, "account is not active");
        self
          .metrics
          .entities_skipped
          .fetch_add(1, AtomicOrdering::Relaxed);
        Ok(None)
      }
      Some(account) => Ok(Some(account)),
    }
  }

  /// Fetches one device under an account, applying the active-only
  /// policy. Same absent-vs-error split as accounts.
  pub(crate) async fn resolve_device(
    &self,
    account: &Account,
    device_id: &str,
  ) -> Result<Option<Device>, StoreError> {
    if device_id.trim().is_empty() {
      debug!("device id is blank");
      return Ok(None);
    }
    match self.source.device(account, device_id).await? {
      None => {
        debug!(account = %account.id, device = %device_id, "unable to find device");
        self
          .metrics
          .entities_skipped
          .fetch_add(1, AtomicOrdering::Relaxed);
        Ok(None)
      }
      Some(device) if self.active_only() && !device.is_active => {
        debug!(account = %account.id, device = %device_id, "device is not active");
        self
          .metrics
          .entities_skipped
          .fetch_add(1, AtomicOrdering::Relaxed);
        Ok(None)
      }
      Some(device) => Ok(Some(device)),
    }
  }

  /// Wraps the request into a pool task and submits it. Returns false
  /// only for an empty request, which is a programming-error guard, not
  /// an expected runtime condition.
  pub(crate) async fn submit(self: &Arc<Self>, request: JobRequest) -> bool {
    if request.is_empty() {
      error!("rejecting empty job request");
      self
        .metrics
        .jobs_rejected
        .fetch_add(1, AtomicOrdering::Relaxed);
      return false;
    }
    self
      .metrics
      .jobs_submitted
      .fetch_add(1, AtomicOrdering::Relaxed);
    let span = tracing::span!(
      tracing::Level::INFO,
      "job",
      job = %request.instance_id(),
      account = %request.account_id(),
      device = request.device_id().unwrap_or_default(),
    );
    let core = Arc::clone(self);
    let task = async move { core.run_job(request).await }
      .instrument(span)
      .boxed();
    self.pool().submit(task).await;
    true
  }

  /// Executes one job end to end and absorbs every failure, including
  /// handler panics. This is the failure-isolation boundary: nothing
  /// escapes into the pool worker.
  async fn run_job(self: Arc<Self>, request: JobRequest) {
    let started = Instant::now();
    let outcome = std::panic::AssertUnwindSafe(self.run_job_inner(&request))
      .catch_unwind()
      .await;
    self.metrics.job_duration.record(started.elapsed());
    match outcome {
      Ok(Ok(())) => {
        self
          .metrics
          .jobs_succeeded
          .fetch_add(1, AtomicOrdering::Relaxed);
      }
      Ok(Err(err)) => {
        self
          .metrics
          .jobs_failed
          .fetch_add(1, AtomicOrdering::Relaxed);
        error!(error = %err, "job failed");
      }
      Err(_panic) => {
        self
          .metrics
          .jobs_panicked
          .fetch_add(1, AtomicOrdering::Relaxed);
        error!("job panicked");
      }
    }
  }

  async fn run_job_inner(&self, request: &JobRequest) -> Result<(), JobError> {
    // Resolve and cache the entities up front so the handler sees them at
    // no extra cost; the handler still runs when they come back absent.
    let account = request.account().await?;
    if account.is_some() && request.device_id().is_some() {
      request.device().await?;
    }
    let handler = self.resolve_handler()?;
    handler.run(request).await
  }
}

/// Fans a pluggable unit of work out across accounts (and optionally each
/// account's devices), executing it concurrently under a bounded worker
/// pool.
///
/// Configure once (pool size, idle reclamation, active-only policy,
/// filter fragments, and the handler), then run any number of one-shot or
/// repeating passes. The worker pool is created lazily on first use and
/// reused until the process tears down.
///
/// Reconfiguring while a pass is in flight is not synchronized against
/// running jobs; avoiding it is the caller's responsibility.
#[derive(Clone)]
pub struct JobDispatcher {
  core: Arc<DispatcherCore>,
}

/// Builder for configuring a [`JobDispatcher`].
pub struct DispatcherBuilder {
  source: Arc<dyn EntitySource>,
  config: DispatchConfig,
}

impl DispatcherBuilder {
  /// Maximum concurrent jobs: 0 = unbounded, negative = the default
  /// ([`DEFAULT_MAX_POOL_SIZE`]).
  pub fn max_pool_size(mut self, max_pool_size: i32) -> Self {
    self.config.max_pool_size = max_pool_size;
    self
  }

  /// Seconds a pool worker may idle before reclamation; 0 disables
  /// reclamation.
  pub fn max_idle_secs(mut self, max_idle_secs: u32) -> Self {
    self.config.max_idle_secs = max_idle_secs;
    self
  }

  /// When on, only entities whose active flag is set are enumerated and
  /// resolved; the rest are skipped silently.
  pub fn active_only(mut self, active_only: bool) -> Self {
    self.config.active_only = active_only;
    self
  }

  /// Additional predicate fragment applied when enumerating accounts.
  pub fn account_filter(mut self, filter: impl Into<String>) -> Self {
    self.config.account_filter = trim_filter(Some(filter.into()));
    self
  }

  /// Additional predicate fragment applied when enumerating devices.
  pub fn device_filter(mut self, filter: impl Into<String>) -> Self {
    self.config.device_filter = trim_filter(Some(filter.into()));
    self
  }

  /// Binds a shared handler instance (must be reentrant). Clears any
  /// bound factory.
  pub fn handler(mut self, handler: Arc<dyn JobHandler>) -> Self {
    self.config.handler = HandlerBinding::Instance(handler);
    self
  }

  /// Binds a handler factory; a fresh instance is built per job
  /// resolution. Clears any bound instance.
  pub fn handler_factory<F>(mut self, factory: F) -> Self
  where
    F: Fn() -> Result<Box<dyn JobHandler>, Box<dyn std::error::Error + Send + Sync>>
      + Send
      + Sync
      + 'static,
  {
    self.config.handler = HandlerBinding::Factory(Arc::new(factory));
    self
  }

  /// Overrides the drain-wait polling slice ([`DRAIN_WAIT_SLICE`]).
  pub fn wait_slice(mut self, wait_slice: Duration) -> Self {
    self.config.wait_slice = wait_slice;
    self
  }

  pub fn build(self) -> JobDispatcher {
    JobDispatcher {
      core: Arc::new(DispatcherCore {
        source: self.source,
        config: Mutex::new(self.config),
        pool: Mutex::new(None),
        metrics: DispatchMetrics::new(),
      }),
    }
  }
}

impl JobDispatcher {
  /// Returns a builder over the given entity source.
  pub fn builder(source: Arc<dyn EntitySource>) -> DispatcherBuilder {
    DispatcherBuilder {
      source,
      config: DispatchConfig::default(),
    }
  }

  /// Creates a dispatcher with default configuration. A handler must
  /// still be bound before any pass can do useful work.
  pub fn new(source: Arc<dyn EntitySource>) -> Self {
    Self::builder(source).build()
  }

  pub(crate) fn from_core(core: Arc<DispatcherCore>) -> Self {
    Self { core }
  }

  /// Sets the maximum concurrent jobs (0 = unbounded, negative = the
  /// default) and applies it to the live pool immediately if one exists.
  pub fn set_max_pool_size(&self, max_pool_size: i32) {
    self.core.config.lock().max_pool_size = max_pool_size;
    if let Some(pool) = self.core.live_pool() {
      pool.set_max_workers(effective_pool_size(max_pool_size));
    }
  }

  /// Sets the worker idle reclamation interval (0 disables reclamation)
  /// and applies it to the live pool immediately if one exists.
  pub fn set_max_idle_secs(&self, max_idle_secs: u32) {
    self.core.config.lock().max_idle_secs = max_idle_secs;
    if let Some(pool) = self.core.live_pool() {
      pool.set_max_idle_secs(u64::from(max_idle_secs));
    }
  }

  pub fn set_active_only(&self, active_only: bool) {
    self.core.config.lock().active_only = active_only;
  }

  pub fn active_only(&self) -> bool {
    self.core.active_only()
  }

  /// Sets the additional account enumeration predicate; `None` or a
  /// blank string clears it.
  pub fn set_account_filter(&self, filter: Option<String>) {
    self.core.config.lock().account_filter = trim_filter(filter);
  }

  /// Sets the additional device enumeration predicate; `None` or a
  /// blank string clears it.
  pub fn set_device_filter(&self, filter: Option<String>) {
    self.core.config.lock().device_filter = trim_filter(filter);
  }

  /// Binds a shared handler instance (must be reentrant, since it runs
  /// concurrently for many jobs). Clears any bound factory.
  pub fn set_handler(&self, handler: Arc<dyn JobHandler>) {
    self.core.config.lock().handler = HandlerBinding::Instance(handler);
  }

  /// Binds a handler factory; a fresh instance is built per job
  /// resolution. Clears any bound instance.
  pub fn set_handler_factory<F>(&self, factory: F)
  where
    F: Fn() -> Result<Box<dyn JobHandler>, Box<dyn std::error::Error + Send + Sync>>
      + Send
      + Sync
      + 'static,
  {
    self.core.config.lock().handler = HandlerBinding::Factory(Arc::new(factory));
  }

  /// True if a handler instance or factory is bound.
  pub fn has_handler(&self) -> bool {
    !matches!(self.core.config.lock().handler, HandlerBinding::Unset)
  }

  /// The worker pool, created lazily on first use. Exposed so callers
  /// can observe occupancy or request a graceful stop.
  pub fn worker_pool(&self) -> WorkerPool {
    self.core.pool()
  }

  /// Snapshot of dispatch counters plus current pool occupancy.
  pub fn metrics(&self) -> MetricsSnapshot {
    self.core.metrics.snapshot(self.core.pool_counts())
  }

  /// Submits a single account-level job without enumeration. Returns
  /// false if the request is empty (blank account id).
  pub async fn submit_account_job(&self, account_id: &str, job_data: Option<JobData>) -> bool {
    let request = JobRequest::new(
      Arc::downgrade(&self.core),
      None,
      account_id,
      None,
      job_data,
    );
    self.core.submit(request).await
  }

  /// Submits a single device-level job without enumeration. Returns
  /// false if the request is empty (blank account id).
  pub async fn submit_device_job(
    &self,
    account_id: &str,
    device_id: &str,
    job_data: Option<JobData>,
  ) -> bool {
    let request = JobRequest::new(
      Arc::downgrade(&self.core),
      None,
      account_id,
      Some(device_id.to_owned()),
      job_data,
    );
    self.core.submit(request).await
  }

  /// Adds one job per device under the given account, without waiting.
  ///
  /// An absent or inactive account is a normal empty result (`Ok(())`),
  /// not a failure; only a store error short-circuits.
  pub async fn add_device_jobs_for_account(
    &self,
    account_id: &str,
    job_data: Option<JobData>,
  ) -> Result<(), DispatchError> {
    self.core.ensure_handler()?;
    let Some(account) = self.core.resolve_account(account_id).await? else {
      // account does not exist, or is inactive
      return Ok(());
    };
    let device_ids = self.core.device_ids(account_id).await?;
    if device_ids.is_empty() {
      debug!(account = %account_id, "no devices for account");
      return Ok(());
    }
    debug!(account = %account_id, devices = device_ids.len(), "adding device jobs");
    for device_id in device_ids {
      let request = JobRequest::new(
        Arc::downgrade(&self.core),
        Some(account.clone()),
        account_id,
        Some(device_id),
        job_data.clone(),
      );
      self.core.submit(request).await;
    }
    Ok(())
  }

  /// Runs one pass over all devices of one account and blocks until all
  /// submitted jobs have finished. Returns whether the pass completed
  /// (false = aborted by a graceful stop).
  pub async fn run_device_jobs_for_account(
    &self,
    account_id: &str,
    job_data: Option<JobData>,
  ) -> Result<bool, DispatchError> {
    let started = Instant::now();
    self.add_device_jobs_for_account(account_id, job_data).await?;
    Ok(self.wait_all_complete_logged(started).await)
  }

  /// Runs one pass over all devices of all accounts and blocks until all
  /// submitted jobs have finished.
  ///
  /// Before each account, the pass waits for the submission queue to
  /// drain so one account's devices never pile up unbounded against the
  /// next account's. That wait is queue-empty only: the previous
  /// account's jobs may still be executing when the next account is
  /// enumerated. Returns false if a graceful stop was observed between
  /// accounts (no jobs are submitted for the remaining accounts).
  pub async fn run_device_jobs_for_all_accounts(
    &self,
    job_data: Option<JobData>,
  ) -> Result<bool, DispatchError> {
    let started = Instant::now();
    self.core.ensure_handler()?;
    let account_ids = self.core.account_ids().await?;
    if account_ids.is_empty() {
      debug!("no accounts");
      return Ok(false);
    }
    for account_id in account_ids {
      if !self.wait_queue_empty().await {
        debug!(
          elapsed_ms = started.elapsed().as_millis() as u64,
          "pool is stopping, returning now"
        );
        self
          .core
          .metrics
          .passes_aborted
          .fetch_add(1, AtomicOrdering::Relaxed);
        return Ok(false);
      }
      self
        .add_device_jobs_for_account(&account_id, job_data.clone())
        .await?;
    }
    Ok(self.wait_all_complete_logged(started).await)
  }

  /// Adds one job per account, without waiting. Absent or inactive
  /// accounts are skipped.
  pub async fn add_account_jobs(&self, job_data: Option<JobData>) -> Result<(), DispatchError> {
    self.core.ensure_handler()?;
    let account_ids = self.core.account_ids().await?;
    if account_ids.is_empty() {
      debug!("no accounts");
      return Ok(());
    }
    for account_id in account_ids {
      let Some(account) = self.core.resolve_account(&account_id).await? else {
        // not found, not active, ...
        continue;
      };
      let request = JobRequest::new(
        Arc::downgrade(&self.core),
        Some(account),
        &account_id,
        None,
        job_data.clone(),
      );
      self.core.submit(request).await;
    }
    Ok(())
  }

  /// Runs one pass over all accounts (one job per account, not per
  /// device) and blocks until all submitted jobs have finished. Returns
  /// whether the pass completed.
  pub async fn run_account_jobs(&self, job_data: Option<JobData>) -> Result<bool, DispatchError> {
    let started = Instant::now();
    self.core.ensure_handler()?;
    let account_ids = self.core.account_ids().await?;
    if account_ids.is_empty() {
      debug!("no accounts");
      return Ok(false);
    }
    for account_id in account_ids {
      let Some(account) = self.core.resolve_account(&account_id).await? else {
        // not found, not active, ...
        continue;
      };
      debug!(account = %account_id, "adding account job");
      let request = JobRequest::new(
        Arc::downgrade(&self.core),
        Some(account),
        &account_id,
        None,
        job_data.clone(),
      );
      self.core.submit(request).await;
    }
    Ok(self.wait_all_complete_logged(started).await)
  }

  /// Runs account passes forever, sleeping `interval` between passes
  /// (clamped to [`MIN_REPEAT_INTERVAL`]).
  ///
  /// Idle-worker reclamation is disabled up front so the pool keeps warm
  /// workers across passes. A failing pass is logged and never stops the
  /// loop; the only exit condition is the pool's graceful-stop signal.
  pub async fn repeat_account_jobs(&self, job_data: Option<JobData>, interval: Duration) {
    let interval = interval.max(MIN_REPEAT_INTERVAL);
    self.set_max_idle_secs(0);
    let pool = self.core.pool();
    while !pool.is_stopping_now() {
      if let Err(err) = self.run_account_jobs(job_data.clone()).await {
        warn!(error = %err, "account pass failed, retrying at next interval");
      }
      tokio::time::sleep(interval).await;
    }
  }

  /// Runs all-accounts device passes forever, sleeping `interval`
  /// between passes (clamped to [`MIN_REPEAT_INTERVAL`]). Same loop
  /// semantics as [`JobDispatcher::repeat_account_jobs`].
  pub async fn repeat_device_jobs_for_all_accounts(
    &self,
    job_data: Option<JobData>,
    interval: Duration,
  ) {
    let interval = interval.max(MIN_REPEAT_INTERVAL);
    self.set_max_idle_secs(0);
    let pool = self.core.pool();
    while !pool.is_stopping_now() {
      if let Err(err) = self.run_device_jobs_for_all_accounts(job_data.clone()).await {
        warn!(error = %err, "device pass failed, retrying at next interval");
      }
      tokio::time::sleep(interval).await;
    }
  }

  /// Blocks until the pool's submission queue is empty. Returns false if
  /// a graceful stop is observed instead.
  ///
  /// Polls in bounded slices so the caller is woken periodically to
  /// re-check the stop flag rather than blocking indefinitely on a
  /// condition that may never fire while the pool is being torn down.
  pub async fn wait_queue_empty(&self) -> bool {
    let pool = self.core.pool();
    let slice = self.core.wait_slice();
    loop {
      let timed_out = pool.wait_until_queue_empty(slice).await;
      if pool.is_stopping_now() {
        // we are stopping, exit now
        return false;
      }
      if !timed_out {
        // job queue is empty
        return true;
      }
    }
  }

  /// Blocks until every submitted job has finished executing. Returns
  /// false if a graceful stop is observed instead. Same polling pattern
  /// as [`JobDispatcher::wait_queue_empty`].
  pub async fn wait_all_complete(&self) -> bool {
    let pool = self.core.pool();
    let slice = self.core.wait_slice();
    loop {
      let timed_out = pool.wait_until_all_complete(slice).await;
      if pool.is_stopping_now() {
        return false;
      }
      if !timed_out {
        return true;
      }
    }
  }

  async fn wait_all_complete_logged(&self, started: Instant) -> bool {
    debug!("waiting for all jobs to complete ...");
    let complete = self.wait_all_complete().await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if complete {
      debug!(elapsed_ms, "... all jobs complete");
      self
        .core
        .metrics
        .passes_completed
        .fetch_add(1, AtomicOrdering::Relaxed);
    } else {
      debug!(elapsed_ms, "... pool stopping");
      self
        .core
        .metrics
        .passes_aborted
        .fetch_add(1, AtomicOrdering::Relaxed);
    }
    complete
  }
}
