use crate::dispatcher::{DispatcherCore, JobDispatcher};
use crate::error::JobError;
use crate::source::{Account, Device};

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use futures::future::BoxFuture;
use tracing::error;
use uuid::Uuid;

/// Opaque caller-supplied payload, forwarded unchanged to every job of a
/// pass. Use [`job_data`] to wrap a value and
/// [`JobRequest::job_data_as`] to get it back.
pub type JobData = Arc<dyn Any + Send + Sync>;

/// Wraps an arbitrary value as a [`JobData`] payload.
pub fn job_data<T: Any + Send + Sync>(value: T) -> JobData {
  Arc::new(value)
}

/// Future returned by [`JobHandler::run`].
pub type HandlerFuture<'a> = BoxFuture<'a, Result<(), JobError>>;

/// The pluggable unit of work, invoked once per enumerated entity.
///
/// A handler bound as a shared instance runs concurrently for many jobs
/// and must be reentrant. A handler built per resolution by a
/// [`HandlerFactory`] must not assume it sees more than one job, since
/// the dispatcher resolves a fresh instance per submission.
pub trait JobHandler: Send + Sync {
  fn run<'a>(&'a self, job: &'a JobRequest) -> HandlerFuture<'a>;
}

/// Builds fresh [`JobHandler`] instances on demand. A factory failure is
/// fatal only to the job awaiting that instance.
pub type HandlerFactory =
  dyn Fn() -> Result<Box<dyn JobHandler>, Box<dyn std::error::Error + Send + Sync>> + Send + Sync;

/// Adapts a closure returning a boxed future into a [`JobHandler`].
///
/// The [`handler_fn!`](crate::handler_fn) macro hides the boxing noise;
/// see its docs for the closure shape.
pub struct FnHandler<F>(F);

impl<F> FnHandler<F>
where
  F: for<'a> Fn(&'a JobRequest) -> HandlerFuture<'a> + Send + Sync,
{
  pub fn new(f: F) -> Self {
    Self(f)
  }
}

impl<F> JobHandler for FnHandler<F>
where
  F: for<'a> Fn(&'a JobRequest) -> HandlerFuture<'a> + Send + Sync,
{
  fn run<'a>(&'a self, job: &'a JobRequest) -> HandlerFuture<'a> {
    (self.0)(job)
  }
}

/// The property bag carried by one submitted job.
///
/// The set of slots is fixed. The `account` and `device` slots follow a
/// lazy-resolve-and-cache discipline: absent until the first successful
/// resolution, then cached for the life of the request, never cleared. A
/// resolution that comes back absent (not found, or inactive under the
/// active-only policy) leaves the slot empty.
pub struct JobRequest {
  account_id: String,
  device_id: Option<String>,
  job_data: Option<JobData>,
  account: OnceLock<Account>,
  device: OnceLock<Device>,
  // Weak: a request must never keep its owning dispatcher alive.
  dispatcher: Weak<DispatcherCore>,
  instance_id: Uuid,
}

impl JobRequest {
  pub(crate) fn new(
    dispatcher: Weak<DispatcherCore>,
    account: Option<Account>,
    account_id: impl Into<String>,
    device_id: Option<String>,
    job_data: Option<JobData>,
  ) -> Self {
    let mut account_id = account_id.into();
    let account_slot = OnceLock::new();
    if let Some(acct) = account {
      if !account_id.is_empty() && !account_id.eq_ignore_ascii_case(&acct.id) {
        // unlikely, but check anyway
        error!(given = %account_id, resolved = %acct.id, "mismatched account/account id");
      }
      account_id = acct.id.clone();
      let _ = account_slot.set(acct);
    }
    Self {
      account_id,
      device_id: device_id.filter(|d| !d.trim().is_empty()),
      job_data,
      account: account_slot,
      device: OnceLock::new(),
      dispatcher,
      instance_id: Uuid::new_v4(),
    }
  }

  /// True when the request carries nothing to act on. Submitting an empty
  /// request is a programming error and is rejected by the dispatcher.
  pub fn is_empty(&self) -> bool {
    self.account_id.trim().is_empty() && self.account.get().is_none()
  }

  /// Identifier of this submission, unique per job; tagged onto the job's
  /// log span.
  pub fn instance_id(&self) -> Uuid {
    self.instance_id
  }

  pub fn account_id(&self) -> &str {
    &self.account_id
  }

  pub fn device_id(&self) -> Option<&str> {
    self.device_id.as_deref()
  }

  pub fn job_data(&self) -> Option<&JobData> {
    self.job_data.as_ref()
  }

  /// Downcasts the payload to a concrete type.
  pub fn job_data_as<T: Any + Send + Sync>(&self) -> Option<&T> {
    self.job_data.as_ref().and_then(|d| d.downcast_ref::<T>())
  }

  /// The owning dispatcher, if it is still alive. Lets a handler call
  /// back into dispatcher operations; never used for lifecycle.
  pub fn dispatcher(&self) -> Option<JobDispatcher> {
    self.dispatcher.upgrade().map(JobDispatcher::from_core)
  }

  /// The resolved account, fetching and caching it on the first call.
  ///
  /// `Ok(None)` when the account does not exist or fails the active-only
  /// policy; an absent outcome is not cached, so a later call looks
  /// again.
  pub async fn account(&self) -> Result<Option<&Account>, JobError> {
    if let Some(acct) = self.account.get() {
      return Ok(Some(acct));
    }
    let core = self.dispatcher.upgrade().ok_or(JobError::DispatcherGone)?;
    match core.resolve_account(&self.account_id).await? {
      Some(acct) => {
        let _ = self.account.set(acct);
        Ok(self.account.get())
      }
      None => Ok(None),
    }
  }

  /// The resolved device, fetching and caching it on the first call.
  /// Requires a device id and a resolvable account; `Ok(None)` otherwise.
  pub async fn device(&self) -> Result<Option<&Device>, JobError> {
    if let Some(dev) = self.device.get() {
      return Ok(Some(dev));
    }
    let Some(device_id) = self.device_id.clone() else {
      return Ok(None);
    };
    let Some(account) = self.account().await? else {
      return Ok(None);
    };
    let core = self.dispatcher.upgrade().ok_or(JobError::DispatcherGone)?;
    match core.resolve_device(account, &device_id).await? {
      Some(dev) => {
        let _ = self.device.set(dev);
        Ok(self.device.get())
      }
      None => Ok(None),
    }
  }
}

// Manual Debug: the dispatcher back-reference and payload are opaque.
impl fmt::Debug for JobRequest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("JobRequest")
      .field("instance_id", &self.instance_id)
      .field("account_id", &self.account_id)
      .field("device_id", &self.device_id)
      .field("account_resolved", &self.account.get().is_some())
      .field("device_resolved", &self.device.get().is_some())
      .field("has_job_data", &self.job_data.is_some())
      .finish()
  }
}
