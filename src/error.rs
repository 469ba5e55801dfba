use thiserror::Error;

/// Errors raised by an [`EntitySource`](crate::source::EntitySource)
/// backing store.
///
/// A store error is always a backend failure (store unreachable, query
/// rejected). "Not found" and "inactive" are not errors anywhere in this
/// crate; they surface as `Ok(None)` or an empty list.
#[derive(Error, Debug)]
pub enum StoreError {
  /// The backing store could not be reached at all.
  #[error("entity store unavailable: {0}")]
  Unavailable(String),
  /// The store was reachable but the query failed.
  #[error("entity store query failed: {0}")]
  Query(String),
}

/// Errors surfaced synchronously by the dispatcher's `run_*`/`add_*`
/// orchestration methods.
///
/// These are fatal to the call that triggered them, never to the
/// dispatcher itself; the dispatcher stays usable for further passes.
#[derive(Error, Debug)]
pub enum DispatchError {
  /// Neither a handler instance nor a handler factory is bound.
  #[error("no job handler configured")]
  HandlerUnset,
  /// The entity store failed during enumeration.
  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Per-job failures.
///
/// Raised while a submitted job resolves its entities, resolves its
/// handler, or runs the handler body. Caught at the job boundary, logged,
/// and never propagated out of the worker pool: a failing job must not
/// abort sibling jobs or the pass as a whole.
#[derive(Error, Debug)]
pub enum JobError {
  #[error("no job handler configured")]
  HandlerUnset,
  #[error("failed to create job handler: {0}")]
  HandlerCreation(String),
  /// The owning dispatcher was dropped while the job was in flight.
  #[error("dispatcher dropped while job was in flight")]
  DispatcherGone,
  #[error(transparent)]
  Store(#[from] StoreError),
  /// Logical failure reported by a handler.
  #[error("job failed: {0}")]
  Failed(String),
  #[error(transparent)]
  Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl JobError {
  /// Shorthand for a [`JobError::Failed`] with the given message.
  pub fn msg(msg: impl Into<String>) -> Self {
    JobError::Failed(msg.into())
  }
}
