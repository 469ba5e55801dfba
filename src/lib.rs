//! FleetSweep: A Concurrent Account/Device Batch-Job Dispatcher
//!
//! Fans a pluggable unit of work out across a dynamically enumerated set
//! of accounts (or each account's child devices) and executes it under a
//! bounded, self-reclaiming worker pool. Built for periodic batch jobs:
//! billing sweeps, maintenance checks, notification scans.
//!
//! # Features
//!
//! - Enumerate accounts, one account's devices, or every device of every
//!   account, through a pluggable read-only [`EntitySource`].
//! - Bounded concurrency via an owned [`WorkerPool`]: workers are spawned
//!   on demand, reclaimed after a configurable idle interval, and the cap
//!   can be resized at runtime.
//! - Active-only policy and opaque where-clause fragments, composed by a
//!   pure [`filter::compose_filter`] function that never doubles up the
//!   active predicate.
//! - Lazy-resolve-and-cache [`JobRequest`] property bag: a handler gets
//!   the Account/Device records without a second store lookup.
//! - Two drain primitives with distinct semantics: submission queue
//!   empty, and all submitted work finished.
//! - Per-job failure isolation: a handler error or panic is logged and
//!   never aborts sibling jobs or the pass.
//! - Unattended repeat mode with a clamped minimum interval, exiting only
//!   on the pool's cooperative graceful-stop signal.
//! - Metrics counters with a plain-data [`MetricsSnapshot`].
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fleetsweep::{handler_fn, Account, Device, JobDispatcher, MemorySource};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(MemorySource::new());
//!     store.insert_account(Account::new("acme"));
//!     store.insert_device(Device::new("acme", "truck-01"));
//!     store.insert_device(Device::new("acme", "truck-02"));
//!
//!     let handler = handler_fn! {
//!         |job| {
//!             println!("processing {}/{:?}", job.account_id(), job.device_id());
//!             Ok(())
//!         }
//!     };
//!
//!     let dispatcher = JobDispatcher::builder(store)
//!         .max_pool_size(4)
//!         .active_only(true)
//!         .handler(Arc::new(handler))
//!         .build();
//!
//!     let completed = dispatcher
//!         .run_device_jobs_for_all_accounts(None)
//!         .await
//!         .expect("entity store failed");
//!     println!("pass completed: {completed}");
//! }
//! ```
//!
//! # Handler contract
//!
//! A [`JobHandler`] is invoked once per enumerated entity with a
//! [`JobRequest`]. A handler bound via
//! [`JobDispatcher::set_handler`] is shared across concurrent jobs and
//! must be reentrant; one bound via
//! [`JobDispatcher::set_handler_factory`] is built fresh per job and must
//! not rely on cross-job state.
//!
//! # Failure model
//!
//! Store failures ([`StoreError`]) abort the enumeration that hit them
//! and surface to the caller. Per-job failures ([`JobError`]) are logged
//! and swallowed at the job boundary. "Not found" and "inactive" are
//! normal empty results everywhere, never errors.
//!
//! # Shutdown
//!
//! Cancellation is global and binary: [`WorkerPool::stop_graceful`] sets
//! a flag that workers, drain waits, and repeat loops observe
//! cooperatively. There is no per-job cancellation; a handler wanting
//! per-job timeouts implements them itself.

// Declare modules within the crate
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod job;
mod macros;
pub mod memory;
pub mod metrics;
pub mod pool;
pub mod source;

// --- Public Re-exports ---

// Core dispatcher components
pub use dispatcher::{
  DispatcherBuilder, JobDispatcher, DEFAULT_MAX_IDLE_SECS, DEFAULT_MAX_POOL_SIZE,
  DRAIN_WAIT_SLICE, MIN_REPEAT_INTERVAL,
};

// Error types
pub use error::{DispatchError, JobError, StoreError};

// Job related types
pub use job::{job_data, FnHandler, HandlerFuture, JobData, JobHandler, JobRequest};
pub use job::HandlerFactory;

// Entity model
pub use memory::MemorySource;
pub use source::{Account, Device, EntitySource, FLD_IS_ACTIVE};

// Worker pool
pub use pool::{PoolCounts, PoolTask, WorkerPool, TASK_QUEUE_BOUND};

// Metrics related types
pub use metrics::{DispatchMetrics, MetricsSnapshot, SimpleHistogram};
