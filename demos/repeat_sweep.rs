//! Unattended repeating sweep, stopped via the pool's graceful-stop flag.
//!
//! Run with: `cargo run --example repeat_sweep`

use std::sync::Arc;
use std::time::Duration;

use fleetsweep::{handler_fn, Account, JobDispatcher, MemorySource};

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter("info,fleetsweep=debug")
    .init();

  let store = Arc::new(MemorySource::new());
  store.insert_account(Account::new("acme"));
  store.insert_account(Account::new("globex"));

  let handler = handler_fn! {
    |job| {
      tracing::info!(account = %job.account_id(), "notification scan");
      Ok(())
    }
  };

  let dispatcher = JobDispatcher::builder(store)
    .max_pool_size(2)
    .handler(Arc::new(handler))
    .build();

  let pool = dispatcher.worker_pool();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(3500)).await;
    tracing::info!("requesting graceful stop");
    pool.stop_graceful();
  });

  // Runs a pass roughly once per second (the requested 100ms is clamped)
  // until the stop flag is raised.
  dispatcher
    .repeat_account_jobs(None, Duration::from_millis(100))
    .await;
  tracing::info!("repeat loop exited");
}
