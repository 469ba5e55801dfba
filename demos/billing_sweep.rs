//! One-shot billing sweep over all active accounts of a seeded store.
//!
//! Run with: `cargo run --example billing_sweep`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fleetsweep::{handler_fn, job_data, Account, JobDispatcher, MemorySource};

#[derive(Debug)]
struct BillingRun {
  rate_cents: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter("info,fleetsweep=debug")
    .init();

  let store = Arc::new(MemorySource::new());
  store.insert_account(Account::new("acme").with_description("Acme Logistics"));
  store.insert_account(Account::new("globex").with_description("Globex Corp"));
  store.insert_account(Account::new("initech").with_description("Initech").inactive());

  let billed_cents = Arc::new(AtomicU64::new(0));
  let handler = {
    let billed_cents = billed_cents.clone();
    handler_fn! {
      {
        let billed_cents = billed_cents.clone();
      }
      |job| {
        let run = job.job_data_as::<BillingRun>().expect("billing run payload");
        let account = job.account().await?.expect("resolved during enumeration");
        tracing::info!(account = %account.id, rate = run.rate_cents, "billing account");
        tokio::time::sleep(Duration::from_millis(250)).await;
        billed_cents.fetch_add(run.rate_cents, Ordering::Relaxed);
        Ok(())
      }
    }
  };

  let dispatcher = JobDispatcher::builder(store)
    .max_pool_size(4)
    .active_only(true)
    .handler(Arc::new(handler))
    .build();

  let completed = dispatcher
    .run_account_jobs(Some(job_data(BillingRun { rate_cents: 4900 })))
    .await?;

  let snapshot = dispatcher.metrics();
  tracing::info!(
    completed,
    billed_cents = billed_cents.load(Ordering::Relaxed),
    jobs = snapshot.jobs_succeeded,
    "billing sweep finished"
  );
  Ok(())
}
