//! Device maintenance sweep across every account, with a custom device
//! filter composed on top of the active-only policy.
//!
//! Run with: `cargo run --example device_sweep`

use std::sync::Arc;

use fleetsweep::{handler_fn, Account, Device, JobDispatcher, MemorySource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter("info,fleetsweep=debug")
    .init();

  let store = Arc::new(MemorySource::new());
  for (account_id, fleet) in [("acme", 3usize), ("globex", 2)] {
    store.insert_account(Account::new(account_id));
    for n in 0..fleet {
      store.insert_device(Device::new(account_id, format!("unit-{n:02}")));
    }
  }
  store.insert_device(Device::new("acme", "unit-99").inactive());

  let handler = handler_fn! {
    |job| {
      let device = job.device().await?.expect("resolved during enumeration");
      tracing::info!(account = %device.account_id, device = %device.id, "maintenance check");
      Ok(())
    }
  };

  let dispatcher = JobDispatcher::builder(store)
    .max_pool_size(8)
    .active_only(true)
    .device_filter("deviceCode = 'tk10x'")
    .handler(Arc::new(handler))
    .build();

  let completed = dispatcher.run_device_jobs_for_all_accounts(None).await?;
  tracing::info!(completed, "device sweep finished");
  Ok(())
}
