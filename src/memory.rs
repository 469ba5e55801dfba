//! In-memory [`EntitySource`] used by the integration tests and demos.

use crate::error::StoreError;
use crate::source::{Account, Device, EntitySource, FLD_IS_ACTIVE};

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;

/// In-memory entity store with ordered enumeration.
///
/// Filter support is deliberately minimal: a predicate mentioning
/// [`FLD_IS_ACTIVE`] (which is what the dispatcher composes under its
/// active-only policy) excludes inactive records; any other fragment text
/// is ignored. This is a seeding/testing double, not a query engine.
#[derive(Default)]
pub struct MemorySource {
  accounts: RwLock<BTreeMap<String, Account>>,
  devices: RwLock<BTreeMap<(String, String), Device>>,
}

impl MemorySource {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts or replaces an account record.
  pub fn insert_account(&self, account: Account) {
    self.accounts.write().insert(account.id.clone(), account);
  }

  /// Inserts or replaces a device record.
  pub fn insert_device(&self, device: Device) {
    self
      .devices
      .write()
      .insert((device.account_id.clone(), device.id.clone()), device);
  }

  /// Removes an account (devices under it are left in place).
  pub fn remove_account(&self, account_id: &str) -> Option<Account> {
    self.accounts.write().remove(account_id)
  }

  fn wants_active(filter: Option<&str>) -> bool {
    filter.is_some_and(|f| f.contains(FLD_IS_ACTIVE))
  }
}

impl EntitySource for MemorySource {
  fn account_ids<'a>(
    &'a self,
    filter: Option<&'a str>,
  ) -> BoxFuture<'a, Result<Vec<String>, StoreError>> {
    let active_only = Self::wants_active(filter);
    let ids: Vec<String> = self
      .accounts
      .read()
      .values()
      .filter(|a| !active_only || a.is_active)
      .map(|a| a.id.clone())
      .collect();
    async move { Ok(ids) }.boxed()
  }

  fn account<'a>(
    &'a self,
    account_id: &'a str,
  ) -> BoxFuture<'a, Result<Option<Account>, StoreError>> {
    let found = self.accounts.read().get(account_id).cloned();
    async move { Ok(found) }.boxed()
  }

  fn device_ids<'a>(
    &'a self,
    account_id: &'a str,
    filter: Option<&'a str>,
  ) -> BoxFuture<'a, Result<Vec<String>, StoreError>> {
    let active_only = Self::wants_active(filter);
    let ids: Vec<String> = self
      .devices
      .read()
      .values()
      .filter(|d| d.account_id == account_id)
      .filter(|d| !active_only || d.is_active)
      .map(|d| d.id.clone())
      .collect();
    async move { Ok(ids) }.boxed()
  }

  fn device<'a>(
    &'a self,
    account: &'a Account,
    device_id: &'a str,
  ) -> BoxFuture<'a, Result<Option<Device>, StoreError>> {
    let found = self
      .devices
      .read()
      .get(&(account.id.clone(), device_id.to_owned()))
      .cloned();
    async move { Ok(found) }.boxed()
  }
}
