use crate::error::StoreError;

use futures::future::BoxFuture;

/// Column name of the entity active flag, as understood by backing stores.
///
/// [`compose_filter`](crate::filter::compose_filter) splices this field
/// into generated predicates; a caller-supplied predicate that already
/// mentions it is passed through untouched.
pub const FLD_IS_ACTIVE: &str = "isActive";

/// An account record, the top-level entity a batch pass enumerates.
///
/// Only the fields the dispatcher itself needs are modeled here; anything
/// beyond them lives behind the [`EntitySource`] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Account {
  /// Unique account identifier, non-blank.
  pub id: String,
  /// Free-form description; may be empty.
  pub description: String,
  /// Suspension / soft-delete flag. An inactive account is skipped
  /// whenever the dispatcher's active-only policy is on.
  pub is_active: bool,
}

impl Account {
  /// Creates an active account with an empty description.
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      description: String::new(),
      is_active: true,
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  /// Marks the record inactive.
  pub fn inactive(mut self) -> Self {
    self.is_active = false;
    self
  }
}

/// A device record, child of one account.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Device {
  /// Identifier of the owning account.
  pub account_id: String,
  /// Device identifier, unique within the account.
  pub id: String,
  /// Free-form description; may be empty.
  pub description: String,
  /// Suspension / soft-delete flag, same policy as [`Account::is_active`].
  pub is_active: bool,
}

impl Device {
  /// Creates an active device with an empty description.
  pub fn new(account_id: impl Into<String>, id: impl Into<String>) -> Self {
    Self {
      account_id: account_id.into(),
      id: id.into(),
      description: String::new(),
      is_active: true,
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  /// Marks the record inactive.
  pub fn inactive(mut self) -> Self {
    self.is_active = false;
    self
  }
}

/// Read-only query surface over accounts and devices.
///
/// Methods return boxed futures so the trait stays object-safe; the
/// dispatcher holds an `Arc<dyn EntitySource>` and never needs to know
/// what backs it.
///
/// Implementations must keep "no match" distinct from a backend failure:
/// an unknown id is `Ok(None)` and an empty enumeration is `Ok(vec![])`,
/// while `Err(StoreError)` is reserved for the store itself failing. The
/// dispatcher treats the former as normal empty results and the latter as
/// fatal to the current enumeration.
///
/// The `filter` arguments are opaque predicate fragments (typically
/// produced by [`compose_filter`](crate::filter::compose_filter) from the
/// dispatcher configuration); how much of the fragment a store honors is
/// up to the implementation.
pub trait EntitySource: Send + Sync {
  /// Lists account ids matching `filter`, in stable store order.
  fn account_ids<'a>(
    &'a self,
    filter: Option<&'a str>,
  ) -> BoxFuture<'a, Result<Vec<String>, StoreError>>;

  /// Fetches one account by id. `Ok(None)` when absent.
  fn account<'a>(
    &'a self,
    account_id: &'a str,
  ) -> BoxFuture<'a, Result<Option<Account>, StoreError>>;

  /// Lists device ids under `account_id` matching `filter`, in stable
  /// store order.
  fn device_ids<'a>(
    &'a self,
    account_id: &'a str,
    filter: Option<&'a str>,
  ) -> BoxFuture<'a, Result<Vec<String>, StoreError>>;

  /// Fetches one device under an account. `Ok(None)` when absent.
  fn device<'a>(
    &'a self,
    account: &'a Account,
    device_id: &'a str,
  ) -> BoxFuture<'a, Result<Option<Device>, StoreError>>;
}
