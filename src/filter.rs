//! Where-clause composition for entity enumeration.

/// Composes an enumeration predicate from an optional caller-supplied
/// fragment and the active-only policy.
///
/// Rules:
/// - active-only off: the base fragment passes through unchanged (blank
///   collapses to `None`).
/// - active-only on, no base: just the active clause
///   (`{active_field} != 0`).
/// - active-only on, base present without `active_field`: the active
///   clause is ANDed in front of the base.
/// - active-only on, base already mentions `active_field`: the base is
///   trusted to encode the intended active check and passes through.
///
/// Pure function, no side effects.
pub fn compose_filter(base: Option<&str>, active_only: bool, active_field: &str) -> Option<String> {
  let base = base.map(str::trim).filter(|s| !s.is_empty());
  if !active_only {
    return base.map(str::to_owned);
  }
  match base {
    None => Some(format!("{active_field} != 0")),
    Some(b) if b.contains(active_field) => Some(b.to_owned()),
    Some(b) => Some(format!("({active_field} != 0) AND ({b})")),
  }
}
