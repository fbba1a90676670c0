//! Ordered, duplicate-free string sets stored under a state key.

use crate::core::error::GuardError;
use crate::core::store::SessionStore;
use crate::core::value::StateValue;

/// Appends `value` to the list at `key` unless already present.
///
/// Returns whether the value was added. A non-list value under `key` is
/// replaced by a fresh list.
pub fn try_add(store: &SessionStore, key: &str, value: &str) -> Result<bool, GuardError> {
    store.try_update(|record| {
        let items = record.list_entry(key);
        if items.iter().any(|item| item.as_str() == Some(value)) {
            return false;
        }
        items.push(StateValue::from(value));
        true
    })
}

/// Fail-open add: errors are logged and reported as "not added".
pub fn add(store: &SessionStore, key: &str, value: &str) -> bool {
    try_add(store, key, value).unwrap_or_else(|err| {
        tracing::warn!(target: "hookguard::membership", key, error = %err, "membership_add_failed");
        false
    })
}

/// Members in first-seen order. Non-string items are skipped.
pub fn members(store: &SessionStore, key: &str) -> Vec<String> {
    store
        .read()
        .get(key)
        .and_then(StateValue::as_list)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn contains(store: &SessionStore, key: &str, value: &str) -> bool {
    members(store, key).iter().any(|m| m == value)
}
