//! Records which guards have run during the current session.

use crate::core::store::SessionStore;
use crate::core::value::StateValue;

pub const HOOKS_ACTIVE_KEY: &str = "hooks_active";

pub fn register_hook(store: &SessionStore, hook_name: &str) {
    store.update(|record| {
        record
            .map_entry(HOOKS_ACTIVE_KEY)
            .insert(hook_name.to_string(), StateValue::Bool(true));
    });
}

pub fn is_hook_active(store: &SessionStore, hook_name: &str) -> bool {
    store
        .read()
        .get(HOOKS_ACTIVE_KEY)
        .and_then(StateValue::as_map)
        .and_then(|hooks| hooks.get(hook_name))
        .and_then(StateValue::as_bool)
        .unwrap_or(false)
}

/// Names of every registered guard, sorted.
pub fn active_hooks(store: &SessionStore) -> Vec<String> {
    store
        .read()
        .get(HOOKS_ACTIVE_KEY)
        .and_then(StateValue::as_map)
        .map(|hooks| {
            hooks
                .iter()
                .filter(|(_, v)| v.as_bool() == Some(true))
                .map(|(k, _)| k.clone())
                .collect()
        })
        .unwrap_or_default()
}
