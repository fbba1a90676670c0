//! Time-windowed deduplication of singleton actions.
//!
//! The same guard can be installed globally and per-project, in which case the
//! host fires it twice for one event. The first claim inside the window wins.

use crate::core::error::GuardError;
use crate::core::store::SessionStore;
use crate::core::time::now_unix_f64;
use crate::core::value::StateValue;
use std::time::Duration;

const MARKER_PREFIX: &str = "_run_once_";

pub fn marker_key(operation: &str) -> String {
    format!("{}{}", MARKER_PREFIX, operation)
}

/// Claims `operation` at time `now` (unix seconds).
///
/// Returns `true` and records `now` when no marker exists or the existing one
/// is at least `ttl` old. The check and the write happen under one exclusive
/// lock.
pub fn try_claim_at(
    store: &SessionStore,
    operation: &str,
    ttl: Duration,
    now: f64,
) -> Result<bool, GuardError> {
    let key = marker_key(operation);
    store.try_update(|record| {
        let last = record.get(&key).and_then(StateValue::as_f64).unwrap_or(0.0);
        if now - last < ttl.as_secs_f64() {
            return false;
        }
        record.insert(key.as_str(), StateValue::from_f64(now));
        true
    })
}

/// Fail-open claim: a broken store lets the action run.
pub fn try_claim(store: &SessionStore, operation: &str, ttl: Duration) -> bool {
    match try_claim_at(store, operation, ttl, now_unix_f64()) {
        Ok(claimed) => {
            if !claimed {
                tracing::debug!(
                    target: "hookguard::run_once",
                    operation,
                    "duplicate_invocation_skipped"
                );
            }
            claimed
        }
        Err(err) => {
            tracing::warn!(
                target: "hookguard::run_once",
                operation,
                error = %err,
                "run_once_claim_failed"
            );
            true
        }
    }
}
