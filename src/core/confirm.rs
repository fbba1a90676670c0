//! Repeat-to-confirm gating.
//!
//! A side-effecting action is denied the first time it is requested and
//! allowed when an identical request comes back. The denial gives the operator
//! a chance to intervene in between.
//!
//! Pending requests live in a ledger keyed first by operation class and then by
//! fingerprint:
//!
//! ```text
//! pending_confirmations: {
//!   "<class>": { "<fingerprint>": <metadata>, ... },
//!   ...
//! }
//! ```
//!
//! Each fingerprint has its own slot. Two confirmable operations can be
//! interleaved (A denied, B denied, A repeated, B repeated) and both still
//! confirm, because touching A's slot never reads or writes B's.

use crate::core::error::GuardError;
use crate::core::store::SessionStore;
use crate::core::value::StateValue;
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub const PENDING_KEY: &str = "pending_confirmations";

const FINGERPRINT_HEX_LEN: usize = 16;

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// First sighting: the caller should deny and explain.
    FirstAttempt,
    /// Exact repeat: the caller may allow. Carries what the first attempt stored.
    Confirmed { metadata: Option<StateValue> },
}

impl Verdict {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Verdict::Confirmed { .. })
    }
}

/// Fingerprint over an operation class and an arbitrary JSON payload.
///
/// Object keys are serialized in sorted order, so payloads that differ only in
/// key order share a fingerprint.
pub fn fingerprint(operation_class: &str, payload: &JsonValue) -> String {
    let canonical = serde_json::to_string(&canonicalize(payload)).unwrap_or_default();
    digest(&[operation_class, &canonical])
}

/// Fingerprint over an ordered tuple of parts, e.g. target branch and flags.
pub fn fingerprint_parts(operation_class: &str, parts: &[&str]) -> String {
    let mut all = Vec::with_capacity(parts.len() + 1);
    all.push(operation_class);
    all.extend_from_slice(parts);
    digest(&all)
}

fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        // Length prefix keeps ("ab", "c") and ("a", "bc") apart.
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    let hex = format!("{:x}", hasher.finalize());
    hex[..FINGERPRINT_HEX_LEN].to_string()
}

fn canonicalize(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let sorted: BTreeMap<&String, JsonValue> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            serde_json::to_value(sorted).unwrap_or(JsonValue::Null)
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Evaluates one request against the ledger in a single exclusive update.
pub fn try_evaluate(
    store: &SessionStore,
    operation_class: &str,
    fingerprint: &str,
    metadata: StateValue,
) -> Result<Verdict, GuardError> {
    store.try_update(|record| {
        let ledger = record.map_entry(PENDING_KEY);
        let class = ledger
            .entry(operation_class.to_string())
            .or_insert_with(StateValue::empty_map);
        if class.as_map().is_none() {
            *class = StateValue::empty_map();
        }
        let Some(entries) = class.as_map_mut() else {
            return Verdict::FirstAttempt;
        };

        let verdict = match entries.remove(fingerprint) {
            Some(stored) => Verdict::Confirmed {
                metadata: Some(stored),
            },
            None => {
                entries.insert(fingerprint.to_string(), metadata);
                Verdict::FirstAttempt
            }
        };

        if entries.is_empty() {
            ledger.remove(operation_class);
        }
        if ledger.is_empty() {
            record.remove(PENDING_KEY);
        }
        verdict
    })
}

/// Fail-open evaluation: if the ledger cannot be used the request is treated
/// as confirmed.
pub fn evaluate(
    store: &SessionStore,
    operation_class: &str,
    fingerprint: &str,
    metadata: StateValue,
) -> Verdict {
    match try_evaluate(store, operation_class, fingerprint, metadata) {
        Ok(verdict) => {
            tracing::debug!(
                target: "hookguard::confirm",
                operation_class,
                fingerprint,
                confirmed = verdict.is_confirmed(),
                "confirmation_evaluated"
            );
            verdict
        }
        Err(err) => {
            tracing::warn!(
                target: "hookguard::confirm",
                operation_class,
                fingerprint,
                error = %err,
                "confirmation_ledger_unavailable"
            );
            Verdict::Confirmed { metadata: None }
        }
    }
}

/// Pending fingerprints for one class, with their metadata.
pub fn pending(store: &SessionStore, operation_class: &str) -> BTreeMap<String, StateValue> {
    store
        .read()
        .get(PENDING_KEY)
        .and_then(StateValue::as_map)
        .and_then(|ledger| ledger.get(operation_class))
        .and_then(StateValue::as_map)
        .cloned()
        .unwrap_or_default()
}

/// Drops one pending entry, leaving every other entry intact.
pub fn clear(store: &SessionStore, operation_class: &str, fingerprint: &str) -> bool {
    store
        .update(|record| {
            let ledger = record.map_entry(PENDING_KEY);
            let removed = ledger
                .get_mut(operation_class)
                .and_then(StateValue::as_map_mut)
                .map(|entries| {
                    let removed = entries.remove(fingerprint).is_some();
                    (removed, entries.is_empty())
                });
            if let Some((_, true)) = removed {
                ledger.remove(operation_class);
            }
            if ledger.is_empty() {
                record.remove(PENDING_KEY);
            }
            removed.is_some_and(|(r, _)| r)
        })
        .unwrap_or(false)
}

/// Removes pending entries and returns them, keyed by class, in one exclusive
/// update. `None` takes every class.
pub fn try_take(
    store: &SessionStore,
    operation_class: Option<&str>,
) -> Result<BTreeMap<String, StateValue>, GuardError> {
    store.try_update(|record| {
        let ledger = record.map_entry(PENDING_KEY);
        let taken = match operation_class {
            Some(class) => ledger
                .remove(class)
                .map(|entries| BTreeMap::from([(class.to_string(), entries)]))
                .unwrap_or_default(),
            None => std::mem::take(ledger),
        };
        if ledger.is_empty() {
            record.remove(PENDING_KEY);
        }
        taken
    })
}

/// Drops every pending entry of one class.
pub fn clear_class(store: &SessionStore, operation_class: &str) {
    if let Err(err) = try_take(store, Some(operation_class)) {
        tracing::warn!(
            target: "hookguard::confirm",
            operation_class,
            error = %err,
            "confirmation_clear_failed"
        );
    }
}
