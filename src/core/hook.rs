//! Guard process contract: one JSON request on stdin, one JSON decision on
//! stdout.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::io::{Read, Write};
use std::path::PathBuf;

/// Fields of the host's hook request that guards consume. Unknown fields are
/// ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub hook_event_name: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: JsonValue,
}

impl HookInput {
    pub fn tool_name(&self) -> &str {
        self.tool_name.as_deref().unwrap_or("")
    }

    /// String field of `tool_input`, if present.
    pub fn tool_str(&self, field: &str) -> Option<&str> {
        self.tool_input.get(field).and_then(JsonValue::as_str)
    }
}

/// Parses a request body. `None` means the body was not a valid request.
pub fn parse_input(raw: &str) -> Option<HookInput> {
    match serde_json::from_str::<HookInput>(raw) {
        Ok(input) => Some(input),
        Err(err) => {
            tracing::warn!(target: "hookguard::hook", error = %err, "hook_input_malformed");
            None
        }
    }
}

pub fn read_input(reader: &mut impl Read) -> Option<HookInput> {
    let mut raw = String::new();
    if let Err(err) = reader.read_to_string(&mut raw) {
        tracing::warn!(target: "hookguard::hook", error = %err, "hook_input_unreadable");
        return None;
    }
    parse_input(&raw)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Allow,
    Deny,
}

/// A guard's verdict, rendered in the host's envelope shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Gating verdict for a tool event.
    Gate {
        event: String,
        permission: Permission,
        reason: Option<String>,
    },
    /// Non-gating result with an optional note for the session.
    Continue { message: Option<String> },
    /// Acknowledgement with no payload.
    Empty,
}

impl Decision {
    pub fn allow(event: &str) -> Self {
        Decision::Gate {
            event: event.to_string(),
            permission: Permission::Allow,
            reason: None,
        }
    }

    pub fn deny(event: &str, reason: impl Into<String>) -> Self {
        Decision::Gate {
            event: event.to_string(),
            permission: Permission::Deny,
            reason: Some(reason.into()),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Decision::Gate {
                event,
                permission,
                reason,
            } => {
                let mut output = serde_json::json!({
                    "hookEventName": event,
                    "permissionDecision": permission,
                });
                if let Some(reason) = reason {
                    output["permissionDecisionReason"] = JsonValue::String(reason.clone());
                }
                serde_json::json!({ "hookSpecificOutput": output })
            }
            Decision::Continue { message } => {
                let mut output = serde_json::json!({ "continue": true });
                if let Some(message) = message {
                    output["message"] = JsonValue::String(message.clone());
                }
                output
            }
            Decision::Empty => serde_json::json!({}),
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(
            self,
            Decision::Gate {
                permission: Permission::Deny,
                ..
            }
        )
    }
}

/// Writes the decision as a single line of JSON.
pub fn emit(writer: &mut impl Write, decision: &Decision) -> std::io::Result<()> {
    writeln!(writer, "{}", decision.to_json())?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deny_envelope_shape() {
        let json = Decision::deny("PreToolUse", "nope").to_json();
        assert_eq!(json["hookSpecificOutput"]["hookEventName"], "PreToolUse");
        assert_eq!(json["hookSpecificOutput"]["permissionDecision"], "deny");
        assert_eq!(json["hookSpecificOutput"]["permissionDecisionReason"], "nope");
    }

    #[test]
    fn test_allow_envelope_has_no_reason() {
        let json = Decision::allow("PreToolUse").to_json();
        assert_eq!(json["hookSpecificOutput"]["permissionDecision"], "allow");
        assert!(json["hookSpecificOutput"].get("permissionDecisionReason").is_none());
    }

    #[test]
    fn test_continue_and_empty_envelopes() {
        assert_eq!(
            Decision::Continue { message: None }.to_json(),
            serde_json::json!({"continue": true})
        );
        assert_eq!(Decision::Empty.to_json(), serde_json::json!({}));
    }

    #[test]
    fn test_parse_input_ignores_unknown_fields() {
        let raw = serde_json::json!({
            "session_id": "s1",
            "tool_name": "Bash",
            "tool_input": {"command": "ls"},
            "extra": 1
        })
        .to_string();
        let input = parse_input(&raw).unwrap();
        assert_eq!(input.session_id.as_deref(), Some("s1"));
        assert_eq!(input.tool_str("command"), Some("ls"));
    }

    #[test]
    fn test_parse_input_rejects_garbage() {
        assert!(parse_input("{not json").is_none());
        assert!(parse_input("[1,2]").is_none());
    }
}
