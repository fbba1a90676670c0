//! Records which repositories file tools touch during a session.
//!
//! The context id of a path is the directory name of its nearest ancestor that
//! contains `.git`. Paths outside any repository contribute nothing.

use super::GuardContext;
use crate::core::hook::{Decision, HookInput};
use crate::core::membership;
use std::path::Path;

pub const ACTIVE_CONTEXTS_KEY: &str = "active_contexts";

pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Decision {
    let event = input.hook_event_name.as_deref().unwrap_or("PreToolUse");
    let Some(raw_path) = tool_path(input) else {
        return Decision::allow(event);
    };
    let path = ctx.resolve(raw_path);
    if let Some(context_id) = context_for_path(&path)
        && membership::add(&ctx.store, ACTIVE_CONTEXTS_KEY, &context_id)
    {
        tracing::info!(target: "hookguard::context", context = %context_id, "context_tracked");
    }
    Decision::allow(event)
}

fn tool_path(input: &HookInput) -> Option<&str> {
    let path = match input.tool_name() {
        "Read" | "Edit" | "Write" => input.tool_str("file_path"),
        "Glob" | "Grep" => input.tool_str("path"),
        _ => None,
    };
    path.filter(|p| !p.is_empty())
}

pub fn context_for_path(path: &Path) -> Option<String> {
    let start = if path.is_dir() { path } else { path.parent()? };
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .and_then(|root| root.file_name())
        .map(|name| name.to_string_lossy().to_string())
}
