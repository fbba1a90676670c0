//! Repeat-to-confirm for `git push` to protected branches.
//!
//! The first push to a protected branch is denied with an explanation; running
//! the identical push again goes through. Normal and force pushes to the same
//! branch are separate confirmations. Every `git push` in a chained command and
//! every refspec of each push is checked.

use super::GuardContext;
use crate::core::confirm::{self, Verdict};
use crate::core::hook::{Decision, HookInput};
use crate::core::value::StateValue;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

pub const OPERATION_CLASS: &str = "protected-push";

static GIT_PUSH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bgit(?:\s+-C\s+\S+)?\s+push\b(?P<args>[^;&|]*)").unwrap()
});

const FORCE_FLAGS: &[&str] = &["--force", "-f", "--force-with-lease", "--force-if-includes"];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PushTarget {
    pub branch: String,
    pub force: bool,
}

impl PushTarget {
    pub fn mode(&self) -> &'static str {
        if self.force { "force" } else { "normal" }
    }

    fn label(&self) -> String {
        format!("{}:{}", self.branch, self.mode())
    }
}

/// Extracts every destination branch named by the `git push` invocations in a
/// shell command, in command order.
///
/// A push that names no refspec (a bare `git push` or `git push origin`)
/// contributes nothing.
pub fn parse_pushes(command: &str) -> Vec<PushTarget> {
    let mut targets = Vec::new();
    for caps in GIT_PUSH.captures_iter(command) {
        let args: Vec<&str> = caps["args"].split_whitespace().collect();
        let force = args
            .iter()
            .any(|a| FORCE_FLAGS.contains(a) || a.starts_with("--force-with-lease="));
        // The first positional is the remote; everything after it is a refspec.
        let refspecs = args.iter().copied().filter(|a| !a.starts_with('-')).skip(1);
        for refspec in refspecs {
            let target = match refspec.strip_prefix('+') {
                Some(stripped) => PushTarget {
                    branch: branch_of(stripped),
                    force: true,
                },
                None => PushTarget {
                    branch: branch_of(refspec),
                    force,
                },
            };
            targets.push(target);
        }
    }
    targets
}

fn branch_of(refspec: &str) -> String {
    let dst = refspec.rsplit(':').next().unwrap_or(refspec);
    let dst = dst.strip_prefix("refs/heads/").unwrap_or(dst);
    dst.rsplit('/').next().unwrap_or(dst).to_string()
}

/// Protected targets of a command, sorted and without duplicates.
pub fn protected_targets(command: &str, protected_branches: &[String]) -> Vec<PushTarget> {
    let mut targets: Vec<PushTarget> = parse_pushes(command)
        .into_iter()
        .filter(|t| protected_branches.iter().any(|b| *b == t.branch))
        .collect();
    targets.sort();
    targets.dedup();
    targets
}

pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Decision {
    let event = input.hook_event_name.as_deref().unwrap_or("PreToolUse");
    if input.tool_name() != "Bash" {
        return Decision::allow(event);
    }
    let Some(command) = input.tool_str("command") else {
        return Decision::allow(event);
    };
    let targets = protected_targets(command, &ctx.config.protected_branches);
    if targets.is_empty() {
        return Decision::allow(event);
    }

    let labels: Vec<String> = targets.iter().map(PushTarget::label).collect();
    let parts: Vec<&str> = labels.iter().map(String::as_str).collect();
    let fingerprint = confirm::fingerprint_parts(OPERATION_CLASS, &parts);
    let mut metadata = BTreeMap::new();
    metadata.insert("targets".to_string(), StateValue::from(labels.clone()));
    metadata.insert("command".to_string(), StateValue::from(command));

    match confirm::evaluate(&ctx.store, OPERATION_CLASS, &fingerprint, StateValue::Map(metadata)) {
        Verdict::Confirmed { .. } => {
            tracing::info!(
                target: "hookguard::push",
                targets = %labels.join(","),
                "protected_push_confirmed"
            );
            Decision::allow(event)
        }
        Verdict::FirstAttempt => Decision::deny(event, denial_reason(&targets)),
    }
}

fn denial_reason(targets: &[PushTarget]) -> String {
    let branches: Vec<String> = targets.iter().map(|t| format!("'{}'", t.branch)).collect();
    let branches = branches.join(", ");
    if targets.iter().any(|t| t.force) {
        format!(
            "Force push to protected branch {} rewrites remote history.\n\
             Only proceed if the local branch is known-good and nobody else works on it.\n\
             Repeat the same command to confirm.",
            branches
        )
    } else {
        format!(
            "Direct push to protected branch {}.\n\
             Prefer a feature branch and a pull request.\n\
             Repeat the same command to confirm.",
            branches
        )
    }
}
