use hookguard::core::config::GuardConfig;
use hookguard::core::confirm;
use hookguard::core::membership;
use hookguard::core::registry;
use hookguard::core::session;
use hookguard::plugins::push_guard::OPERATION_CLASS;
use hookguard::plugins::{GuardKind, run_guard};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

struct Harness {
    _tmp: tempfile::TempDir,
    config: GuardConfig,
    project: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let state_dir = tmp.path().join("state");
        let project = tmp.path().join("project");
        fs::create_dir_all(&state_dir).unwrap();
        fs::create_dir_all(&project).unwrap();
        Self {
            config: GuardConfig::with_state_dir(&state_dir),
            project,
            _tmp: tmp,
        }
    }

    fn run(&self, kind: GuardKind, input: &str) -> Value {
        let mut stdin = input.as_bytes();
        let mut stdout = Vec::new();
        run_guard(kind, self.config.clone(), &self.project, &mut stdin, &mut stdout).unwrap();
        let text = String::from_utf8(stdout).unwrap();
        assert_eq!(text.lines().count(), 1, "guard must emit exactly one document");
        serde_json::from_str(&text).unwrap()
    }

    fn push(&self, command: &str) -> String {
        decision(&self.run(GuardKind::PushGuard, &bash(command))).to_string()
    }

    fn store(&self) -> hookguard::core::store::SessionStore {
        session::open_session(&self.config, &self.project).unwrap()
    }
}

fn bash(command: &str) -> String {
    serde_json::json!({
        "hook_event_name": "PreToolUse",
        "tool_name": "Bash",
        "tool_input": { "command": command }
    })
    .to_string()
}

fn read(path: &Path) -> String {
    serde_json::json!({"tool_name": "Read", "tool_input": {"file_path": path}}).to_string()
}

fn decision(output: &Value) -> &str {
    output["hookSpecificOutput"]["permissionDecision"].as_str().unwrap()
}

#[test]
fn test_malformed_input_gets_permissive_fallback() {
    let h = Harness::new();
    assert_eq!(decision(&h.run(GuardKind::PushGuard, "{oops")), "allow");
    assert_eq!(decision(&h.run(GuardKind::ContextTracker, "")), "allow");
    assert_eq!(h.run(GuardKind::SessionStart, "nope"), serde_json::json!({}));
    assert_eq!(h.run(GuardKind::SearchGuard, "nope"), serde_json::json!({"continue": true}));
}

#[test]
fn test_push_to_protected_branch_needs_repeat() {
    let h = Harness::new();
    let first = h.run(GuardKind::PushGuard, &bash("git push origin main"));
    assert_eq!(decision(&first), "deny");
    assert!(
        first["hookSpecificOutput"]["permissionDecisionReason"]
            .as_str()
            .unwrap()
            .contains("Repeat the same command")
    );
    assert_eq!(h.push("git push origin main"), "allow");
    assert!(confirm::pending(&h.store(), OPERATION_CLASS).is_empty());
}

#[test]
fn test_interleaved_pushes_confirm_independently() {
    let h = Harness::new();
    assert_eq!(h.push("git push origin main"), "deny");
    assert_eq!(h.push("git push origin develop"), "deny");
    assert_eq!(h.push("git push origin main"), "allow");
    assert_eq!(h.push("git push origin develop"), "allow");
}

#[test]
fn test_force_push_is_a_separate_confirmation() {
    let h = Harness::new();
    assert_eq!(h.push("git push origin main"), "deny");
    assert_eq!(h.push("git push --force origin main"), "deny");
    assert_eq!(h.push("git push --force origin main"), "allow");
    assert_eq!(confirm::pending(&h.store(), OPERATION_CLASS).len(), 1);
}

#[test]
fn test_chained_push_to_protected_branch_needs_repeat() {
    let h = Harness::new();
    assert_eq!(h.push("git push origin feat && git push origin main"), "deny");
    assert_eq!(h.push("git push origin feat && git push origin main"), "allow");
}

#[test]
fn test_multi_refspec_push_checks_every_branch() {
    let h = Harness::new();
    assert_eq!(h.push("git push origin main feat"), "deny");
    assert_eq!(h.push("git push origin main feat"), "allow");

    // Same protected set, different command: one confirmation covers both.
    assert_eq!(h.push("git push origin develop main"), "deny");
    assert_eq!(h.push("git push origin main && git push origin develop"), "allow");
    assert!(confirm::pending(&h.store(), OPERATION_CLASS).is_empty());
}

#[test]
fn test_unprotected_and_non_push_commands_pass() {
    let h = Harness::new();
    assert_eq!(h.push("git push origin feature/login"), "allow");
    assert_eq!(h.push("ls -la"), "allow");
    let read_x = read(Path::new("/x"));
    assert_eq!(decision(&h.run(GuardKind::PushGuard, &read_x)), "allow");
}

#[test]
fn test_guards_register_themselves() {
    let h = Harness::new();
    h.run(GuardKind::PushGuard, &bash("ls"));
    assert!(registry::is_hook_active(&h.store(), "push-guard"));
    assert!(!registry::is_hook_active(&h.store(), "context-tracker"));
}

#[test]
fn test_session_start_resets_flags_once_per_window() {
    let h = Harness::new();
    assert_eq!(h.push("git push origin main"), "deny");

    assert_eq!(h.run(GuardKind::SessionStart, r#"{"session_id": "s1"}"#), serde_json::json!({}));
    assert!(confirm::pending(&h.store(), OPERATION_CLASS).is_empty());

    // A second installation firing inside the window is skipped.
    assert!(h.store().get("_run_once_session-start").is_some());
    assert_eq!(h.run(GuardKind::SessionStart, r#"{"session_id": "s2"}"#), serde_json::json!({}));
    assert_eq!(
        h.store().get(session::LOGICAL_SESSION_KEY).and_then(|v| v.as_str().map(str::to_string)),
        Some("s1".to_string())
    );
}

#[test]
fn test_context_tracker_collects_repositories() {
    let h = Harness::new();
    let repo_a = h.project.join("repo-a");
    let repo_b = h.project.join("repo-b");
    for repo in [&repo_a, &repo_b] {
        fs::create_dir_all(repo.join(".git")).unwrap();
        fs::create_dir_all(repo.join("src")).unwrap();
    }
    let first = h.run(GuardKind::ContextTracker, &read(&repo_b.join("src/lib.rs")));
    assert_eq!(decision(&first), "allow");
    h.run(GuardKind::ContextTracker, &read(&repo_a.join("src/main.rs")));
    h.run(GuardKind::ContextTracker, &read(&repo_b.join("Cargo.toml")));
    let grep =
        serde_json::json!({"tool_name": "Grep", "tool_input": {"path": "repo-a/src"}}).to_string();
    h.run(GuardKind::ContextTracker, &grep);

    assert_eq!(
        membership::members(&h.store(), "active_contexts"),
        vec!["repo-b", "repo-a"]
    );

    let output = h.run(GuardKind::SearchGuard, "{}");
    assert_eq!(output["continue"], true);
    assert!(output["message"].as_str().unwrap().contains("repo-b, repo-a"));
}

#[test]
fn test_context_tracker_ignores_paths_outside_repositories() {
    let h = Harness::new();
    let input = serde_json::json!({
        "tool_name": "Write",
        "tool_input": {"file_path": h.project.join("notes.txt")}
    })
    .to_string();
    assert_eq!(decision(&h.run(GuardKind::ContextTracker, &input)), "allow");
    assert!(membership::members(&h.store(), "active_contexts").is_empty());
}

#[test]
fn test_input_cwd_selects_the_session() {
    let h = Harness::new();
    let elsewhere = h.project.join("elsewhere");
    let input = serde_json::json!({
        "cwd": elsewhere,
        "tool_name": "Bash",
        "tool_input": {"command": "git push origin main"}
    })
    .to_string();
    h.run(GuardKind::PushGuard, &input);
    assert!(confirm::pending(&h.store(), OPERATION_CLASS).is_empty());
    let other = session::open_session(&h.config, &elsewhere).unwrap();
    assert_eq!(confirm::pending(&other, OPERATION_CLASS).len(), 1);
}
