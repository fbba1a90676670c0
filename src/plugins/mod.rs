//! Reference guards built on the core primitives.
//!
//! Each guard is a pure function from a parsed hook request plus a session
//! store to a [`Decision`]. The `guard` CLI wires them to stdin/stdout.

pub mod context_tracker;
pub mod push_guard;
pub mod search_guard;
pub mod session_start;

use crate::core::config::GuardConfig;
use crate::core::error::GuardError;
use crate::core::hook::{self, Decision, HookInput};
use crate::core::session::{self, SessionFlags};
use crate::core::store::SessionStore;
use clap::ValueEnum;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GuardKind {
    /// Dedupe and reset session flags when a new logical session starts
    SessionStart,
    /// Accumulate project contexts touched by file tools
    ContextTracker,
    /// Repeat-to-confirm for pushes to protected branches
    PushGuard,
    /// Remind which contexts are active this session
    SearchGuard,
}

impl GuardKind {
    pub fn name(self) -> &'static str {
        match self {
            GuardKind::SessionStart => "session-start",
            GuardKind::ContextTracker => "context-tracker",
            GuardKind::PushGuard => "push-guard",
            GuardKind::SearchGuard => "search-guard",
        }
    }

    /// Decision emitted when the request cannot be parsed or the store cannot
    /// be opened.
    pub fn fallback(self) -> Decision {
        match self {
            GuardKind::SessionStart => Decision::Empty,
            GuardKind::ContextTracker | GuardKind::PushGuard => Decision::allow("PreToolUse"),
            GuardKind::SearchGuard => Decision::Continue { message: None },
        }
    }
}

/// Everything a guard needs besides the request itself.
#[derive(Debug, Clone)]
pub struct GuardContext {
    pub config: GuardConfig,
    pub store: SessionStore,
    pub flags: SessionFlags,
    pub working_dir: PathBuf,
}

impl GuardContext {
    pub fn open(config: GuardConfig, working_dir: &Path) -> Result<Self, GuardError> {
        let store = session::open_session(&config, working_dir)?;
        let flags = SessionFlags::from_config(&config);
        Ok(Self {
            config,
            store,
            flags,
            working_dir: working_dir.to_path_buf(),
        })
    }

    /// Resolves a possibly relative tool path against the working directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

pub fn evaluate(kind: GuardKind, ctx: &GuardContext, input: &HookInput) -> Decision {
    crate::core::registry::register_hook(&ctx.store, kind.name());
    match kind {
        GuardKind::SessionStart => session_start::evaluate(ctx, input),
        GuardKind::ContextTracker => context_tracker::evaluate(ctx, input),
        GuardKind::PushGuard => push_guard::evaluate(ctx, input),
        GuardKind::SearchGuard => search_guard::evaluate(ctx, input),
    }
}

/// Runs one guard invocation end to end. Never fails the process: malformed
/// input or an unusable store produce the guard's permissive fallback.
pub fn run_guard(
    kind: GuardKind,
    config: GuardConfig,
    process_cwd: &Path,
    stdin: &mut impl Read,
    stdout: &mut impl Write,
) -> Result<(), GuardError> {
    let decision = match hook::read_input(stdin) {
        None => kind.fallback(),
        Some(input) => {
            let working_dir = input.cwd.clone().unwrap_or_else(|| process_cwd.to_path_buf());
            match GuardContext::open(config, &working_dir) {
                Ok(ctx) => evaluate(kind, &ctx, &input),
                Err(err) => {
                    tracing::warn!(
                        target: "hookguard::guard",
                        guard = kind.name(),
                        error = %err,
                        "guard_store_unavailable"
                    );
                    kind.fallback()
                }
            }
        }
    };
    hook::emit(stdout, &decision)?;
    Ok(())
}
