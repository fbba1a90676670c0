//! hookguard: shared state for short-lived hook guards
//!
//! Hosts that run hooks (pre-tool-use, session-start, prompt-submit, ...) start
//! a fresh process for every event. Guards that need to remember anything
//! across those processes, or to ask "are you sure?" before letting an action
//! through, coordinate through a per-session JSON record on local disk.
//!
//! # Primitives
//!
//! - [`core::store::SessionStore`]: lock-protected read and read-modify-write
//!   of the session record (`flock`, shared/exclusive)
//! - [`core::session`]: session key derivation and logical-session boundaries
//! - [`core::run_once`]: collapse duplicate invocations inside a time window
//! - [`core::membership`]: ordered, duplicate-free accumulation
//! - [`core::confirm`]: repeat-to-confirm, one ledger slot per fingerprint
//! - [`core::registry`]: which guards ran this session
//!
//! Every primitive has a `try_*` form that reports errors and a fail-open form
//! that logs and returns the permissive default. Guards use the fail-open
//! forms: a broken state file must never block the host's work.
//!
//! # Guards
//!
//! ```bash
//! echo '{"session_id":"abc"}' | hookguard guard session-start
//! echo '{"tool_name":"Bash","tool_input":{"command":"git push origin main"}}' \
//!     | hookguard guard push-guard
//! hookguard state show
//! ```

mod cli;
pub mod core;
pub mod plugins;

use crate::cli::{Cli, Command, StateCli, StateCommand};
use crate::core::config::GuardConfig;
use crate::core::error::GuardError;
use crate::core::store::SessionStore;
use crate::core::value::StateValue;
use crate::core::{config, confirm, logging, session, time};
use clap::Parser;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

pub fn run() -> Result<(), GuardError> {
    let cli = Cli::parse();
    let (config, config_error) = match GuardConfig::load() {
        Ok(config) => (config, None),
        Err(err) => {
            let fallback = std::env::var_os(config::STATE_DIR_ENV)
                .map(GuardConfig::with_state_dir)
                .unwrap_or_default();
            (fallback, Some(err))
        }
    };
    logging::init_tracing(&config.log_filter);
    if let Some(err) = config_error {
        tracing::warn!(
            target: "hookguard::config",
            error = %err,
            "config_invalid_using_defaults"
        );
    }

    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    match cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
        }
        Command::Guard { kind } => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            // A guard always exits cleanly; the host treats a failed hook as an error.
            let result = plugins::run_guard(
                kind,
                config,
                &current_dir,
                &mut stdin.lock(),
                &mut stdout.lock(),
            );
            if let Err(err) = result {
                tracing::error!(
                    target: "hookguard::guard",
                    guard = kind.name(),
                    error = %err,
                    "guard_output_failed"
                );
            }
        }
        Command::SessionKey { dir } => {
            let dir = dir.unwrap_or(current_dir);
            let key = session::derive_session_key(&dir);
            print_json(&time::command_envelope(
                "session-key",
                "ok",
                serde_json::json!({ "dir": dir, "session_key": key }),
            ))?;
        }
        Command::State(state_cli) => run_state_cli(&config, &current_dir, state_cli)?,
    }
    Ok(())
}

fn run_state_cli(
    config: &GuardConfig,
    current_dir: &Path,
    cli: StateCli,
) -> Result<(), GuardError> {
    let dir = cli.dir.unwrap_or_else(|| current_dir.to_path_buf());
    let store = session::open_session(config, &dir)?;
    let envelope = match cli.command {
        StateCommand::Show => {
            let record = store.try_read()?;
            time::command_envelope(
                "state.show",
                "ok",
                serde_json::json!({ "session_key": store.key(), "state": record.to_json() }),
            )
        }
        StateCommand::Path => time::command_envelope(
            "state.path",
            "ok",
            serde_json::json!({
                "session_key": store.key(),
                "state_path": store.state_path(),
                "lock_path": store.lock_path(),
            }),
        ),
        StateCommand::Set { key, value } => {
            let parsed =
                serde_json::from_str::<JsonValue>(&value).unwrap_or(JsonValue::String(value));
            let value = StateValue::from_json(parsed).ok_or_else(|| {
                GuardError::InvalidInput(format!("cannot store null under '{}'", key))
            })?;
            store.try_update(|record| record.insert(key.as_str(), value))?;
            time::command_envelope("state.set", "ok", serde_json::json!({ "key": key }))
        }
        StateCommand::Clear { key, all } => {
            let removed = match (key, all) {
                (_, true) => store.try_update(|record| {
                    let keys: Vec<String> = record.keys().cloned().collect();
                    record.clear();
                    keys
                })?,
                (Some(key), false) => store.try_update(|record| {
                    record.remove(&key).map(|_| vec![key.clone()]).unwrap_or_default()
                })?,
                (None, false) => {
                    return Err(GuardError::InvalidInput(
                        "state clear needs a key or --all".to_string(),
                    ));
                }
            };
            time::command_envelope(
                "state.clear",
                "ok",
                serde_json::json!({ "removed": removed }),
            )
        }
        StateCommand::Pending { class, clear } => {
            pending_command(&store, class.as_deref(), clear)?
        }
    };
    print_json(&envelope)
}

fn pending_command(
    store: &SessionStore,
    class: Option<&str>,
    clear: bool,
) -> Result<JsonValue, GuardError> {
    let pending = if clear {
        confirm::try_take(store, class)?
    } else {
        let ledger = store
            .try_read()?
            .get(confirm::PENDING_KEY)
            .and_then(StateValue::as_map)
            .cloned()
            .unwrap_or_default();
        match class {
            Some(class) => ledger.into_iter().filter(|(k, _)| k == class).collect(),
            None => ledger,
        }
    };
    let cmd = if clear { "state.pending.clear" } else { "state.pending" };
    Ok(time::command_envelope(
        cmd,
        "ok",
        serde_json::json!({ "pending": StateValue::Map(pending).to_json() }),
    ))
}

fn print_json(value: &JsonValue) -> Result<(), GuardError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
