//! CLI struct definitions for the hookguard command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use crate::plugins::GuardKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "hookguard",
    version = env!("CARGO_PKG_VERSION"),
    about = "Session-scoped coordination for short-lived hook guards: shared state, \
             run-once dedupe and repeat-to-confirm gating."
)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Run a guard: read one hook request on stdin, write one decision on stdout
    #[clap(name = "guard")]
    Guard {
        #[clap(value_enum)]
        kind: GuardKind,
    },

    /// Inspect or edit the session state record
    #[clap(name = "state", visible_alias = "s")]
    State(StateCli),

    /// Print the session key derived from a directory
    #[clap(name = "session-key")]
    SessionKey {
        /// Directory to derive from (defaults to the current directory).
        #[clap(long)]
        dir: Option<PathBuf>,
    },

    /// Show version information
    #[clap(name = "version")]
    Version,
}

#[derive(clap::Args, Debug)]
pub(crate) struct StateCli {
    /// Session directory (defaults to the current directory).
    #[clap(long, global = true)]
    pub dir: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: StateCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum StateCommand {
    /// Print the full record
    Show,
    /// Print the backing and lock file paths
    Path,
    /// Set one key to a JSON value (bare words are stored as strings)
    Set {
        key: String,
        value: String,
    },
    /// Remove one key, or every key with --all
    Clear {
        key: Option<String>,
        #[clap(long, conflicts_with = "key")]
        all: bool,
    },
    /// List pending confirmations for one class, or all classes
    Pending {
        #[clap(long)]
        class: Option<String>,
        /// Drop the listed entries and print what was removed
        #[clap(long)]
        clear: bool,
    },
}
