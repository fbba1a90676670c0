//! Coordination primitives shared by every guard.
//!
//! `store` is the only module that touches the filesystem; everything else is
//! a view over the session record it owns.

pub mod config;
pub mod confirm;
pub mod error;
pub mod hook;
pub mod logging;
pub mod membership;
pub mod registry;
pub mod run_once;
pub mod session;
pub mod store;
pub mod time;
pub mod value;
