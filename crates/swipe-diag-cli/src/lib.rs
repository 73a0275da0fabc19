//! Support-triage tool for Swipe diagnostic log stores
//!
//! Opens a log directory written by either backend and lets support staff
//! list, export, inspect and clear it without the app running.

pub mod commands;
pub mod config;

pub use commands::Store;
pub use config::{ClearTarget, Cli, Command};
