//! # Swipe Diagnostics Core
//!
//! Core types and errors for the Swipe diagnostics and audit logging stack.
//!
//! This crate holds the data model shared by the storage backends, the
//! logger facade and the export engine. It has no I/O of its own.
//!
//! ## Key Types
//!
//! - [`LogEntry`]: One immutable structured record
//! - [`LogLevel`]: Ordered severity (`debug < info < warn < error < audit`)
//! - [`LogStream`]: The two physically separate channels, `logs` and `audit`
//! - [`ContextValue`] / [`ContextMap`]: Untyped caller context as a tagged union
//! - [`SessionContext`]: Per-process session metadata attached to every entry
//! - [`HostCapabilities`]: Explicit host probe resolved once at startup

pub mod entry;
pub mod error;
pub mod level;
pub mod session;
pub mod value;

// Re-export main types
pub use entry::*;
pub use error::*;
pub use level::*;
pub use session::*;
pub use value::*;
