//! Flexdex Server Library
//!
//! MCP server and command-line front end for the flexdex API surface index:
//! tool handlers, a generation-keyed result cache and an index directory
//! watcher around a shared [`flexdex_core::SnapshotStore`].

pub mod backend;
pub mod cache;
pub mod error;
pub mod handlers;
pub mod mcp;
pub mod watcher;

pub use backend::FlexdexBackend;
pub use error::{ServerError, ServerResult};
