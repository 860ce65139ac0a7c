//! MCP (Model Context Protocol) Server Module
//!
//! Exposes the index to AI clients as seven tools.
//!
//! ## Usage
//!
//! ```bash
//! flexdex --index-dir /path/to/index serve --watch
//! ```
//!
//! The MCP server communicates via stdio using line-delimited JSON-RPC 2.0.

pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::*;
pub use server::McpServer;
