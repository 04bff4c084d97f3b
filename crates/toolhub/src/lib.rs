//! MCP tool hub.
//!
//! Validates a caller's client/server selection against static configuration, collects the
//! selected servers' tools, and rewrites each tool schema so that `server_credentials` is a
//! required parameter before the catalog is handed to a downstream model client.

pub mod config;
pub mod error;
pub mod http;
pub mod normalizer;
pub mod pipeline;
pub mod registry;
pub mod source;
