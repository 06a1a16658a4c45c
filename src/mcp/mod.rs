//! Model Context Protocol (MCP) bridge
//!
//! Exposes the inventory read-only, as tools and as `svcmap://` resources,
//! to AI agents holding an API key. Built on rmcp's streamable HTTP
//! transport in stateless JSON mode.
//!
//! - **tools**: tool parameters and their implementations
//! - **resources**: resource listing and URI resolution
//! - **server**: the `ServerHandler` and its tool router
//! - **service**: the tower service mounted at `/mcp`

pub mod resources;
mod server;
mod service;
pub mod tools;

#[cfg(test)]
mod server_test;

pub use server::McpServer;
pub use service::create_mcp_service;
