//! svcmap: inventory and dependency map for servers and services.

pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod graph;
pub mod mcp;
pub mod paths;
pub mod serde_utils;

/// Install the ring crypto provider for rustls. Safe to call repeatedly.
pub fn init_crypto() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}
