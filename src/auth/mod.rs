//! Authentication: API keys for the REST API and MCP bridge, OAuth login and
//! cookie sessions for the web pages.

pub mod api_key;
mod error;
pub mod oauth;
pub mod session;


use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

pub use error::{AuthError, AuthResult};

/// 32 random bytes, URL-safe base64 without padding.
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
