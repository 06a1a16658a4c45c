//! API key issuing and verification.
//!
//! Keys look like `sk_<8 hex>_<secret>`. The `sk_<8 hex>` part is stored in
//! clear and used to find the row; the whole key is stored as an Argon2id
//! hash.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::{DateTime, Utc};
use rand::RngCore;
use tracing::{debug, warn};

use super::{AuthError, AuthResult, random_token};
use crate::db::{ApiKey, ApiKeyRepository, Database, Id, NewApiKey};

pub const KEY_PREFIX: &str = "sk_";
const PREFIX_HEX_LEN: usize = 8;

/// A freshly generated key. `plain` is shown to the user once and never stored.
#[derive(Debug, Clone)]
pub struct GeneratedKey {
    pub prefix: String,
    pub plain: String,
    pub hash: String,
}

/// Generate a new key and its hash.
pub fn generate() -> AuthResult<GeneratedKey> {
    let mut id = [0u8; PREFIX_HEX_LEN / 2];
    rand::thread_rng().fill_bytes(&mut id);
    let prefix = format!("{}{}", KEY_PREFIX, hex::encode(id));
    let plain = format!("{}_{}", prefix, random_token());
    let hash = hash_key(&plain)?;

    Ok(GeneratedKey {
        prefix,
        plain,
        hash,
    })
}

pub fn hash_key(plain: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash {
            message: e.to_string(),
        })
}

/// Constant-time check of `plain` against a stored PHC hash string.
pub fn verify_key(plain: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored API key hash is unparseable: {}", e);
            false
        }
    }
}

/// Extract the lookup prefix (`sk_` + 8 hex chars) from a presented key.
pub fn parse_prefix(token: &str) -> Option<&str> {
    let prefix_len = KEY_PREFIX.len() + PREFIX_HEX_LEN;
    let rest = token.strip_prefix(KEY_PREFIX)?;
    let hex = rest.get(..PREFIX_HEX_LEN)?;
    if !hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
        return None;
    }
    let secret = rest.get(PREFIX_HEX_LEN..)?.strip_prefix('_')?;
    if secret.is_empty() {
        return None;
    }
    Some(&token[..prefix_len])
}

/// Generate and persist a key. Returns the stored row and the plain key.
pub async fn issue<D: Database>(
    db: &D,
    user_id: Option<Id>,
    name: &str,
    expires_at: Option<DateTime<Utc>>,
) -> AuthResult<(ApiKey, String)> {
    let generated = generate()?;
    let stored = db
        .api_keys()
        .create(&NewApiKey {
            user_id,
            name: name.to_string(),
            key_prefix: generated.prefix,
            key_hash: generated.hash,
            permissions: vec![],
            expires_at,
        })
        .await?;
    debug!(key_prefix = %stored.key_prefix, "Issued API key");
    Ok((stored, generated.plain))
}

/// Resolve a presented key to its stored row and stamp `last_used_at`.
pub async fn authenticate<D: Database>(db: &D, token: &str) -> AuthResult<ApiKey> {
    let prefix = parse_prefix(token).ok_or(AuthError::InvalidKey)?;
    let key = db
        .api_keys()
        .get_by_prefix(prefix)
        .await?
        .ok_or(AuthError::InvalidKey)?;

    if key.is_expired(Utc::now()) {
        return Err(AuthError::ExpiredKey);
    }
    if !verify_key(token, &key.key_hash) {
        return Err(AuthError::InvalidKey);
    }

    db.api_keys().touch(key.id).await?;
    Ok(key)
}
