//! Minting of OAuth identifiers and secrets.
//!
//! Authorization codes and client secrets must be unguessable: a
//! predictable code is an account-takeover vector. Everything here is
//! drawn from `rand::thread_rng`, which reseeds from the OS entropy pool.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use uuid::Uuid;

/// Generate a new OAuth client identifier.
pub fn new_client_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a new OAuth client secret (64 hex characters).
pub fn new_client_secret() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

/// Generate a single-use authorization code (32 random bytes, URL-safe).
pub fn new_auth_code() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    URL_SAFE_NO_PAD.encode(bytes)
}
