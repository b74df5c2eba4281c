//! Password hashing and access-token generation.

use chrono::Duration;
use rand::Rng;
use sha2::{Digest, Sha256};

/// How long a freshly issued access token stays valid.
pub const SESSION_TTL_DAYS: i64 = 30;

pub const TOKEN_PREFIX: &str = "tq_";

const BASE62: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const SALT_LEN: usize = 16;
const TOKEN_LEN: usize = 43;

pub fn session_ttl() -> Duration {
    Duration::days(SESSION_TTL_DAYS)
}

/// SHA-256 hash a string, returning the hex-encoded digest.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn random_base62(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..BASE62.len());
            BASE62[idx] as char
        })
        .collect()
}

/// Generate a new access token: `tq_` + 43 chars of base62.
pub fn generate_token() -> String {
    format!("{TOKEN_PREFIX}{}", random_base62(TOKEN_LEN))
}

/// Hash a password as `salt$hex(sha256(salt + password))`.
pub fn hash_password(password: &str) -> String {
    let salt = random_base62(SALT_LEN);
    let digest = sha256_hex(&format!("{salt}{password}"));
    format!("{salt}${digest}")
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    constant_time_eq(&sha256_hex(&format!("{salt}{password}")), expected)
}

/// Constant-time string comparison.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
