//! API key generation and validation.
//!
//! Keys are `sk-netutil-` followed by exactly 32 alphanumeric characters,
//! drawn from the OS-seeded CSPRNG. A configured key only moves the SSE
//! path; there is no bearer authentication beyond URL secrecy.

use rand::distributions::Alphanumeric;
use rand::Rng;

pub const API_KEY_PREFIX: &str = "sk-netutil-";

const API_KEY_RANDOM_LEN: usize = 32;

/// Generate a fresh API key.
pub fn generate_api_key() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", API_KEY_PREFIX, suffix)
}

/// Check prefix, length and alphabet.
pub fn is_valid_api_key(key: &str) -> bool {
    match key.strip_prefix(API_KEY_PREFIX) {
        Some(suffix) => {
            suffix.len() == API_KEY_RANDOM_LEN
                && suffix.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}
