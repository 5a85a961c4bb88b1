//! Provably-fair outcome derivation.
//!
//! The outcome of a settled game is reproducible by anyone holding the
//! revealed server seed (`rng_seed`), the player's client seed and the game
//! nonce:
//!
//! ```text
//! digest  = HMAC-SHA256(key = server_seed, message = "{client_seed}-{nonce}")
//! outcome = first 5 hex digits of digest, read as an integer  (0 ..= 0xFFFFF)
//! ```

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Number of hex digits of the digest that make up the outcome.
const OUTCOME_HEX_DIGITS: usize = 5;

/// Exclusive upper bound of outcome numbers (16^5).
pub const OUTCOME_RANGE: u32 = 1 << (4 * OUTCOME_HEX_DIGITS);

/// Message signed by the server seed.
pub fn outcome_message(client_seed: &str, nonce: u64) -> String {
    format!("{client_seed}-{nonce}")
}

/// Raw HMAC-SHA256 digest the outcome is derived from.
pub fn outcome_hash(server_seed: &str, client_seed: &str, nonce: u64) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(server_seed.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(outcome_message(client_seed, nonce).as_bytes());

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&mac.finalize().into_bytes());
    digest
}

/// Hex form of [`outcome_hash`], as shown to players for verification.
pub fn outcome_hash_hex(server_seed: &str, client_seed: &str, nonce: u64) -> String {
    hex::encode(outcome_hash(server_seed, client_seed, nonce))
}

/// Reduce a digest to the outcome range: the leading 20 bits, big-endian.
pub fn reduce_to_range(digest: &[u8; 32]) -> u32 {
    let leading = u32::from_be_bytes([0, digest[0], digest[1], digest[2]]);
    leading >> 4
}

/// Outcome number for a game. Pure: same seeds and nonce, same number.
pub fn compute_outcome(server_seed: &str, client_seed: &str, nonce: u64) -> u32 {
    reduce_to_range(&outcome_hash(server_seed, client_seed, nonce))
}
