use near_sdk::{env, CryptoHash};

use crate::errors::HtlcError;

/// Unique identifier of an HTLC: the SHA-256 commitment to its secret.
pub type HashLock = CryptoHash;

pub const HASH_LOCK_LENGTH: usize = 32;

/// Computes the hash lock for `secret`. A non-zero `timestamp` is appended to
/// the secret as a big-endian u64 before hashing.
pub fn derive_hash_lock(secret: &[u8], timestamp: u64) -> HashLock {
    if timestamp > 0 {
        let mut salted = Vec::with_capacity(secret.len() + 8);
        salted.extend_from_slice(secret);
        salted.extend_from_slice(&timestamp.to_be_bytes());
        return env::sha256_array(&salted);
    }

    env::sha256_array(secret)
}

/// Parses a hex encoded hash lock, as used in JSON arguments and genesis keys.
pub fn parse_hash_lock(hash_lock: &str) -> Result<HashLock, HtlcError> {
    let bytes = hex::decode(hash_lock)
        .map_err(|e| HtlcError::InvalidHashLock(format!("{hash_lock}: {e}")))?;

    bytes.try_into().map_err(|bytes: Vec<u8>| {
        HtlcError::InvalidHashLock(format!(
            "{hash_lock}: expected {HASH_LOCK_LENGTH} bytes, got {}",
            bytes.len()
        ))
    })
}

pub fn hash_lock_to_hex(hash_lock: &HashLock) -> String {
    hex::encode(hash_lock)
}
