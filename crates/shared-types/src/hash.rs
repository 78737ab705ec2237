//! Hashing helpers.
//!
//! All content hashes in the protocol are Keccak-256.

use primitive_types::H256;
use serde::Serialize;
use sha3::{Digest, Keccak256};

/// Compute the Keccak-256 hash of raw bytes.
#[inline]
pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    H256::from_slice(&hasher.finalize())
}

/// Hash a value over its canonical encoding.
///
/// JSON struct fields serialize in declaration order, so two values of
/// the same type with equal fields always hash identically.
pub fn canonical_hash<T: Serialize>(value: &T) -> H256 {
    // Serialization of our own types cannot fail; fall back to hashing
    // the empty encoding rather than panicking in consensus code.
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    keccak256(&bytes)
}
