//! Minimal Solidity ABI helpers for single-argument governance calls.

use crate::domain::Calldata;
use sha3::{Digest, Keccak256};

pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// First four bytes of the Keccak-256 of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encode `signature(uint256)` called with `value`.
pub fn encode_uint256_call(signature: &str, value: u128) -> Calldata {
    let mut data = Vec::with_capacity(4 + 32);
    data.extend_from_slice(&selector(signature));
    data.extend_from_slice(&[0u8; 16]);
    data.extend_from_slice(&value.to_be_bytes());
    Calldata(data)
}

/// Hash the governor uses to identify a proposal's description.
pub fn description_hash(description: &str) -> [u8; 32] {
    keccak256(description.as_bytes())
}
