//! Stable content hashing for persisted state.
//!
//! `FxHasher` is seed-free, so the same bytes hash identically across runs
//! of the same build. The report layer tolerates a hasher change across
//! builds (it costs one full invalidation), which keeps us off heavyweight
//! cryptographic hashes for what is purely a change-detection signal.

use std::hash::Hasher;

use rustc_hash::FxHasher;

/// Hash raw bytes to a u64.
pub fn stable_hash(bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(bytes);
    hasher.finish()
}

/// Hash raw bytes to a fixed-width hex string.
pub fn stable_hash_hex(bytes: &[u8]) -> String {
    format!("{:016x}", stable_hash(bytes))
}

/// Hash a collection of strings order-independently: sort, join, hash.
pub fn hash_sorted<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sorted: Vec<String> = items
        .into_iter()
        .map(|item| item.as_ref().to_string())
        .collect();
    sorted.sort();
    stable_hash_hex(sorted.join(",").as_bytes())
}
