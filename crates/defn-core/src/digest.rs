//! Schema digests.
//!
//! A definition type's identity is process-local (see [`crate::token`]), but
//! its *shape* can be fingerprinted. The digest is a simple, deterministic,
//! non-cryptographic hash:
//!
//! - algorithm: **FNV-1a 64-bit**
//! - input: the canonical JSON rendering of the [`Schema`]
//! - output: `"fnv1a64:<16 lowercase hex digits>"`
//!
//! Bases are rendered by name, so two schemas that differ only in which build
//! of a same-named base they refer to hash identically.

use crate::schema::Schema;

/// Prefix used in serialized digests.
pub const SCHEMA_DIGEST_PREFIX: &str = "fnv1a64:";

/// FNV-1a 64-bit over arbitrary bytes, in the `"fnv1a64:<hex>"` encoding.
pub fn fnv1a64_digest_bytes(bytes: &[u8]) -> String {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x00000100000001b3;

    let mut hash = FNV_OFFSET_BASIS;
    for b in bytes {
        hash ^= (*b) as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    format!("{SCHEMA_DIGEST_PREFIX}{hash:016x}")
}

pub fn schema_digest(schema: &Schema) -> String {
    // Object defaults serialize by type name only.
    let canonical = serde_json::to_string(schema).unwrap_or_else(|_| format!("{schema:?}"));
    fnv1a64_digest_bytes(canonical.as_bytes())
}
