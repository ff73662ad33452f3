//! Process-local identities for definition types and operator pools.
//!
//! Two definition types built from the same signature are still distinct
//! types, exactly like two classes with the same body. Each build therefore
//! receives a fresh token and type equality is token equality.
//!
//! Tokens are **not** serialized; schema digests are the stable identity.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DEFN_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

fn next(counter: &AtomicU64) -> NonZeroU64 {
    let raw = counter.fetch_add(1, Ordering::Relaxed);
    // Counters start at 1 and would need 2^64 builds to wrap.
    NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN)
}

/// Identity of a built definition type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefnId(NonZeroU64);

impl DefnId {
    pub fn new() -> Self {
        Self(next(&NEXT_DEFN_ID))
    }

    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

impl Default for DefnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DefnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "defn#{}", self.raw())
    }
}

/// Identity of an operator pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolId(NonZeroU64);

impl PoolId {
    pub fn new() -> Self {
        Self(next(&NEXT_POOL_ID))
    }

    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

impl Default for PoolId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = DefnId::new();
        let b = DefnId::new();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
        assert_ne!(PoolId::new(), PoolId::new());
    }
}
