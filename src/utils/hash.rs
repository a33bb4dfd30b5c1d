//! Faster hashing by ignoring cryptographic security needs.
//!
//! Based on the Fx algorithm extracted from the rustc compiler, by way of the
//! `fxhash` crate.

use std::hash::Hash;

/// A `HashMap` using a default Fx hasher.
pub type FastHashMap<K, V> = ::fxhash::FxHashMap<K, V>;

/// A `HashSet` using a default Fx hasher.
pub type FastHashSet<V> = ::fxhash::FxHashSet<V>;

/// A convenience function for when you need a quick 64-bit hash.
#[inline]
pub fn hash64<T: Hash + ?Sized>(v: &T) -> u64 {
    ::fxhash::hash64(v)
}
