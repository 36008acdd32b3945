//! Fast hash map and hash set type aliases.
//!
//! This module provides type aliases for [`FxHashMap`] and [`FxHashSet`] from
//! the `rustc-hash` crate. These use the Fx hash algorithm which is
//! approximately 2x faster than the standard library's `HashMap` and `HashSet`
//! for string keys, and every key in this workspace (visited paths, watched
//! directories, subscriber ids) is a string or small integer.
//!
//! # Why `FxHash`?
//!
//! The Fx hash function was originally developed for the Rust compiler
//! (`rustc`). It's optimized for:
//!
//! - String and byte slice keys (common in this codebase)
//! - Small to medium-sized hash tables
//! - Cases where denial-of-service resistance is not required (internal use only)
//!
//! # Examples
//!
//! ```
//! use nw_core::{FxHashSet, fx_hash_set};
//! use camino::Utf8PathBuf;
//!
//! let mut visited: FxHashSet<Utf8PathBuf> = fx_hash_set();
//! assert!(visited.insert(Utf8PathBuf::from("/etc/nginx/nginx.conf")));
//! assert!(!visited.insert(Utf8PathBuf::from("/etc/nginx/nginx.conf")));
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
///
/// This is faster than the standard library's `HashMap` for string keys
/// but does not provide denial-of-service resistance.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
///
/// This is faster than the standard library's `HashSet` for string keys
/// but does not provide denial-of-service resistance.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
///
/// This is equivalent to `FxHashMap::default()` but can be more ergonomic
/// in some contexts due to type inference.
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
///
/// This is equivalent to `FxHashSet::default()` but can be more ergonomic
/// in some contexts due to type inference.
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fx_hash_map_operations() {
        let mut map: FxHashMap<&str, i32> = fx_hash_map();
        map.insert("one", 1);
        map.insert("two", 2);
        assert_eq!(map.get("one"), Some(&1));
        assert_eq!(map.get("two"), Some(&2));
        assert_eq!(map.get("three"), None);
    }

    #[test]
    fn test_fx_hash_set_operations() {
        let mut set: FxHashSet<&str> = fx_hash_set();
        set.insert("one");
        set.insert("two");
        assert!(set.contains("one"));
        assert!(set.contains("two"));
        assert!(!set.contains("three"));
    }
}
