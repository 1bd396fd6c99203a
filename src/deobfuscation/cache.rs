//! Memoization of decrypted string literals.
//!
//! Protected assemblies repeat the same ciphertext across many call sites, so every literal is
//! decrypted once per run and served from [`DecryptionCache`] afterwards. The cache is created by
//! the driver, handed to the engine by reference and dropped with the run; nothing is persisted.
//!
//! The first value stored for a ciphertext is authoritative. Later lookups never recompute or
//! replace it, which is what makes decryption deterministic within a run.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::{mapref::entry::Entry, DashMap};
use widestring::{U16Str, U16String};

/// Ciphertext to plaintext cache with hit/miss accounting.
///
/// Backed by a [`DashMap`] so the cache can be shared by reference even if methods are later
/// processed in parallel.
///
/// # Examples
///
/// ```rust
/// use dotzion::deobfuscation::DecryptionCache;
/// use widestring::{u16str, U16String};
///
/// let cache = DecryptionCache::new();
/// let first = cache.get_or_insert_with(u16str!("AB"), |_| U16String::from_str("@C"));
/// let second = cache.get_or_insert_with(u16str!("AB"), |_| U16String::from_str("ignored"));
///
/// assert_eq!(first, second);
/// assert_eq!((cache.hits(), cache.misses()), (1, 1));
/// ```
#[derive(Debug, Default)]
pub struct DecryptionCache {
    entries: DashMap<U16String, U16String>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl DecryptionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached plaintext for `ciphertext`, if any.
    ///
    /// Does not touch the hit/miss counters.
    #[must_use]
    pub fn get(&self, ciphertext: &U16Str) -> Option<U16String> {
        self.entries.get(ciphertext).map(|entry| entry.value().clone())
    }

    /// Returns the cached plaintext for `ciphertext`, computing and storing it on a miss.
    ///
    /// `compute` runs at most once per distinct ciphertext; if two callers race on the same key,
    /// the value stored first wins and is what both observe.
    ///
    /// # Arguments
    ///
    /// * `ciphertext` - The cache key, as found in the literal.
    /// * `compute` - Produces the plaintext on a miss.
    pub fn get_or_insert_with<F>(&self, ciphertext: &U16Str, compute: F) -> U16String
    where
        F: FnOnce(&U16Str) -> U16String,
    {
        if let Some(cached) = self.entries.get(ciphertext) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return cached.value().clone();
        }

        match self.entries.entry(ciphertext.to_ustring()) {
            Entry::Occupied(occupied) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                occupied.get().clone()
            }
            Entry::Vacant(vacant) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let plaintext = compute(ciphertext);
                vacant.insert(plaintext.clone());
                plaintext
            }
        }
    }

    /// Returns true if `ciphertext` has been decrypted during this run.
    #[must_use]
    pub fn contains(&self, ciphertext: &U16Str) -> bool {
        self.entries.contains_key(ciphertext)
    }

    /// Returns the number of distinct ciphertexts stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been decrypted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lookups answered from the cache.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of lookups that had to compute the plaintext.
    #[must_use]
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use widestring::u16str;

    use super::*;

    #[test]
    fn first_value_is_authoritative() {
        let cache = DecryptionCache::new();
        cache.get_or_insert_with(u16str!("key"), |_| U16String::from_str("first"));
        let again = cache.get_or_insert_with(u16str!("key"), |_| U16String::from_str("second"));

        assert_eq!(again, U16String::from_str("first"));
        assert_eq!(
            cache.get(u16str!("key")),
            Some(U16String::from_str("first"))
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn compute_runs_once_per_key() {
        let cache = DecryptionCache::new();
        let calls = Cell::new(0);

        for _ in 0..5 {
            cache.get_or_insert_with(u16str!("x"), |c| {
                calls.set(calls.get() + 1);
                c.to_ustring()
            });
        }
        cache.get_or_insert_with(u16str!("y"), |c| {
            calls.set(calls.get() + 1);
            c.to_ustring()
        });

        assert_eq!(calls.get(), 2);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.hits(), 4);
    }

    #[test]
    fn empty_cache() {
        let cache = DecryptionCache::new();
        assert!(cache.is_empty());
        assert!(!cache.contains(u16str!("")));
        assert_eq!(cache.get(u16str!("")), None);

        cache.get_or_insert_with(u16str!(""), |c| c.to_ustring());
        assert!(cache.contains(u16str!("")));
        assert!(!cache.is_empty());
    }
}
