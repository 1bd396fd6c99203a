//! String literal decryption.
//!
//! Protected literals are stored with every UTF-16 code unit XOR'ed with a small key, applied a
//! fixed number of times. [`XorScheme`] is that transform; [`StringDecryptor`] pairs it with the
//! run's [`DecryptionCache`] so each distinct ciphertext is transformed once.
//!
//! Decryption works on raw code units, so literals holding unpaired surrogates round-trip without
//! loss. It is total: every input, the empty string included, has a plaintext.
//!
//! # Examples
//!
//! ```rust
//! use dotzion::deobfuscation::{DecryptionCache, StringDecryptor, XorScheme};
//!
//! let cache = DecryptionCache::new();
//! let decryptor = StringDecryptor::new(XorScheme::default(), &cache);
//!
//! assert_eq!(decryptor.decrypt_str("AB"), "@C");
//! assert_eq!(decryptor.decrypt_str(""), "");
//! ```

use widestring::{U16Str, U16String};

use crate::deobfuscation::cache::DecryptionCache;

/// A repeated XOR over UTF-16 code units.
///
/// Every round is executed. With an odd round count the result equals a single XOR with `key`,
/// with an even one the input comes back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorScheme {
    /// Value XOR'ed into each code unit per round
    pub key: u16,
    /// Number of rounds applied to each code unit
    pub rounds: u32,
}

impl Default for XorScheme {
    fn default() -> Self {
        XorScheme {
            key: 1,
            rounds: 1111,
        }
    }
}

impl XorScheme {
    /// Creates a scheme with the given key and round count.
    #[must_use]
    pub fn new(key: u16, rounds: u32) -> Self {
        XorScheme { key, rounds }
    }

    /// Transforms a single code unit.
    #[must_use]
    pub fn apply_unit(&self, unit: u16) -> u16 {
        let mut value = unit;
        for _ in 0..self.rounds {
            value ^= self.key;
        }
        value
    }

    /// Transforms every code unit of `input`.
    #[must_use]
    pub fn apply(&self, input: &U16Str) -> U16String {
        U16String::from_vec(
            input
                .as_slice()
                .iter()
                .map(|unit| self.apply_unit(*unit))
                .collect::<Vec<u16>>(),
        )
    }
}

/// Decrypts literals through the run's cache.
#[derive(Debug, Clone, Copy)]
pub struct StringDecryptor<'a> {
    scheme: XorScheme,
    cache: &'a DecryptionCache,
}

impl<'a> StringDecryptor<'a> {
    /// Creates a decryptor.
    ///
    /// # Arguments
    ///
    /// * `scheme` - The transform to apply.
    /// * `cache` - Cache shared by every decryption of this run.
    #[must_use]
    pub fn new(scheme: XorScheme, cache: &'a DecryptionCache) -> Self {
        StringDecryptor { scheme, cache }
    }

    /// Returns the transform in use.
    #[must_use]
    pub fn scheme(&self) -> XorScheme {
        self.scheme
    }

    /// Returns the cache backing this decryptor.
    #[must_use]
    pub fn cache(&self) -> &'a DecryptionCache {
        self.cache
    }

    /// Decrypts a literal, answering from the cache when possible.
    #[must_use]
    pub fn decrypt(&self, ciphertext: &U16Str) -> U16String {
        let scheme = self.scheme;
        self.cache
            .get_or_insert_with(ciphertext, |input| scheme.apply(input))
    }

    /// Convenience wrapper over [`StringDecryptor::decrypt`] for UTF-8 input.
    ///
    /// Code units that do not form valid UTF-16 after decryption are replaced with U+FFFD.
    #[must_use]
    pub fn decrypt_str(&self, ciphertext: &str) -> String {
        let input = U16String::from_str(ciphertext);
        self.decrypt(&input).to_string_lossy()
    }
}
